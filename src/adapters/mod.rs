//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the flow engine to external systems:
//! - `gateway` - Flow gateway implementations (HTTP, in-memory server, mock)
//! - `ui` - Participant shell and chat surface implementations

pub mod gateway;
pub mod ui;

pub use gateway::{HttpFlowGateway, HttpGatewayConfig, InMemoryFlowGateway, MockFlowGateway};
pub use ui::{RecordingChatSurface, RecordingShell, TerminalChat, TerminalShell};
