//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the flow engine and the outside world. Adapters implement these ports.
//!
//! - `FlowGateway` - Server boundary for reading and committing progress
//! - `ParticipantShell` - Host page/window effects (surface, exit)
//! - `ChatSurface` - Chat UI framing and transport shutdown

mod chat_surface;
mod flow_gateway;
mod participant_shell;

pub use chat_surface::ChatSurface;
pub use flow_gateway::{
    AdvanceOutcome, AdvanceRequest, CurrentStepOutcome, EvaluationRequest, FlowGateway,
    GatewayError,
};
pub use participant_shell::ParticipantShell;
