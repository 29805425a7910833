//! Flow Gateway adapters.
//!
//! - `HttpFlowGateway` - experiment server JSON API over reqwest
//! - `InMemoryFlowGateway` - in-process server with branch resolution
//! - `MockFlowGateway` - scripted responses for tests

mod dto;
mod http_gateway;
mod in_memory_gateway;
mod mock_gateway;

pub use dto::{AdvanceResponse, CurrentStepResponse};
pub use http_gateway::{HttpFlowGateway, HttpGatewayConfig};
pub use in_memory_gateway::{BranchAssignment, InMemoryFlowGateway, RecordedResponse};
pub use mock_gateway::{GatewayCall, MockFlowGateway};
