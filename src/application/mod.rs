//! Application layer - orchestrates the domain through the ports.
//!
//! The flow engine is the only use case: it reacts to participant actions
//! and timer events, and commits progress through the `FlowGateway`.

pub mod engine;

pub use engine::{
    EngineDeps, EngineOptions, FlowEngine, FlowError, FlowEvent, FlowEventKind, FlowEventReceiver,
};
