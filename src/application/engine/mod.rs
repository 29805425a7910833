//! Flow engine: the participant-side state machine, its timers and errors.

mod engine;
mod errors;
mod events;
mod timers;

pub use engine::{EngineDeps, EngineOptions, FlowEngine};
pub use errors::FlowError;
pub use events::{FlowEvent, FlowEventKind, FlowEventReceiver, FlowEventSender};
pub use timers::TimerSet;
