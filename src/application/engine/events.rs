//! Timer events delivered back to the engine.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEventKind {
    /// One second of an instruction dwell gate elapsed.
    DwellTick,
    /// The chat step's time budget ran out.
    ChatTimeLimitReached,
}

/// A timer event, stamped with the epoch of the step instance that
/// started the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowEvent {
    pub epoch: u64,
    pub kind: FlowEventKind,
}

impl FlowEvent {
    pub fn new(epoch: u64, kind: FlowEventKind) -> Self {
        Self { epoch, kind }
    }
}

pub type FlowEventSender = mpsc::UnboundedSender<FlowEvent>;
pub type FlowEventReceiver = mpsc::UnboundedReceiver<FlowEvent>;
