//! Participant Shell Port - the page or window hosting the flow.

use crate::domain::execution::Surface;

/// Host-side effects the engine triggers outside the step itself.
pub trait ParticipantShell: Send + Sync {
    /// Shows the flow surface or the chat surface.
    fn set_surface(&self, surface: Surface);

    /// Discards client-side caches once the flow is finished.
    fn clear_local_state(&self);

    /// Leaves the experiment context (redirect, window close, process exit).
    fn exit_experiment(&self);
}
