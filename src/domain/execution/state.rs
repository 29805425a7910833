use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant-visible lifecycle of one flow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Uninitialized,
    /// No flow is configured; the caller falls back to free chat.
    NoFlow,
    /// The participant finished this flow before. Hard stop.
    AlreadyCompleted,
    Active,
    AllCompleted,
}

impl FlowState {
    /// Terminal states accept no further operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::AlreadyCompleted | FlowState::AllCompleted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Uninitialized => "uninitialized",
            FlowState::NoFlow => "no_flow",
            FlowState::AlreadyCompleted => "already_completed",
            FlowState::Active => "active",
            FlowState::AllCompleted => "all_completed",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which participant surface is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Flow,
    Chat,
}
