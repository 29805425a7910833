//! Flow Gateway Port - the server boundary for participant progress.
//!
//! The server is the sole arbiter of which step comes next. The engine
//! reads the current step, commits each transition through `advance`, and
//! pushes chat settings before a chat step is used.
//!
//! # Contract
//!
//! - `current_step` has no side effect on progress; calling it twice for
//!   an in-progress participant returns the same step.
//! - `advance` is monotonic. A duplicate advance for a step that was
//!   already left is refused with [`GatewayError::Conflict`].

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::flow::{ChatConfiguration, Question, Step};
use crate::domain::foundation::{ParticipantSession, SessionId};
use crate::domain::response::{EvaluationScore, ResponsePayload};

/// Port for reading and committing a participant's flow progress.
#[async_trait]
pub trait FlowGateway: Send + Sync {
    /// Where the participant currently is.
    async fn current_step(
        &self,
        session: &ParticipantSession,
    ) -> Result<CurrentStepOutcome, GatewayError>;

    /// Commits the current step and returns what follows it.
    async fn advance(
        &self,
        session: &ParticipantSession,
        request: AdvanceRequest,
    ) -> Result<AdvanceOutcome, GatewayError>;

    /// Pushes generation settings for the session's chat.
    async fn configure_chat(
        &self,
        session_id: &SessionId,
        configuration: &ChatConfiguration,
    ) -> Result<(), GatewayError>;

    /// Scores evaluation questions against the participant's transcript.
    async fn evaluate(
        &self,
        session: &ParticipantSession,
        request: EvaluationRequest,
    ) -> Result<Vec<EvaluationScore>, GatewayError>;
}

/// Result of the current-step query.
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentStepOutcome {
    NoFlow,
    AlreadyCompleted,
    Completed,
    Active {
        step: Step,
        current_step_index: usize,
        total_steps: usize,
    },
}

/// Body of an advance call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdvanceRequest {
    /// Step being left, used by the server to detect stale duplicates.
    pub step_id: Option<String>,
    pub response: Option<ResponsePayload>,
}

impl AdvanceRequest {
    pub fn new(step_id: impl Into<String>, response: Option<ResponsePayload>) -> Self {
        Self {
            step_id: Some(step_id.into()),
            response,
        }
    }
}

/// Result of an advance call.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Completed,
    Next {
        next_step: Step,
        current_step_index: usize,
        /// Updated denominator once a branch has grown the path.
        total_steps: Option<usize>,
    },
}

/// Scoring request for an `ai_evaluation` step.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    pub step_id: String,
    pub evaluation_model: String,
    pub context_prompt: String,
    pub questions: Vec<Question>,
}

/// Gateway failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The server refused a stale or duplicate transition.
    #[error("advance conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to parse gateway response: {0}")]
    Parse(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Whether re-submitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(_) | GatewayError::Timeout { .. } | GatewayError::Unavailable(_) => {
                true
            }
            GatewayError::Status { status, .. } => *status >= 500,
            GatewayError::Conflict(_) | GatewayError::NotFound(_) | GatewayError::Parse(_) => false,
        }
    }
}
