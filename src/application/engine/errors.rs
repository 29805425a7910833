//! Flow engine errors.

use thiserror::Error;

use crate::domain::flow::StepKind;
use crate::domain::survey::SurveyValidationError;
use crate::ports::GatewayError;

/// Errors returned by flow engine operations.
///
/// On every variant the engine's local state is left as it was before the
/// call, so the participant can retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    /// The server could not be reached or refused the request.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A survey answer failed validation. Nothing was sent.
    #[error("{0}")]
    Validation(#[from] SurveyValidationError),

    #[error("The button will appear in {remaining} seconds")]
    DwellGateClosed { remaining: u32 },

    /// The flow has ended for this participant.
    #[error("The experiment is finished for this participant")]
    Terminal,

    #[error("No active step")]
    NotActive,

    #[error("{operation} is not available on a {kind} step")]
    InvalidOperation {
        operation: &'static str,
        kind: StepKind,
    },

    #[error("AI evaluation cannot be skipped yet ({failures}/{max_attempts} attempts failed)")]
    SkipNotAllowed { failures: u32, max_attempts: u32 },

    #[error("AI evaluation attempts exhausted ({max_attempts})")]
    AttemptsExhausted { max_attempts: u32 },

    /// The server answered with something the advance contract forbids.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}

impl FlowError {
    /// True when repeating the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Gateway(e) => e.is_retryable(),
            FlowError::DwellGateClosed { .. } => true,
            _ => false,
        }
    }
}
