//! Flow engine configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::execution::AiEvaluationMode;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Bound on consecutive branch auto-advances
    #[serde(default = "default_max_auto_advances")]
    pub max_auto_advances: u32,

    /// `placeholder` or `scoring`
    #[serde(default)]
    pub ai_evaluation: AiEvaluationMode,

    #[serde(default = "default_max_attempts")]
    pub ai_evaluation_max_attempts: u32,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_auto_advances == 0 {
            return Err(ValidationError::InvalidAutoAdvanceLimit);
        }
        if self.ai_evaluation_max_attempts == 0 {
            return Err(ValidationError::InvalidAttemptLimit);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_auto_advances: default_max_auto_advances(),
            ai_evaluation: AiEvaluationMode::default(),
            ai_evaluation_max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_auto_advances() -> u32 {
    32
}

fn default_max_attempts() -> u32 {
    3
}
