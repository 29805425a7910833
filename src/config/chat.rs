//! Default chat generation parameters

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::flow::ChatDefaults;

/// Generation parameters used when a chat step leaves them unset
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_bot_model")]
    pub bot_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f64,
}

impl ChatConfig {
    pub fn defaults(&self) -> ChatDefaults {
        ChatDefaults {
            bot_model: self.bot_model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            repeat_penalty: self.repeat_penalty,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bot_model.trim().is_empty() {
            return Err(ValidationError::MissingRequired("chat.bot_model"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::OutOfRange {
                field: "chat.temperature",
                min: 0.0,
                max: 2.0,
            });
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ValidationError::OutOfRange {
                field: "chat.top_p",
                min: 0.0,
                max: 1.0,
            });
        }
        if self.repeat_penalty <= 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "chat.repeat_penalty",
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bot_model: default_bot_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            repeat_penalty: default_repeat_penalty(),
        }
    }
}

fn default_bot_model() -> String {
    "gemma3:4b".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

fn default_top_k() -> u32 {
    40
}

fn default_repeat_penalty() -> f64 {
    1.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_chat_defaults() {
        assert_eq!(ChatConfig::default().defaults(), ChatDefaults::default());
    }

    #[test]
    fn test_temperature_range() {
        let config = ChatConfig {
            temperature: 2.5,
            ..ChatConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::OutOfRange { field: "chat.temperature", .. })
        ));
    }

    #[test]
    fn test_blank_model_is_missing() {
        let config = ChatConfig {
            bot_model: "  ".to_string(),
            ..ChatConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("chat.bot_model"))
        );
    }
}
