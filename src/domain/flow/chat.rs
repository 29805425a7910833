//! Chat steps and the generation settings pushed before a chat starts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::step::default_required;

/// Timed conversation with a configured bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatStep {
    #[serde(default)]
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_gpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_batch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_minutes: Option<u32>,
}

impl ChatStep {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            title: None,
            required: true,
            bot_name: None,
            bot_model: None,
            system_prompt: None,
            temperature: None,
            top_p: None,
            top_k: None,
            repeat_penalty: None,
            num_predict: None,
            num_thread: None,
            num_ctx: None,
            num_gpu: None,
            num_batch: None,
            instruction_text: None,
            time_limit_minutes: None,
        }
    }

    pub fn with_time_limit(mut self, minutes: u32) -> Self {
        self.time_limit_minutes = Some(minutes);
        self
    }

    pub fn bot_name(&self) -> &str {
        self.bot_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("AI Assistant")
    }

    /// Time budget, `None` when unlimited.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_minutes
            .filter(|m| *m > 0)
            .map(|m| Duration::from_secs(u64::from(m) * 60))
    }

    /// Banner shown once at chat start, if any.
    pub fn banner(&self) -> Option<&str> {
        self.instruction_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Builds the configure request, filling unset parameters from `defaults`.
    ///
    /// Token, context, thread and batch counts of zero are treated as unset.
    /// A GPU layer count of zero is a meaningful value and is kept.
    pub fn chat_configuration(&self, defaults: &ChatDefaults) -> ChatConfiguration {
        let positive = |value: Option<u32>| value.filter(|v| *v > 0);
        ChatConfiguration {
            bot_model: self
                .bot_model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| defaults.bot_model.clone()),
            system_prompt: self.system_prompt.clone().unwrap_or_default(),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            repeat_penalty: self.repeat_penalty.unwrap_or(defaults.repeat_penalty),
            num_predict: positive(self.num_predict),
            num_thread: positive(self.num_thread),
            num_ctx: positive(self.num_ctx),
            num_gpu: self.num_gpu,
            num_batch: positive(self.num_batch),
        }
    }
}

/// Generation parameters applied when a chat step leaves them unset.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatDefaults {
    pub bot_model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            bot_model: "gemma3:4b".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
        }
    }
}

/// Body of the ConfigureChat call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfiguration {
    pub bot_model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_gpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_batch: Option<u32>,
}
