//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `EXPERIMENT_FLOW` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use experiment_flow::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Gateway at {}", config.gateway.base_url);
//! ```

mod chat;
mod engine;
mod error;
mod gateway;
mod telemetry;

pub use chat::ChatConfig;
pub use engine::EngineConfig;
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use telemetry::TelemetryConfig;

use serde::Deserialize;

use crate::application::EngineOptions;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a runnable
/// configuration pointing at a local experiment server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Experiment server connection
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Default chat generation parameters
    #[serde(default)]
    pub chat: ChatConfig,

    /// Flow engine tunables
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `EXPERIMENT_FLOW` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `EXPERIMENT_FLOW__GATEWAY__BASE_URL=...` -> `gateway.base_url = ...`
    /// - `EXPERIMENT_FLOW__ENGINE__AI_EVALUATION=scoring` -> `engine.ai_evaluation`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("EXPERIMENT_FLOW")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.gateway.validate()?;
        self.chat.validate()?;
        self.engine.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }

    /// Engine tunables assembled from the `engine` and `chat` sections
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            max_auto_advances: self.engine.max_auto_advances,
            ai_evaluation: self.engine.ai_evaluation,
            ai_evaluation_max_attempts: self.engine.ai_evaluation_max_attempts,
            chat_defaults: self.chat.defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::AiEvaluationMode;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("EXPERIMENT_FLOW__GATEWAY__BASE_URL");
        env::remove_var("EXPERIMENT_FLOW__GATEWAY__TIMEOUT_SECS");
        env::remove_var("EXPERIMENT_FLOW__ENGINE__AI_EVALUATION");
        env::remove_var("EXPERIMENT_FLOW__ENGINE__MAX_AUTO_ADVANCES");
        env::remove_var("EXPERIMENT_FLOW__CHAT__BOT_MODEL");
    }

    #[test]
    fn test_load_defaults_from_empty_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.gateway.base_url, "http://localhost:8000");
        assert_eq!(config.engine.max_auto_advances, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("EXPERIMENT_FLOW__GATEWAY__BASE_URL", "https://lab.example.org");
        env::set_var("EXPERIMENT_FLOW__GATEWAY__TIMEOUT_SECS", "12");
        env::set_var("EXPERIMENT_FLOW__ENGINE__AI_EVALUATION", "scoring");
        env::set_var("EXPERIMENT_FLOW__CHAT__BOT_MODEL", "llama3:8b");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.gateway.base_url, "https://lab.example.org");
        assert_eq!(config.gateway.timeout_secs, 12);
        assert_eq!(config.engine.ai_evaluation, AiEvaluationMode::Scoring);
        assert_eq!(config.chat.bot_model, "llama3:8b");
    }

    #[test]
    fn test_engine_options_carry_chat_defaults() {
        let mut config = AppConfig::default();
        config.chat.bot_model = "mistral:7b".to_string();
        config.engine.max_auto_advances = 4;

        let options = config.engine_options();
        assert_eq!(options.chat_defaults.bot_model, "mistral:7b");
        assert_eq!(options.max_auto_advances, 4);
    }

    #[test]
    fn test_invalid_timeout_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("EXPERIMENT_FLOW__GATEWAY__TIMEOUT_SECS", "0");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }
}
