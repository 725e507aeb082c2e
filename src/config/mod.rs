//! Relay configuration, read from the environment.
//!
//! Variables use the `CHAT_RELAY` prefix with `__` between path segments:
//!
//! ```text
//! CHAT_RELAY__ENGINE__BASE_URL=http://localhost:2024
//! CHAT_RELAY__ENGINE__API_KEY=...
//! CHAT_RELAY__SERVER__PORT=8000
//! CHAT_RELAY__SERVER__CORS_ORIGINS=https://chat.example.org
//! ```
//!
//! A `.env` file in the working directory is read first, if present.

mod engine;
mod error;
mod server;

pub use engine::EngineConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Streaming engine endpoint. `engine.base_url` is required.
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Read `.env` and the process environment into typed settings.
    ///
    /// Fails when a required key is missing or a value does not parse.
    /// Range checks are left to [`AppConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is normal outside development.
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CHAT_RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.engine.validate()
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("CHAT_RELAY__ENGINE__BASE_URL", "http://localhost:2024");
    }

    fn clear_env() {
        env::remove_var("CHAT_RELAY__ENGINE__BASE_URL");
        env::remove_var("CHAT_RELAY__ENGINE__TIMEOUT_SECS");
        env::remove_var("CHAT_RELAY__SERVER__PORT");
        env::remove_var("CHAT_RELAY__SERVER__ENVIRONMENT");
    }

    #[test]
    fn loads_engine_url_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.engine.base_url, "http://localhost:2024");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_engine_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        assert!(AppConfig::load().is_err());
    }

    #[test]
    fn server_section_is_optional() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn nested_keys_override_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        env::set_var("CHAT_RELAY__SERVER__PORT", "3000");
        env::set_var("CHAT_RELAY__SERVER__ENVIRONMENT", "production");
        env::set_var("CHAT_RELAY__ENGINE__TIMEOUT_SECS", "45");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert_eq!(config.engine.timeout_secs, 45);
    }
}
