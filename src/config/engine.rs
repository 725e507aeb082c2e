//! Response engine configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Response engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the engine server
    pub base_url: String,

    /// Streaming endpoint path
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Optional bearer token for the engine
    pub api_key: Option<Secret<String>>,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl EngineConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("ENGINE__BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidEngineUrl);
        }
        if !self.stream_path.starts_with('/') {
            return Err(ValidationError::InvalidStreamPath);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > self.timeout_secs {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_stream_path() -> String {
    "/stream".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Deserialized the way `AppConfig::load` does, so serde defaults apply.
    fn engine(base_url: &str) -> EngineConfig {
        serde_json::from_value(json!({ "base_url": base_url })).unwrap()
    }

    #[test]
    fn test_engine_config_defaults() {
        let config = engine("http://localhost:2024");
        assert_eq!(config.stream_path, "/stream");
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.connect_timeout_secs, 10);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = EngineConfig {
            timeout_secs: 60,
            ..engine("http://localhost:2024")
        };
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(engine("https://engine.internal").validate().is_ok());
    }

    #[test]
    fn test_validation_missing_url() {
        assert_eq!(
            engine("").validate(),
            Err(ValidationError::MissingRequired("ENGINE__BASE_URL"))
        );
    }

    #[test]
    fn test_validation_bad_scheme() {
        assert_eq!(
            engine("ftp://engine").validate(),
            Err(ValidationError::InvalidEngineUrl)
        );
    }

    #[test]
    fn test_validation_bad_stream_path() {
        let config = EngineConfig {
            stream_path: "stream".to_string(),
            ..engine("http://localhost:2024")
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStreamPath));
    }

    #[test]
    fn test_validation_invalid_timeouts() {
        let base = engine("http://localhost:2024");

        let zero = EngineConfig {
            timeout_secs: 0,
            ..base.clone()
        };
        assert!(zero.validate().is_err());

        let too_long = EngineConfig {
            timeout_secs: 601,
            ..base.clone()
        };
        assert!(too_long.validate().is_err());

        let connect_exceeds_total = EngineConfig {
            timeout_secs: 5,
            connect_timeout_secs: 10,
            ..base
        };
        assert!(connect_exceeds_total.validate().is_err());
    }
}
