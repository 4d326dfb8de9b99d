//! Loader configuration

use cascade_core::{CascadeError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the standard memory / disk / network chain
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// User-Agent header sent by the HTTP fetcher
    pub user_agent: String,
    /// Whole-request timeout for the HTTP fetcher, in seconds
    pub request_timeout_secs: u64,
    /// Directory for the disk tier; no disk tier when unset
    pub cache_dir: Option<PathBuf>,
    /// Put an in-memory tier in front of the chain
    pub memory_cache: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("cascade/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
            cache_dir: None,
            memory_cache: true,
        }
    }
}

impl LoaderConfig {
    /// Short timeouts and no disk tier, for tests against local servers
    pub fn testing() -> Self {
        Self {
            user_agent: "cascade-test".to_string(),
            request_timeout_secs: 5,
            cache_dir: None,
            memory_cache: true,
        }
    }

    pub fn with_cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(CascadeError::config_error("user_agent must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(CascadeError::config_error(
                "request_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(LoaderConfig::default().validate().is_ok());
        assert!(LoaderConfig::testing().validate().is_ok());
        assert_eq!(LoaderConfig::testing().request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = LoaderConfig {
            request_timeout_secs: 0,
            ..LoaderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CascadeError::Configuration { .. })
        ));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: LoaderConfig =
            serde_json::from_str(r#"{"cache_dir": "/tmp/cascade"}"#).unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cascade")));
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.memory_cache);
    }
}
