//! Cascade CLI Configuration
//!
//! Settings come from, in increasing priority: built-in defaults, a TOML
//! file given with `--config`, and command-line flags.

use std::path::{Path, PathBuf};

use cascade_loader::LoaderConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Use the platform cache directory when no cache dir is configured
    pub default_disk_cache: bool,

    /// Loader chain settings
    pub loader: LoaderConfig,

    /// Watch command settings
    pub watch: WatchConfig,
}

/// Settings for the `watch` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Pause between loads (in milliseconds)
    pub interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_disk_cache: true,
            loader: LoaderConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Read a TOML file; missing keys keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Layer command-line flags over this configuration
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if cli.no_disk {
            self.loader.cache_dir = None;
            self.default_disk_cache = false;
        } else if let Some(dir) = &cli.cache_dir {
            self.loader.cache_dir = Some(dir.clone());
        }
        if self.loader.cache_dir.is_none() && self.default_disk_cache {
            self.loader.cache_dir = Self::default_cache_dir();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.loader
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        if self.watch.interval_ms > 60 * 60 * 1000 {
            return Err(CliError::Config(
                "watch.interval_ms must be at most one hour".to_string(),
            ));
        }
        Ok(())
    }

    /// `<platform cache dir>/cascade`, when the platform has one
    pub fn default_cache_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("cascade"))
    }
}
