use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Upper bound for either provider cache.
pub const MAX_CACHE_CAPACITY: usize = 10_000;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid {name}: {value}. Must be at most {max}", max = MAX_CACHE_CAPACITY)]
    InvalidCacheCapacity { name: &'static str, value: usize },

    #[error("No log output configured: enable stdout or set logging.log_dir")]
    NoLogOutput,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .bindery/config.yaml (project config)
    /// 3. .bindery/local.yaml (project local overrides, optional)
    /// 4. Environment variables (BINDERY_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`load`](Self::load), with the `.bindery/` directory looked up
    /// under `root`.
    pub fn load_from(root: &Path) -> Result<Config> {
        let dir = root.join(".bindery");
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("BINDERY_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if !config.logging.enable_stdout && config.logging.log_dir.is_none() {
            return Err(ConfigError::NoLogOutput);
        }

        if let Some(dir) = &config.logging.log_dir {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "logging.log_dir cannot be empty".to_string(),
                ));
            }
        }

        for (name, value) in [
            ("type_cache_capacity", config.provider.type_cache_capacity),
            ("source_cache_capacity", config.provider.source_cache_capacity),
        ] {
            if value > MAX_CACHE_CAPACITY {
                return Err(ConfigError::InvalidCacheCapacity { name, value });
            }
        }

        Ok(())
    }
}
