use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::bindable_struct;
use crate::services::binding::{
    Bindable, Binder, BoundMembers, Field, ParseBinder, SettingsStruct, StructSchema,
};
use crate::services::fifo_cache::DEFAULT_CACHE_CAPACITY;

/// Main configuration structure for bindery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Settings provider defaults
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,
}

/// Settings provider defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProviderSettings {
    /// Deliver binding failures as errors instead of keeping the last
    /// good value
    #[serde(default = "default_true")]
    pub throw_exceptions: bool,

    /// Entries kept in the per-type cache (0 disables it)
    #[serde(default = "default_cache_capacity")]
    pub type_cache_capacity: usize,

    /// Entries kept in the per-source cache (0 disables it)
    #[serde(default = "default_cache_capacity")]
    pub source_cache_capacity: usize,
}

const fn default_true() -> bool {
    true
}

const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            throw_exceptions: default_true(),
            type_cache_capacity: default_cache_capacity(),
            source_cache_capacity: default_cache_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (logs only to stdout when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Enable stdout logging
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Log file rotation
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            enable_stdout: default_true(),
            rotation: RotationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown log format '{other}', expected json or pretty")),
        }
    }
}

impl FromStr for RotationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            other => Err(format!(
                "unknown rotation '{other}', expected daily, hourly or never"
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Pretty => write!(f, "pretty"),
        }
    }
}

impl Bindable for LogFormat {
    const NULL_TEXT_IS_ABSENT: bool = false;

    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(ParseBinder::<Self>::new()))
    }
}

impl Bindable for RotationPolicy {
    const NULL_TEXT_IS_ABSENT: bool = false;

    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(ParseBinder::<Self>::new()))
    }
}

// Binding schemas mirror the serde layout so `bindery check` reports the
// same keys a YAML file uses.

impl SettingsStruct for Config {
    fn schema() -> StructSchema<Self> {
        StructSchema::new()
            .field(Field::<ProviderSettings>::new("provider"))
            .field(Field::<LogConfig>::new("logging"))
    }

    fn assemble(members: &mut BoundMembers) -> Self {
        Self {
            provider: members.take("provider"),
            logging: members.take("logging"),
        }
    }
}

impl SettingsStruct for ProviderSettings {
    fn schema() -> StructSchema<Self> {
        StructSchema::new()
            .field(Field::<bool>::new("throw_exceptions").default_with(default_true))
            .field(Field::<usize>::new("type_cache_capacity").default_with(default_cache_capacity))
            .field(Field::<usize>::new("source_cache_capacity").default_with(default_cache_capacity))
    }

    fn assemble(members: &mut BoundMembers) -> Self {
        Self {
            throw_exceptions: members.take("throw_exceptions"),
            type_cache_capacity: members.take("type_cache_capacity"),
            source_cache_capacity: members.take("source_cache_capacity"),
        }
    }
}

impl SettingsStruct for LogConfig {
    fn schema() -> StructSchema<Self> {
        StructSchema::new()
            .field(Field::<String>::new("level").default_with(default_log_level))
            .field(Field::<LogFormat>::new("format"))
            .field(Field::<Option<PathBuf>>::new("log_dir"))
            .field(Field::<bool>::new("enable_stdout").default_with(default_true))
            .field(Field::<RotationPolicy>::new("rotation"))
    }

    fn assemble(members: &mut BoundMembers) -> Self {
        Self {
            level: members.take("level"),
            format: members.take("format"),
            log_dir: members.take("log_dir"),
            enable_stdout: members.take("enable_stdout"),
            rotation: members.take("rotation"),
        }
    }
}

bindable_struct!(Config, ProviderSettings, LogConfig);
