//! Domain models

pub mod config;
pub mod tree;

pub use config::{Config, LogConfig, LogFormat, ProviderSettings, RotationPolicy};
pub use tree::{NodeKind, SettingsMap, SettingsNode};
