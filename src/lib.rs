//! Bindery - typed settings binding with live updates
//!
//! Bindery turns hierarchical settings trees (YAML files, environment
//! variables, programmatic maps) into strongly typed values and keeps them
//! current as their sources change.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): settings trees, errors and the source port
//! - **Service Layer** (`services`): binding engine, watchers and the provider
//! - **Adapters** (`adapters`): concrete settings sources
//! - **Infrastructure Layer** (`infrastructure`): configuration loading and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use bindery::{FigmentSource, SettingsProvider};
//!
//! let provider = SettingsProvider::new();
//! provider.setup_source_for::<ServerSettings>(Arc::new(FigmentSource::yaml_file("server.yaml")))?;
//! let server = provider.get::<ServerSettings>()?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::sources::{combine, CombinedSource, FigmentSource, MemorySource, MergePolicy};
pub use domain::errors::{
    BindError, BindErrorKind, BindErrors, BindPath, PathSegment, ProviderError, ProviderResult,
    SourceError,
};
pub use domain::models::{
    Config, LogConfig, LogFormat, NodeKind, ProviderSettings, RotationPolicy, SettingsMap,
    SettingsNode,
};
pub use domain::ports::{SettingsSource, SharedSource, Subscription, TreeObserver};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    Bindable, Binder, BinderRegistry, Binding, BoundMembers, Field, ProviderOptions,
    SettingsProvider, SettingsStruct, StructBinder, StructSchema, Updates,
};
