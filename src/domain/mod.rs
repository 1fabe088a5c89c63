//! Domain layer for bindery
//!
//! This module contains the settings tree, the binding error model, the
//! ambient configuration model and the source port.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{
    BindError, BindErrorKind, BindErrors, BindPath, PathSegment, ProviderError, ProviderResult,
    SourceError,
};
