//! Error types for binding and for the settings provider.
//!
//! Binding never fails fast: binders collect [`BindError`]s, each annotated
//! with the path of the offending node, and hand them back together. The
//! provider turns an aggregated failure into a single [`ProviderError`].

use std::fmt;
use thiserror::Error;

/// One step of a [`BindPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Struct member or map key.
    Member(String),
    /// List position.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        Self::Member(name.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Location of a node relative to the root that was bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BindPath(Vec<PathSegment>);

impl BindPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Return a copy of this path with `segment` in front.
    pub fn prefixed(mut self, segment: PathSegment) -> Self {
        self.0.insert(0, segment);
        self
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for BindPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for BindPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Member(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Member(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// What went wrong at a path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindErrorKind {
    #[error("expected {expected} but found {found}")]
    NodeTypeMismatch { expected: String, found: String },

    #[error("required value is missing or null")]
    RequiredPropertyIsNull,

    #[error("no binder available for {type_name}")]
    BinderNotFound { type_name: &'static str },

    #[error("binder failed: {message}")]
    WrappedException { message: String },
}

/// A path-annotated binding error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {kind}")]
pub struct BindError {
    pub path: BindPath,
    pub kind: BindErrorKind,
}

impl BindError {
    /// Error located at the node currently being bound.
    pub fn here(kind: BindErrorKind) -> Self {
        Self {
            path: BindPath::root(),
            kind,
        }
    }

    pub fn mismatch(expected: impl Into<String>, found: impl fmt::Display) -> Self {
        Self::here(BindErrorKind::NodeTypeMismatch {
            expected: expected.into(),
            found: found.to_string(),
        })
    }

    pub fn binder_not_found<T: ?Sized>() -> Self {
        Self::here(BindErrorKind::BinderNotFound {
            type_name: std::any::type_name::<T>(),
        })
    }

    pub fn wrapped(message: impl Into<String>) -> Self {
        Self::here(BindErrorKind::WrappedException {
            message: message.into(),
        })
    }

    pub fn prefixed(self, segment: PathSegment) -> Self {
        Self {
            path: self.path.prefixed(segment),
            kind: self.kind,
        }
    }
}

/// Non-empty, ordered list of binding errors from one bind call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindErrors(Vec<BindError>);

impl BindErrors {
    /// Returns `None` for an empty list.
    pub fn new(errors: Vec<BindError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> &BindError {
        &self.0[0]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BindError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<BindError> {
        self.0
    }
}

impl fmt::Display for BindErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.0.len();
        write!(f, "{count} binding error{}: ", if count == 1 { "" } else { "s" })?;
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BindErrors {}

impl IntoIterator for BindErrors {
    type Item = BindError;
    type IntoIter = std::vec::IntoIter<BindError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a BindErrors {
    type Item = &'a BindError;
    type IntoIter = std::slice::Iter<'a, BindError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Errors surfaced by the settings provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// No source registered for the requested type. Always raised.
    #[error("no settings source registered for {type_name}")]
    UnknownType { type_name: &'static str },

    /// A source was registered after the type's watcher became active.
    /// Always raised.
    #[error("cannot register a source for {type_name}: settings are already being observed")]
    InvalidTopologyChange { type_name: &'static str },

    /// Binding an emission failed and the provider is configured to throw.
    #[error("failed to bind {type_name}: {errors}")]
    Binding {
        type_name: &'static str,
        errors: BindErrors,
    },

    /// The source was released before producing a value.
    #[error("settings source for {type_name} closed before producing a value")]
    SourceClosed { type_name: &'static str },
}

impl ProviderError {
    /// The aggregated binding errors, if this is a binding failure.
    pub fn bind_errors(&self) -> Option<&BindErrors> {
        match self {
            Self::Binding { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// Errors raised by concrete sources while producing a tree.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("failed to extract settings from {source_name}: {message}")]
    Extraction { source_name: String, message: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;
