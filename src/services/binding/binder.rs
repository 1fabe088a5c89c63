//! Binder contract and the per-call binding result.

use std::sync::Arc;

use super::registry::BinderRegistry;
use crate::domain::errors::{BindError, BindErrors, PathSegment};
use crate::domain::models::SettingsNode;

/// Converts a settings-tree node into a `T`.
///
/// Malformed data is reported through [`Binding`] errors, never by
/// panicking. A binder that panics is treated as misconfigured: the
/// registry catches the panic and reports a `WrappedException`.
pub trait Binder<T>: Send + Sync {
    /// Bind `node`, resolving nested binders through `registry`.
    fn bind(&self, node: &SettingsNode, registry: &BinderRegistry) -> Binding<T>;

    /// Whether this binder only fills the declared members of `T` itself.
    /// An abstract member bound by such a binder has no concrete type to
    /// dispatch to and is skipped.
    fn is_structural(&self) -> bool {
        false
    }
}

impl<T, F> Binder<T> for F
where
    F: Fn(&SettingsNode, &BinderRegistry) -> Binding<T> + Send + Sync,
{
    fn bind(&self, node: &SettingsNode, registry: &BinderRegistry) -> Binding<T> {
        self(node, registry)
    }
}

/// A type the binding engine can produce.
///
/// Every bindable type has a type default, used for optional members that
/// are absent and for positions whose binding failed.
pub trait Bindable: Default + Send + Sync + 'static {
    /// Whether a leaf whose text is `null` (any ASCII case) counts as no
    /// value. True for reference-like types (strings, collections,
    /// structs); false for numbers, booleans and characters, where the
    /// text is simply malformed.
    const NULL_TEXT_IS_ABSENT: bool = true;

    /// Binder used when none is registered for this type.
    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        None
    }

    /// Abstract types have no shape of their own. Members of an abstract
    /// type are left at their default unless a dispatching binder is
    /// registered, attached to the member or returned by
    /// [`default_binder`](Self::default_binder).
    fn is_abstract() -> bool {
        false
    }
}

/// Result of one bind call: the best-effort value plus every error found.
///
/// Failed members and elements hold their defaults in `value`, so a
/// caller can inspect the partial result, but only an error-free binding
/// converts into `Ok` through [`Binding::into_result`].
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Binding<T> {
    value: T,
    errors: Vec<BindError>,
}

impl<T> Binding<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(value: T, errors: Vec<BindError>) -> Self {
        Self { value, errors }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn errors(&self) -> &[BindError] {
        &self.errors
    }

    /// Prefix `segment` onto every error path.
    pub fn at(self, segment: PathSegment) -> Self {
        let errors = self
            .errors
            .into_iter()
            .map(|e| e.prefixed(segment.clone()))
            .collect();
        Self {
            value: self.value,
            errors,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Binding<U> {
        Binding {
            value: f(self.value),
            errors: self.errors,
        }
    }

    pub fn into_parts(self) -> (T, Vec<BindError>) {
        (self.value, self.errors)
    }

    pub fn into_result(self) -> Result<T, BindErrors> {
        match BindErrors::new(self.errors) {
            None => Ok(self.value),
            Some(errors) => Err(errors),
        }
    }
}

impl<T: Default> Binding<T> {
    /// A failed binding carrying the type default.
    pub fn failed(error: BindError) -> Self {
        Self::with_errors(T::default(), vec![error])
    }
}
