//! Binder resolution engine.
//!
//! The registry maps a target type to the binder that produces it. An
//! explicitly registered binder wins; otherwise the type's built-in binder
//! ([`Bindable::default_binder`]) is used. Resolved binders are cached per
//! type, so each is created once per registry.
//!
//! Nested binders (list elements, struct members) are resolved when a node
//! is bound rather than when the outer binder is built, so recursive types
//! resolve without recursing at resolution time.

use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::binder::{Bindable, Binder, Binding};
use crate::domain::errors::BindError;
use crate::domain::models::SettingsNode;

/// Type-erased `Arc<dyn Binder<T>>`.
type ErasedBinder = Arc<dyn Any + Send + Sync>;

/// Registry of binders keyed by target type.
#[derive(Default)]
pub struct BinderRegistry {
    registered: RwLock<HashMap<TypeId, ErasedBinder>>,
    resolved: RwLock<HashMap<TypeId, ErasedBinder>>,
}

impl BinderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `binder` for `T`, replacing any earlier registration and
    /// the built-in binder.
    pub fn register<T: Bindable>(&self, binder: impl Binder<T> + 'static) -> &Self {
        self.register_shared::<T>(Arc::new(binder))
    }

    pub fn register_shared<T: Bindable>(&self, binder: Arc<dyn Binder<T>>) -> &Self {
        let id = TypeId::of::<T>();
        tracing::debug!(target_type = std::any::type_name::<T>(), "registering binder");
        self.registered.write().insert(id, Arc::new(binder));
        self.resolved.write().remove(&id);
        self
    }

    /// Whether a binder was explicitly registered for `T`.
    pub fn is_registered<T: Bindable>(&self) -> bool {
        self.registered.read().contains_key(&TypeId::of::<T>())
    }

    /// Resolve the binder for `T`, or `None` when no binder exists.
    pub fn resolve<T: Bindable>(&self) -> Option<Arc<dyn Binder<T>>> {
        let id = TypeId::of::<T>();
        if let Some(binder) = self.registered.read().get(&id) {
            return downcast::<T>(binder);
        }
        if let Some(binder) = self.resolved.read().get(&id) {
            return downcast::<T>(binder);
        }

        let binder = T::default_binder()?;
        let erased: ErasedBinder = Arc::new(binder);
        let mut resolved = self.resolved.write();
        // Another thread may have resolved the same type meanwhile; keep
        // the first so every caller shares one binder.
        let entry = resolved.entry(id).or_insert(erased);
        downcast::<T>(entry)
    }

    /// Bind `node` to `T` through the resolved binder.
    ///
    /// Produces a `BinderNotFound` error when `T` cannot be resolved.
    pub fn bind<T: Bindable>(&self, node: &SettingsNode) -> Binding<T> {
        match self.resolve::<T>() {
            Some(binder) => self.invoke(binder.as_ref(), node),
            None => Binding::failed(BindError::binder_not_found::<T>()),
        }
    }

    /// Run `binder` on `node`, converting a panic into a
    /// `WrappedException` error.
    pub fn invoke<T: Bindable>(&self, binder: &dyn Binder<T>, node: &SettingsNode) -> Binding<T> {
        match catch_unwind(AssertUnwindSafe(|| binder.bind(node, self))) {
            Ok(binding) => binding,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(
                    target_type = std::any::type_name::<T>(),
                    %message,
                    "binder panicked"
                );
                Binding::failed(BindError::wrapped(message))
            }
        }
    }
}

fn downcast<T: Bindable>(erased: &ErasedBinder) -> Option<Arc<dyn Binder<T>>> {
    erased.downcast_ref::<Arc<dyn Binder<T>>>().cloned()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "binder panicked".to_string()
    }
}
