//! Per-type watcher: binds every source emission and republishes it.

use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use super::binding::{Bindable, BinderRegistry};
use super::broadcast::Broadcast;
use super::fifo_cache::FifoCache;
use crate::domain::errors::{BindErrors, ProviderError, ProviderResult};
use crate::domain::models::SettingsNode;
use crate::domain::ports::{SettingsSource, Subscription};

/// Cached bound value, erased to share one cache across types.
pub(crate) type CachedValue = Arc<dyn Any + Send + Sync>;

/// Callback receiving suppressed provider errors.
pub type ErrorHandler = Arc<dyn Fn(&ProviderError) + Send + Sync>;

/// Identity of an ad-hoc source.
///
/// Holds a weak reference so the allocation, and with it the address used
/// for hashing, stays reserved while the entry is cached. A dropped source
/// therefore never aliases a later one.
#[derive(Clone)]
pub(crate) struct SourceRef(Weak<dyn SettingsSource>);

impl SourceRef {
    fn address(&self) -> usize {
        self.0.as_ptr().cast::<()>() as usize
    }
}

impl PartialEq for SourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for SourceRef {}

impl Hash for SourceRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceRef({:#x})", self.address())
    }
}

/// Key of a bound-value cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CacheKey {
    /// Value bound from the source registered for the type.
    Type(TypeId),
    /// Value bound from an ad-hoc source.
    Source { source: SourceRef, value_type: TypeId },
}

impl CacheKey {
    pub(crate) fn for_type<T: 'static>() -> Self {
        Self::Type(TypeId::of::<T>())
    }

    pub(crate) fn for_source<T: 'static>(source: &Arc<dyn SettingsSource>) -> Self {
        Self::Source {
            source: SourceRef(Arc::downgrade(source)),
            value_type: TypeId::of::<T>(),
        }
    }
}

pub(crate) type ValueCache = FifoCache<CacheKey, CachedValue>;

/// Binding policy applied to each emission.
#[derive(Clone)]
pub(crate) struct Pipeline {
    pub binders: Arc<BinderRegistry>,
    pub throw_on_error: bool,
    pub on_error: Option<ErrorHandler>,
}

impl Pipeline {
    /// Bind `tree` to `T` and apply the error policy.
    ///
    /// Success replaces the cache entry under `key`. On failure the cache
    /// is left untouched: in throw mode the error is returned, otherwise
    /// `on_error` runs once and the cached value (or `T::default()`) stands
    /// in for the failed emission.
    pub fn process<T: Bindable>(
        &self,
        tree: &SettingsNode,
        cache: &ValueCache,
        key: &CacheKey,
    ) -> ProviderResult<Arc<T>> {
        let type_name = std::any::type_name::<T>();
        let (value, errors) = self.binders.bind::<T>(tree).into_parts();
        let Some(errors) = BindErrors::new(errors) else {
            let value = Arc::new(value);
            let erased: CachedValue = value.clone();
            if let Some(evicted) = cache.insert(key.clone(), erased) {
                tracing::trace!(?evicted, "evicted cached settings");
            }
            return Ok(value);
        };

        let error = ProviderError::Binding { type_name, errors };
        if self.throw_on_error {
            tracing::debug!(%error, "settings binding failed");
            return Err(error);
        }

        tracing::warn!(%error, "settings binding failed, keeping previous value");
        if let Some(on_error) = &self.on_error {
            on_error(&error);
        }
        let stale = cache.get(key).and_then(|cached| cached.downcast::<T>().ok());
        Ok(stale.unwrap_or_else(|| Arc::new(T::default())))
    }
}

/// Closes the watcher when the upstream observer is dropped, so waiters
/// learn that no value will arrive.
struct CloseOnDrop<T: Bindable>(Weak<Watcher<T>>);

impl<T: Bindable> Drop for CloseOnDrop<T> {
    fn drop(&mut self) {
        if let Some(watcher) = self.0.upgrade() {
            watcher.values.close();
        }
    }
}

/// Live view of one type bound from one source.
pub struct Watcher<T: Bindable> {
    values: Broadcast<ProviderResult<Arc<T>>>,
    upstream: Mutex<Option<Subscription>>,
}

impl<T: Bindable> Watcher<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            values: Broadcast::new(),
            upstream: Mutex::new(None),
        })
    }

    /// Subscribe to `source`. Each emission is bound and delivered before
    /// the next one is processed.
    pub(crate) fn connect(
        self: &Arc<Self>,
        source: &dyn SettingsSource,
        pipeline: Pipeline,
        cache: Arc<ValueCache>,
        key: CacheKey,
    ) {
        let guard = CloseOnDrop(Arc::downgrade(self));
        let subscription = source.subscribe(Box::new(move |tree: Arc<SettingsNode>| {
            let Some(watcher) = guard.0.upgrade() else {
                return;
            };
            watcher
                .values
                .publish_with(|| pipeline.process::<T>(&tree, &cache, &key));
        }));
        let mut upstream = self.upstream.lock();
        if self.values.is_closed() {
            // Closed while subscribing; nothing will take this handle later.
            drop(upstream);
            subscription.unsubscribe();
            return;
        }
        *upstream = Some(subscription);
    }

    /// Subscribe to bound values; the latest one is replayed first.
    pub fn subscribe(
        &self,
        observer: impl Fn(ProviderResult<Arc<T>>) + Send + Sync + 'static,
    ) -> Subscription {
        self.values.subscribe(observer)
    }

    /// The latest bound value, if an emission was processed.
    pub fn current(&self) -> Option<ProviderResult<Arc<T>>> {
        self.values.current()
    }

    pub fn is_closed(&self) -> bool {
        self.values.is_closed()
    }

    /// Detach from the source and drop all subscribers.
    pub fn close(&self) {
        // Close first so a concurrent `connect` sees it under the upstream lock.
        self.values.close();
        let upstream = self.upstream.lock().take();
        drop(upstream);
    }
}

/// Type-erased watcher stored in the provider's type registry.
pub(crate) trait AnyWatcher: Send + Sync {
    fn close(&self);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Bindable> AnyWatcher for Watcher<T> {
    fn close(&self) {
        Watcher::close(self);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
