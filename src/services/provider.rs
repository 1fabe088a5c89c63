//! Settings provider: typed, cached, live settings per requested type.
//!
//! A type moves through three states: unregistered, registered (a source
//! is known) and active (a watcher is bound to the source). Registration is
//! only allowed before activation; registering a second source for a type
//! combines both, the later one taking precedence.
//!
//! ```ignore
//! let provider = SettingsProvider::new();
//! provider.setup_source_for::<ServerSettings>(Arc::new(FigmentSource::yaml_file("server.yaml")))?;
//! let settings = provider.get::<ServerSettings>()?;
//! ```

use futures::Stream;
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use super::binding::{Bindable, BinderRegistry};
use super::fifo_cache::{FifoCache, DEFAULT_CACHE_CAPACITY};
use super::watcher::{AnyWatcher, CacheKey, ErrorHandler, Pipeline, ValueCache, Watcher};
use crate::adapters::sources::combine;
use crate::domain::errors::{ProviderError, ProviderResult};
use crate::domain::models::ProviderSettings;
use crate::domain::ports::{SharedSource, Subscription};

/// Provider options, built with [`SettingsProvider::builder`].
#[derive(Clone)]
pub struct ProviderOptions {
    binders: Arc<BinderRegistry>,
    throw_on_error: bool,
    on_error: Option<ErrorHandler>,
    type_cache_capacity: usize,
    source_cache_capacity: usize,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            binders: Arc::new(BinderRegistry::new()),
            throw_on_error: true,
            on_error: None,
            type_cache_capacity: DEFAULT_CACHE_CAPACITY,
            source_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl ProviderOptions {
    /// Registry used to resolve binders.
    pub fn binders(mut self, binders: Arc<BinderRegistry>) -> Self {
        self.binders = binders;
        self
    }

    /// Deliver binding failures as errors (`true`, the default) or
    /// substitute the last good value.
    pub fn throw_on_error(mut self, throw: bool) -> Self {
        self.throw_on_error = throw;
        self
    }

    /// Called with every suppressed binding failure.
    pub fn on_error(mut self, handler: impl Fn(&ProviderError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(handler));
        self
    }

    pub fn type_cache_capacity(mut self, capacity: usize) -> Self {
        self.type_cache_capacity = capacity;
        self
    }

    pub fn source_cache_capacity(mut self, capacity: usize) -> Self {
        self.source_cache_capacity = capacity;
        self
    }

    /// Apply loaded provider settings.
    pub fn with_settings(self, settings: &ProviderSettings) -> Self {
        self.throw_on_error(settings.throw_exceptions)
            .type_cache_capacity(settings.type_cache_capacity)
            .source_cache_capacity(settings.source_cache_capacity)
    }

    pub fn build(self) -> SettingsProvider {
        SettingsProvider::with_options(self)
    }
}

struct TypeSlot {
    source: SharedSource,
    watcher: Option<Arc<dyn AnyWatcher>>,
}

/// Resolves, caches and republishes settings per requested type.
pub struct SettingsProvider {
    pipeline: Pipeline,
    slots: Mutex<HashMap<TypeId, TypeSlot>>,
    type_cache: Arc<ValueCache>,
    source_cache: Arc<ValueCache>,
}

impl Default for SettingsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsProvider {
    pub fn new() -> Self {
        Self::with_options(ProviderOptions::default())
    }

    pub fn builder() -> ProviderOptions {
        ProviderOptions::default()
    }

    pub fn with_options(options: ProviderOptions) -> Self {
        Self {
            pipeline: Pipeline {
                binders: options.binders,
                throw_on_error: options.throw_on_error,
                on_error: options.on_error,
            },
            slots: Mutex::new(HashMap::new()),
            type_cache: Arc::new(FifoCache::new(options.type_cache_capacity)),
            source_cache: Arc::new(FifoCache::new(options.source_cache_capacity)),
        }
    }

    /// The registry used to resolve binders.
    pub fn binders(&self) -> &Arc<BinderRegistry> {
        &self.pipeline.binders
    }

    /// Register `source` for `T`.
    ///
    /// A type that already has a source gets both, combined, with `source`
    /// taking precedence. Fails with `InvalidTopologyChange` once `T` is
    /// being observed.
    #[instrument(level = "debug", skip(self, source), fields(target_type = std::any::type_name::<T>()))]
    pub fn setup_source_for<T: Bindable>(&self, source: SharedSource) -> ProviderResult<&Self> {
        let type_name = std::any::type_name::<T>();
        let mut slots = self.slots.lock();
        match slots.entry(TypeId::of::<T>()) {
            Entry::Vacant(entry) => {
                debug!(source = %source.name(), "registered settings source");
                entry.insert(TypeSlot {
                    source,
                    watcher: None,
                });
            }
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                if slot.watcher.is_some() {
                    return Err(ProviderError::InvalidTopologyChange { type_name });
                }
                debug!(
                    existing = %slot.source.name(),
                    added = %source.name(),
                    "combining settings sources"
                );
                slot.source = combine(Arc::clone(&slot.source), source);
            }
        }
        Ok(self)
    }

    pub fn is_registered<T: Bindable>(&self) -> bool {
        self.slots.lock().contains_key(&TypeId::of::<T>())
    }

    /// Whether a watcher is bound for `T`.
    pub fn is_active<T: Bindable>(&self) -> bool {
        self.slots
            .lock()
            .get(&TypeId::of::<T>())
            .is_some_and(|slot| slot.watcher.is_some())
    }

    /// The cached value for `T`, without waiting.
    pub fn cached<T: Bindable>(&self) -> Option<Arc<T>> {
        self.type_cache
            .get(&CacheKey::for_type::<T>())
            .and_then(|cached| cached.downcast::<T>().ok())
    }

    /// Current settings for `T`, blocking until the first emission has
    /// been bound.
    #[instrument(level = "debug", skip(self), fields(target_type = std::any::type_name::<T>()))]
    pub fn get<T: Bindable>(&self) -> ProviderResult<Arc<T>> {
        let watcher = self.watcher::<T>()?;
        if let Some(value) = self.cached::<T>() {
            return Ok(value);
        }
        let (receiver, _subscription) = first_value(&watcher);
        futures::executor::block_on(receiver).unwrap_or_else(|_| Err(source_closed::<T>()))
    }

    /// Async form of [`get`](Self::get).
    #[instrument(level = "debug", skip(self), fields(target_type = std::any::type_name::<T>()))]
    pub async fn get_async<T: Bindable>(&self) -> ProviderResult<Arc<T>> {
        let watcher = self.watcher::<T>()?;
        if let Some(value) = self.cached::<T>() {
            return Ok(value);
        }
        let (receiver, _subscription) = first_value(&watcher);
        receiver.await.unwrap_or_else(|_| Err(source_closed::<T>()))
    }

    /// Push every bound value of `T` to `observer`, starting with the
    /// current one.
    pub fn observe<T: Bindable>(
        &self,
        observer: impl Fn(ProviderResult<Arc<T>>) + Send + Sync + 'static,
    ) -> ProviderResult<Subscription> {
        Ok(self.watcher::<T>()?.subscribe(observer))
    }

    /// Stream of bound values of `T`, starting with the current one.
    pub fn updates<T: Bindable>(&self) -> ProviderResult<Updates<T>> {
        let watcher = self.watcher::<T>()?;
        Ok(Updates::attach(|observer| watcher.subscribe(observer)))
    }

    /// Bind `T` from an ad-hoc source. Values are cached per source,
    /// separately from registered types.
    #[instrument(level = "debug", skip(self, source), fields(target_type = std::any::type_name::<T>()))]
    pub fn get_from<T: Bindable>(&self, source: &SharedSource) -> ProviderResult<Arc<T>> {
        let key = CacheKey::for_source::<T>(source);
        if let Some(value) = self
            .source_cache
            .get(&key)
            .and_then(|cached| cached.downcast::<T>().ok())
        {
            return Ok(value);
        }
        let watcher = self.ad_hoc_watcher::<T>(source);
        let (receiver, subscription) = first_value(&watcher);
        let result =
            futures::executor::block_on(receiver).unwrap_or_else(|_| Err(source_closed::<T>()));
        drop(subscription);
        watcher.close();
        result
    }

    /// Push every value of `T` bound from an ad-hoc source to `observer`.
    /// The source is bound for this observer alone.
    pub fn observe_from<T: Bindable>(
        &self,
        source: &SharedSource,
        observer: impl Fn(ProviderResult<Arc<T>>) + Send + Sync + 'static,
    ) -> Subscription {
        let watcher = self.ad_hoc_watcher::<T>(source);
        let subscription = watcher.subscribe(observer);
        Subscription::merge(vec![subscription, Subscription::new(move || watcher.close())])
    }

    /// Stream form of [`observe_from`](Self::observe_from).
    pub fn updates_from<T: Bindable>(&self, source: &SharedSource) -> Updates<T> {
        Updates::attach(|observer| self.observe_from::<T>(source, observer))
    }

    /// Detach every watcher, drop all registrations and clear the caches.
    pub fn release(&self) {
        let slots: Vec<TypeSlot> = self.slots.lock().drain().map(|(_, slot)| slot).collect();
        let active = slots.iter().filter(|slot| slot.watcher.is_some()).count();
        for watcher in slots.iter().filter_map(|slot| slot.watcher.as_ref()) {
            watcher.close();
        }
        self.type_cache.clear();
        self.source_cache.clear();
        if !slots.is_empty() {
            debug!(types = slots.len(), active, "released settings provider");
        }
    }

    /// Atomic get-or-create of the watcher for `T`. The creating caller
    /// connects it after the registry lock is released.
    fn watcher<T: Bindable>(&self) -> ProviderResult<Arc<Watcher<T>>> {
        let type_name = std::any::type_name::<T>();
        let (watcher, source) = {
            let mut slots = self.slots.lock();
            let slot = slots
                .get_mut(&TypeId::of::<T>())
                .ok_or(ProviderError::UnknownType { type_name })?;
            if let Some(existing) = &slot.watcher {
                return Arc::clone(existing)
                    .into_any()
                    .downcast::<Watcher<T>>()
                    .map_err(|_| ProviderError::UnknownType { type_name });
            }
            let watcher = Watcher::<T>::new();
            let erased: Arc<dyn AnyWatcher> = watcher.clone();
            slot.watcher = Some(erased);
            (watcher, Arc::clone(&slot.source))
        };

        debug!(target_type = type_name, source = %source.name(), "activating settings watcher");
        watcher.connect(
            source.as_ref(),
            self.pipeline.clone(),
            Arc::clone(&self.type_cache),
            CacheKey::for_type::<T>(),
        );
        Ok(watcher)
    }

    fn ad_hoc_watcher<T: Bindable>(&self, source: &SharedSource) -> Arc<Watcher<T>> {
        let watcher = Watcher::<T>::new();
        watcher.connect(
            source.as_ref(),
            self.pipeline.clone(),
            Arc::clone(&self.source_cache),
            CacheKey::for_source::<T>(source),
        );
        watcher
    }
}

impl Drop for SettingsProvider {
    fn drop(&mut self) {
        self.release();
    }
}

fn source_closed<T>() -> ProviderError {
    ProviderError::SourceClosed {
        type_name: std::any::type_name::<T>(),
    }
}

type FirstValue<T> = oneshot::Receiver<ProviderResult<Arc<T>>>;

/// Subscribe to `watcher` until its first value arrives.
fn first_value<T: Bindable>(watcher: &Watcher<T>) -> (FirstValue<T>, Subscription) {
    let (sender, receiver) = oneshot::channel();
    let sender = Mutex::new(Some(sender));
    let subscription = watcher.subscribe(move |result| {
        if let Some(sender) = sender.lock().take() {
            let _ = sender.send(result);
        }
    });
    (receiver, subscription)
}

/// Async stream of bound values.
///
/// Ends when the provider is released or the source closes. Dropping it
/// unsubscribes.
pub struct Updates<T> {
    receiver: mpsc::UnboundedReceiver<ProviderResult<Arc<T>>>,
    _subscription: Subscription,
}

impl<T: Bindable> Updates<T> {
    fn attach(
        subscribe: impl FnOnce(Box<dyn Fn(ProviderResult<Arc<T>>) + Send + Sync>) -> Subscription,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = subscribe(Box::new(move |result| {
            let _ = sender.send(result);
        }));
        Self {
            receiver,
            _subscription: subscription,
        }
    }

    /// Wait for the next value; `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<ProviderResult<Arc<T>>> {
        self.receiver.recv().await
    }

    /// The next value if one is already queued.
    pub fn try_next(&mut self) -> Option<ProviderResult<Arc<T>>> {
        self.receiver.try_recv().ok()
    }
}

impl<T> Stream for Updates<T> {
    type Item = ProviderResult<Arc<T>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
