//! Service layer: binding engine, provider and their building blocks.

pub mod binding;
pub mod broadcast;
pub mod fifo_cache;
pub mod provider;
pub mod watcher;

pub use binding::{
    Bindable, Binder, BinderRegistry, Binding, BoundMembers, Field, SettingsStruct, StructBinder,
    StructSchema,
};
pub use broadcast::Broadcast;
pub use fifo_cache::{FifoCache, DEFAULT_CACHE_CAPACITY};
pub use provider::{ProviderOptions, SettingsProvider, Updates};
pub use watcher::{ErrorHandler, Watcher};
