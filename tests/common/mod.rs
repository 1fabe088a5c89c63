//! Common test utilities for integration tests
//!
//! Provides shared fixtures and settings types used across multiple
//! integration test files.

#![allow(dead_code)]

use std::sync::Arc;

use bindery::services::binding::{Bindable, BinderRegistry, Binding};
use bindery::{
    bindable_struct, BoundMembers, Field, MemorySource, SettingsNode, SettingsStruct, StructSchema,
};

/// Server settings with a required port and an optional host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSettings {
    pub port: u16,
    pub host: String,
}

impl SettingsStruct for ServerSettings {
    fn schema() -> StructSchema<Self> {
        StructSchema::new()
            .field(Field::<u16>::new("Port").required())
            .field(Field::<String>::new("Host"))
    }

    fn assemble(members: &mut BoundMembers) -> Self {
        Self {
            port: members.take("Port"),
            host: members.take("Host"),
        }
    }
}

bindable_struct!(ServerSettings);

/// Distinct settings types sharing one shape, for cache tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Numbered<const N: usize>(pub u32);

impl<const N: usize> Bindable for Numbered<N> {
    const NULL_TEXT_IS_ABSENT: bool = false;

    fn default_binder() -> Option<Arc<dyn bindery::Binder<Self>>> {
        Some(Arc::new(|node: &SettingsNode, registry: &BinderRegistry| {
            registry.bind::<u32>(node).map(Self)
        }))
    }
}

/// Memory source holding a tree built from JSON.
pub fn json_source(name: &str, value: serde_json::Value) -> Arc<MemorySource> {
    Arc::new(MemorySource::with_tree(name, SettingsNode::from(value)))
}

/// Bind `value` with a fresh registry.
pub fn bind_json<T: Bindable>(value: serde_json::Value) -> Binding<T> {
    BinderRegistry::new().bind::<T>(&SettingsNode::from(value))
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
