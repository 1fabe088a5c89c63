//! In-memory settings source.

use std::sync::Arc;

use crate::domain::models::SettingsNode;
use crate::domain::ports::{SettingsSource, Subscription, TreeObserver};
use crate::services::broadcast::Broadcast;

/// Source whose tree is set programmatically.
///
/// Every [`set`](MemorySource::set) publishes a new snapshot to all
/// subscribers; new subscribers receive the latest snapshot first.
pub struct MemorySource {
    name: String,
    trees: Broadcast<Arc<SettingsNode>>,
}

impl MemorySource {
    /// A source with no snapshot yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trees: Broadcast::new(),
        }
    }

    /// A source starting with `tree`.
    pub fn with_tree(name: impl Into<String>, tree: SettingsNode) -> Self {
        Self {
            name: name.into(),
            trees: Broadcast::with_value(Arc::new(tree)),
        }
    }

    /// Replace the tree and publish it.
    pub fn set(&self, tree: SettingsNode) {
        self.set_shared(Arc::new(tree));
    }

    pub fn set_shared(&self, tree: Arc<SettingsNode>) {
        tracing::debug!(source = %self.name, "publishing settings tree");
        self.trees.publish(tree);
    }

    pub fn observer_count(&self) -> usize {
        self.trees.observer_count()
    }
}

impl SettingsSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn snapshot(&self) -> Option<Arc<SettingsNode>> {
        self.trees.current()
    }

    fn subscribe(&self, observer: TreeObserver) -> Subscription {
        self.trees.subscribe(observer)
    }

    fn release(&self) {
        self.trees.close();
    }
}
