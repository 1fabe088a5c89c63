//! Source merging two other sources into one tree.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::domain::models::SettingsNode;
use crate::domain::ports::{SettingsSource, SharedSource, Subscription, TreeObserver};
use crate::services::broadcast::Broadcast;

/// How the right (later registered) side overrides the left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Maps merge key by key; elsewhere the right side wins, including an
    /// explicit null.
    #[default]
    DeepMerge,
    /// The right tree wins wholesale once it exists.
    Replace,
}

impl MergePolicy {
    fn apply(
        self,
        left: Option<&Arc<SettingsNode>>,
        right: Option<&Arc<SettingsNode>>,
    ) -> Option<Arc<SettingsNode>> {
        match (left, right) {
            (Some(left), Some(right)) => match self {
                Self::DeepMerge => Some(Arc::new(left.merged_with(right))),
                Self::Replace => Some(Arc::clone(right)),
            },
            (Some(only), None) | (None, Some(only)) => Some(Arc::clone(only)),
            (None, None) => None,
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

#[derive(Default)]
struct Latest {
    left: Option<Arc<SettingsNode>>,
    right: Option<Arc<SettingsNode>>,
}

struct Inner {
    policy: MergePolicy,
    latest: Mutex<Latest>,
    merged: Broadcast<Arc<SettingsNode>>,
}

impl Inner {
    fn update(&self, side: Side, tree: Arc<SettingsNode>) {
        self.merged.publish_with(|| {
            let mut latest = self.latest.lock();
            match side {
                Side::Left => latest.left = Some(tree),
                Side::Right => latest.right = Some(tree),
            }
            // One side was just set, so a merged tree always exists.
            self.policy
                .apply(latest.left.as_ref(), latest.right.as_ref())
                .unwrap_or_default()
        });
    }
}

/// Source observing two inputs and emitting one merged tree per update
/// from either of them.
///
/// Inputs are subscribed lazily, on the first subscription to the
/// combined source. A side without a snapshot yet counts as absent.
pub struct CombinedSource {
    left: SharedSource,
    right: SharedSource,
    inner: Arc<Inner>,
    upstream: Mutex<Option<Subscription>>,
}

impl CombinedSource {
    pub fn new(left: SharedSource, right: SharedSource) -> Self {
        Self::with_policy(left, right, MergePolicy::default())
    }

    pub fn with_policy(left: SharedSource, right: SharedSource, policy: MergePolicy) -> Self {
        Self {
            left,
            right,
            inner: Arc::new(Inner {
                policy,
                latest: Mutex::new(Latest::default()),
                merged: Broadcast::new(),
            }),
            upstream: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.inner.policy
    }

    fn connect(&self) {
        let mut upstream = self.upstream.lock();
        if upstream.is_some() || self.inner.merged.is_closed() {
            return;
        }
        tracing::debug!(source = %self.name(), "connecting combined source");
        let subscriptions = [(Side::Left, &self.left), (Side::Right, &self.right)]
            .into_iter()
            .map(|(side, source)| {
                let weak: Weak<Inner> = Arc::downgrade(&self.inner);
                source.subscribe(Box::new(move |tree: Arc<SettingsNode>| {
                    if let Some(inner) = weak.upgrade() {
                        inner.update(side, tree);
                    }
                }))
            })
            .collect();
        *upstream = Some(Subscription::merge(subscriptions));
    }
}

impl SettingsSource for CombinedSource {
    fn name(&self) -> String {
        format!("{} + {}", self.left.name(), self.right.name())
    }

    fn snapshot(&self) -> Option<Arc<SettingsNode>> {
        self.inner.merged.current().or_else(|| {
            self.inner
                .policy
                .apply(self.left.snapshot().as_ref(), self.right.snapshot().as_ref())
        })
    }

    fn subscribe(&self, observer: TreeObserver) -> Subscription {
        self.connect();
        self.inner.merged.subscribe(observer)
    }

    fn release(&self) {
        self.inner.merged.close();
        if let Some(subscription) = self.upstream.lock().take() {
            subscription.unsubscribe();
        }
    }
}

/// Combine two sources with the default deep-merge policy; `right` takes
/// precedence.
pub fn combine(left: SharedSource, right: SharedSource) -> SharedSource {
    Arc::new(CombinedSource::new(left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sources::MemorySource;
    use serde_json::json;

    fn memory(value: serde_json::Value) -> Arc<MemorySource> {
        Arc::new(MemorySource::with_tree("memory", SettingsNode::from(value)))
    }

    fn collect(source: &dyn SettingsSource) -> (Arc<Mutex<Vec<Arc<SettingsNode>>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = source.subscribe(Box::new(move |tree: Arc<SettingsNode>| {
            sink.lock().push(tree);
        }));
        (seen, subscription)
    }

    #[test]
    fn test_right_side_wins_on_conflict() {
        let left = memory(json!({ "Host": "a", "Port": "1" }));
        let right = memory(json!({ "Port": "2" }));
        let combined = CombinedSource::new(left, right);
        let tree = combined.snapshot().unwrap();
        assert_eq!(tree.get("Host").and_then(SettingsNode::as_leaf), Some("a"));
        assert_eq!(tree.get("Port").and_then(SettingsNode::as_leaf), Some("2"));
    }

    #[test]
    fn test_emits_on_update_from_either_side() {
        let left = memory(json!({ "A": "1" }));
        let right = memory(json!({ "B": "1" }));
        let combined = CombinedSource::new(left.clone(), right.clone());
        let (seen, _sub) = collect(&combined);
        let initial = seen.lock().len();

        left.set(SettingsNode::from(json!({ "A": "2" })));
        right.set(SettingsNode::from(json!({ "B": "3" })));

        let seen = seen.lock();
        assert_eq!(seen.len(), initial + 2);
        let last = seen.last().unwrap();
        assert_eq!(last.get("A").and_then(SettingsNode::as_leaf), Some("2"));
        assert_eq!(last.get("B").and_then(SettingsNode::as_leaf), Some("3"));
    }

    #[test]
    fn test_missing_side_is_absent() {
        let left = memory(json!({ "A": "1" }));
        let right = Arc::new(MemorySource::new("empty"));
        let combined = CombinedSource::new(left, right.clone());
        let (seen, _sub) = collect(&combined);
        let first = seen.lock().last().cloned().unwrap();
        assert_eq!(first.get("A").and_then(SettingsNode::as_leaf), Some("1"));
        right.set(SettingsNode::from(json!({ "A": null })));
        assert!(seen.lock().last().unwrap().get("A").unwrap().is_null());
    }

    #[test]
    fn test_replace_policy() {
        let left = memory(json!({ "A": "1" }));
        let right = memory(json!({ "B": "2" }));
        let combined = CombinedSource::with_policy(left, right, MergePolicy::Replace);
        let tree = combined.snapshot().unwrap();
        assert!(tree.get("A").is_none());
        assert_eq!(combined.policy(), MergePolicy::Replace);
    }

    #[test]
    fn test_inputs_are_subscribed_lazily_and_released() {
        let left = memory(json!({}));
        let right = memory(json!({}));
        let combined = CombinedSource::new(left.clone(), right.clone());
        assert_eq!(left.observer_count(), 0);
        let (_seen, sub) = collect(&combined);
        assert_eq!(left.observer_count(), 1);
        assert_eq!(right.observer_count(), 1);
        drop(sub);
        combined.release();
        assert_eq!(left.observer_count(), 0);
        assert_eq!(right.observer_count(), 0);
    }
}
