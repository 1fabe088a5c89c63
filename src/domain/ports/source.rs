//! Source port: anything that produces settings-tree snapshots.

use std::fmt;
use std::sync::Arc;

use crate::domain::models::SettingsNode;

/// Callback receiving tree snapshots from a source.
pub type TreeObserver = Box<dyn Fn(Arc<SettingsNode>) + Send + Sync>;

/// Shared handle to a source.
pub type SharedSource = Arc<dyn SettingsSource>;

/// Producer of settings trees, pull- and push-style.
///
/// Subscriptions are hot with replay-one semantics: a new subscriber first
/// receives the current snapshot (immediately when one exists, otherwise
/// as soon as the first one is published) and then every later change.
pub trait SettingsSource: Send + Sync {
    /// Human-readable name for logs and error messages.
    fn name(&self) -> String;

    /// Current snapshot, if the source has produced one.
    fn snapshot(&self) -> Option<Arc<SettingsNode>>;

    /// Subscribe to snapshots. Dropping the returned handle unsubscribes.
    fn subscribe(&self, observer: TreeObserver) -> Subscription;

    /// Stop publishing and drop all subscribers.
    fn release(&self) {}
}

/// Handle to a live subscription. Dropping it cancels delivery.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap a cancellation action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn empty() -> Self {
        Self { cancel: None }
    }

    /// Combine several subscriptions into one handle.
    pub fn merge(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || drop(subscriptions))
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Stop receiving updates.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_drop_cancels_once() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cancelled);
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(subscription.is_active());
        subscription.unsubscribe();
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_merge_cancels_all() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let subs = (0..3)
            .map(|_| {
                let counter = Arc::clone(&cancelled);
                Subscription::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        drop(Subscription::merge(subs));
        assert_eq!(cancelled.load(Ordering::SeqCst), 3);
    }
}
