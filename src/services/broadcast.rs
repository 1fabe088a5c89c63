//! Synchronous fan-out with replay-one semantics.
//!
//! A [`Broadcast`] remembers the last published item, hands it to every new
//! subscriber, and then delivers each later item to all subscribers on the
//! publishing thread. Delivery is serialized by a reentrant dispatch lock so
//! observers see items in publication order, and an observer may subscribe
//! to the same broadcast from inside its callback.

use parking_lot::{Mutex, ReentrantMutex};
use std::sync::{Arc, Weak};

use crate::domain::ports::Subscription;

type Observer<T> = Arc<dyn Fn(T) + Send + Sync>;

struct State<T> {
    current: Option<T>,
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
    closed: bool,
}

struct Shared<T> {
    dispatch: ReentrantMutex<()>,
    state: Mutex<State<T>>,
}

/// Fan-out list guarded by a mutex, remembering the current value.
pub struct Broadcast<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Broadcast<T> {
    /// Create an empty broadcast with no current value.
    pub fn new() -> Self {
        Self::from_state(None)
    }

    /// Create a broadcast whose current value is `value`.
    pub fn with_value(value: T) -> Self {
        Self::from_state(Some(value))
    }

    fn from_state(current: Option<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                dispatch: ReentrantMutex::new(()),
                state: Mutex::new(State {
                    current,
                    next_id: 0,
                    observers: Vec::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// The last published value.
    pub fn current(&self) -> Option<T> {
        self.shared.state.lock().current.clone()
    }

    /// Publish `item` to every subscriber.
    pub fn publish(&self, item: T) {
        self.publish_with(|| item);
    }

    /// Compute and publish an item while holding the dispatch lock, so the
    /// computation and the fan-out are ordered with respect to other
    /// publications.
    pub fn publish_with(&self, make: impl FnOnce() -> T) {
        let _dispatch = self.shared.dispatch.lock();
        let item = make();
        let observers: Vec<Observer<T>> = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.current = Some(item.clone());
            state.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        };
        for observer in observers {
            observer(item.clone());
        }
    }

    /// Subscribe; the current value, if any, is delivered before this
    /// returns.
    pub fn subscribe(&self, observer: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        let _dispatch = self.shared.dispatch.lock();
        let observer: Observer<T> = Arc::new(observer);
        let (id, current) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Subscription::empty();
            }
            let id = state.next_id;
            state.next_id += 1;
            state.observers.push((id, Arc::clone(&observer)));
            (id, state.current.clone())
        };
        if let Some(current) = current {
            observer(current);
        }

        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            // The observer may own subscriptions to this broadcast; drop it
            // after the state lock is released.
            let removed = {
                let mut state = shared.state.lock();
                let position = state.observers.iter().position(|(i, _)| *i == id);
                position.map(|index| state.observers.remove(index))
            };
            drop(removed);
        })
    }

    /// Drop every subscriber and ignore later publications.
    pub fn close(&self) {
        let observers = {
            let mut state = self.shared.state.lock();
            state.closed = true;
            std::mem::take(&mut state.observers)
        };
        drop(observers);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn observer_count(&self) -> usize {
        self.shared.state.lock().observers.len()
    }
}
