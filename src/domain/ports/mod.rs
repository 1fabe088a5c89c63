//! Port trait definitions (Hexagonal Architecture)
//!
//! Sources are the only external collaborator the core consumes:
//! - SettingsSource: produces settings-tree snapshots, pulled or pushed
//!
//! Concrete sources live in `crate::adapters::sources`.

pub mod source;

pub use source::{SettingsSource, SharedSource, Subscription, TreeObserver};
