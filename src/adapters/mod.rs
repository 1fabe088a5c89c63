//! Adapters implementing the source port.

pub mod sources;
