//! Binding engine: turns settings trees into typed values.
//!
//! - [`binder`]: the `Binder` contract and the `Binding` result
//! - [`registry`]: binder resolution and caching per target type
//! - [`scalar`], [`collection`], [`structure`]: built-in binders

pub mod binder;
pub mod collection;
pub mod registry;
pub mod scalar;
pub mod structure;

pub use binder::{Bindable, Binder, Binding};
pub use collection::{ListBinder, MapBinder, OptionBinder, SetBinder};
pub use registry::BinderRegistry;
pub use scalar::{BoolBinder, ParseBinder, StringBinder};
pub use structure::{BoundMembers, Field, Requirement, SettingsStruct, StructBinder, StructSchema};
