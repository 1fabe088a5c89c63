//! Struct binding through an explicit member schema.
//!
//! A settings struct lists its members once in a [`StructSchema`]. The
//! [`StructBinder`] evaluates every member independently against the map
//! node, collects the bound values in [`BoundMembers`], and hands them to
//! [`SettingsStruct::assemble`], which builds the final value. Assembly
//! always runs; members that failed hold their defaults.
//!
//! ```ignore
//! #[derive(Default)]
//! struct Endpoint { host: String, port: u16 }
//!
//! impl SettingsStruct for Endpoint {
//!     fn schema() -> StructSchema<Self> {
//!         StructSchema::new()
//!             .field(Field::<String>::new("Host").required())
//!             .field(Field::<u16>::new("Port").default_with(|| 80))
//!     }
//!
//!     fn assemble(members: &mut BoundMembers) -> Self {
//!         Self { host: members.take("Host"), port: members.take("Port") }
//!     }
//! }
//!
//! bindable_struct!(Endpoint);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use super::binder::{Bindable, Binder, Binding};
use super::registry::BinderRegistry;
use super::scalar::short_type_name;
use crate::domain::errors::{BindError, BindErrorKind, PathSegment};
use crate::domain::models::SettingsNode;

/// A struct the binding engine can assemble from a map node.
pub trait SettingsStruct: Bindable + Sized {
    /// Member list. Built once per registry.
    fn schema() -> StructSchema<Self>;

    /// Build the value from the bound members.
    fn assemble(members: &mut BoundMembers) -> Self;
}

/// Explicit per-member requirement. Members without one follow the
/// struct-level policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

type DefaultFn<U> = Arc<dyn Fn() -> U + Send + Sync>;

/// One member of a settings struct.
pub struct Field<U> {
    name: String,
    requirement: Option<Requirement>,
    binder: Option<Arc<dyn Binder<U>>>,
    default: Option<DefaultFn<U>>,
}

impl<U: Bindable> Field<U> {
    /// `name` is the key looked up in the map node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirement: None,
            binder: None,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.requirement = Some(Requirement::Required);
        self
    }

    pub fn optional(mut self) -> Self {
        self.requirement = Some(Requirement::Optional);
        self
    }

    /// Bind this member with `binder` instead of resolving one by type.
    pub fn binder(mut self, binder: impl Binder<U> + 'static) -> Self {
        self.binder = Some(Arc::new(binder));
        self
    }

    /// Value kept when the member is absent or fails to bind.
    pub fn default_with(mut self, default: impl Fn() -> U + Send + Sync + 'static) -> Self {
        self.default = Some(Arc::new(default));
        self
    }

    fn default_value(&self) -> U {
        self.default.as_ref().map_or_else(U::default, |f| f())
    }

    fn is_null(node: Option<&SettingsNode>) -> bool {
        match node {
            None | Some(SettingsNode::Null) => true,
            Some(SettingsNode::Leaf(text)) => {
                U::NULL_TEXT_IS_ABSENT && text.eq_ignore_ascii_case("null")
            }
            Some(_) => false,
        }
    }
}

/// Type-erased member evaluation.
trait Member: Send + Sync {
    fn name(&self) -> &str;

    fn bind_member(
        &self,
        node: Option<&SettingsNode>,
        registry: &BinderRegistry,
        all_required: bool,
    ) -> (Box<dyn Any + Send>, Vec<BindError>);
}

impl<U: Bindable> Member for Field<U> {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind_member(
        &self,
        node: Option<&SettingsNode>,
        registry: &BinderRegistry,
        all_required: bool,
    ) -> (Box<dyn Any + Send>, Vec<BindError>) {
        let default = self.default_value();

        let binder = match &self.binder {
            Some(binder) => Some(Arc::clone(binder)),
            None => registry.resolve::<U>(),
        };
        let undispatched =
            U::is_abstract() && binder.as_ref().is_none_or(|b| b.is_structural());
        if binder.is_none() && !undispatched {
            return (Box::new(default), vec![BindError::binder_not_found::<U>()]);
        }

        let present = node.filter(|n| !Self::is_null(Some(*n)));
        let Some(node) = present else {
            let required = match self.requirement {
                Some(Requirement::Required) => true,
                Some(Requirement::Optional) => false,
                None => all_required,
            };
            let errors = if required {
                vec![BindError::here(BindErrorKind::RequiredPropertyIsNull)]
            } else {
                Vec::new()
            };
            return (Box::new(default), errors);
        };

        let Some(binder) = binder.filter(|_| !undispatched) else {
            return (Box::new(default), Vec::new());
        };

        let (value, errors) = registry.invoke(binder.as_ref(), node).into_parts();
        if errors.is_empty() {
            (Box::new(value), errors)
        } else {
            (Box::new(default), errors)
        }
    }
}

/// Ordered member list of a settings struct.
pub struct StructSchema<T> {
    members: Vec<Box<dyn Member>>,
    all_required: bool,
    _target: PhantomData<fn() -> T>,
}

impl<T> StructSchema<T> {
    /// Members are optional unless marked required.
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            all_required: false,
            _target: PhantomData,
        }
    }

    /// Flip the policy: members are required unless marked optional.
    pub fn all_required(mut self) -> Self {
        self.all_required = true;
        self
    }

    /// Add a member. A member with the same name is replaced.
    pub fn field<U: Bindable>(mut self, field: Field<U>) -> Self {
        let member: Box<dyn Member> = Box::new(field);
        match self.members.iter().position(|m| m.name() == member.name()) {
            Some(index) => self.members[index] = member,
            None => self.members.push(member),
        }
        self
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name()).collect()
    }

    pub fn is_all_required(&self) -> bool {
        self.all_required
    }
}

impl<T> Default for StructSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bound member values, consumed by [`SettingsStruct::assemble`].
pub struct BoundMembers {
    values: HashMap<String, Box<dyn Any + Send>>,
    errors: Vec<BindError>,
}

impl BoundMembers {
    fn new() -> Self {
        Self {
            values: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Take the bound value of member `name`.
    ///
    /// Taking an undeclared member, taking one twice, or taking it as the
    /// wrong type yields `U::default()` and records a `WrappedException`
    /// at the member path.
    pub fn take<U: Bindable>(&mut self, name: &str) -> U {
        let Some(value) = self.values.remove(name) else {
            self.record(name, format!("member '{name}' is not declared in the schema"));
            return U::default();
        };
        match value.downcast::<U>() {
            Ok(value) => *value,
            Err(_) => {
                self.record(
                    name,
                    format!("member '{name}' is not a {}", short_type_name::<U>()),
                );
                U::default()
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn record(&mut self, name: &str, message: String) {
        self.errors
            .push(BindError::wrapped(message).prefixed(PathSegment::from(name)));
    }
}

/// Binder for any [`SettingsStruct`].
pub struct StructBinder<T> {
    schema: StructSchema<T>,
}

impl<T: SettingsStruct> StructBinder<T> {
    pub fn new() -> Self {
        Self::with_schema(T::schema())
    }

    pub fn with_schema(schema: StructSchema<T>) -> Self {
        Self { schema }
    }
}

impl<T: SettingsStruct> Default for StructBinder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SettingsStruct> Binder<T> for StructBinder<T> {
    fn is_structural(&self) -> bool {
        true
    }

    fn bind(&self, node: &SettingsNode, registry: &BinderRegistry) -> Binding<T> {
        let map = match node {
            SettingsNode::Null => None,
            SettingsNode::Map(map) => Some(map),
            _ => {
                return Binding::failed(BindError::mismatch(short_type_name::<T>(), node.kind()));
            }
        };

        let mut members = BoundMembers::new();
        let mut errors = Vec::new();
        for member in &self.schema.members {
            let name = member.name();
            let child = map.and_then(|m| m.get(name));
            let (value, member_errors) =
                member.bind_member(child, registry, self.schema.all_required);
            errors.extend(
                member_errors
                    .into_iter()
                    .map(|e| e.prefixed(PathSegment::from(name))),
            );
            members.values.insert(name.to_string(), value);
        }

        let value = T::assemble(&mut members);
        errors.append(&mut members.errors);
        Binding::with_errors(value, errors)
    }
}

/// Implement [`Bindable`] for [`SettingsStruct`] types, using
/// [`StructBinder`] as the built-in binder.
#[macro_export]
macro_rules! bindable_struct {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::services::binding::Bindable for $ty {
                fn default_binder() -> ::std::option::Option<
                    ::std::sync::Arc<dyn $crate::services::binding::Binder<Self>>,
                > {
                    ::std::option::Option::Some(::std::sync::Arc::new(
                        $crate::services::binding::StructBinder::<Self>::new(),
                    ))
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Endpoint {
        host: String,
        port: u16,
        tags: Vec<String>,
    }

    impl SettingsStruct for Endpoint {
        fn schema() -> StructSchema<Self> {
            StructSchema::new()
                .field(Field::<String>::new("Host").required())
                .field(Field::<u16>::new("Port").default_with(|| 80))
                .field(Field::<Vec<String>>::new("Tags"))
        }

        fn assemble(members: &mut BoundMembers) -> Self {
            Self {
                host: members.take("Host"),
                port: members.take("Port"),
                tags: members.take("Tags"),
            }
        }
    }

    crate::bindable_struct!(Endpoint);

    #[derive(Debug, Default)]
    struct Strict {
        name: String,
        note: String,
    }

    impl SettingsStruct for Strict {
        fn schema() -> StructSchema<Self> {
            StructSchema::new()
                .all_required()
                .field(Field::<String>::new("Name"))
                .field(Field::<String>::new("Note").optional())
        }

        fn assemble(members: &mut BoundMembers) -> Self {
            Self {
                name: members.take("Name"),
                note: members.take("Note"),
            }
        }
    }

    crate::bindable_struct!(Strict);

    #[derive(Debug, Default)]
    struct Plugin;

    impl Bindable for Plugin {
        fn is_abstract() -> bool {
            true
        }
    }

    #[derive(Debug, Default)]
    struct Host {
        plugin: Plugin,
        name: String,
    }

    impl SettingsStruct for Host {
        fn schema() -> StructSchema<Self> {
            StructSchema::new()
                .field(Field::<Plugin>::new("Plugin").required())
                .field(Field::<String>::new("Name"))
        }

        fn assemble(members: &mut BoundMembers) -> Self {
            Self {
                plugin: members.take("Plugin"),
                name: members.take("Name"),
            }
        }
    }

    crate::bindable_struct!(Host);

    fn bind<T: Bindable>(value: serde_json::Value) -> Binding<T> {
        BinderRegistry::new().bind::<T>(&SettingsNode::from(value))
    }

    #[test]
    fn test_binds_all_members() {
        let endpoint = bind::<Endpoint>(json!({ "Host": "db", "Port": 5432, "Tags": ["a"] }))
            .into_result()
            .unwrap();
        assert_eq!(
            endpoint,
            Endpoint {
                host: "db".into(),
                port: 5432,
                tags: vec!["a".into()]
            }
        );
    }

    #[test]
    fn test_optional_member_keeps_instance_default() {
        let endpoint = bind::<Endpoint>(json!({ "Host": "db" })).into_result().unwrap();
        assert_eq!(endpoint.port, 80);
        assert!(endpoint.tags.is_empty());
    }

    #[test]
    fn test_required_member_missing() {
        let binding = bind::<Endpoint>(json!({ "Port": "1" }));
        assert_eq!(binding.value().port, 1);
        let error = &binding.errors()[0];
        assert_eq!(error.path.to_string(), "Host");
        assert_eq!(error.kind, BindErrorKind::RequiredPropertyIsNull);
    }

    #[test]
    fn test_null_text_counts_as_absent_for_strings() {
        let binding = bind::<Endpoint>(json!({ "Host": "NULL" }));
        assert_eq!(binding.errors()[0].kind, BindErrorKind::RequiredPropertyIsNull);
    }

    #[test]
    fn test_null_text_is_malformed_for_numbers() {
        let binding = bind::<Endpoint>(json!({ "Host": "db", "Port": "null" }));
        assert_eq!(binding.value().port, 80);
        assert!(matches!(
            binding.errors()[0].kind,
            BindErrorKind::NodeTypeMismatch { .. }
        ));
    }

    #[test]
    fn test_every_member_is_reported() {
        let binding = bind::<Endpoint>(json!({ "Port": "x", "Tags": ["1", { "a": "b" }] }));
        let paths: Vec<String> = binding.errors().iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["Host", "Port", "Tags[1]"]);
    }

    #[test]
    fn test_null_node_is_empty_map() {
        let binding = BinderRegistry::new().bind::<Endpoint>(&SettingsNode::Null);
        assert_eq!(binding.errors().len(), 1);
        assert_eq!(binding.value().port, 80);
    }

    #[test]
    fn test_leaf_node_is_rejected() {
        let binding = BinderRegistry::new().bind::<Endpoint>(&SettingsNode::leaf("db:80"));
        assert!(matches!(
            &binding.errors()[0].kind,
            BindErrorKind::NodeTypeMismatch { expected, found } if expected == "Endpoint" && found == "value"
        ));
    }

    #[test]
    fn test_all_required_policy() {
        let binding = bind::<Strict>(json!({}));
        assert_eq!(binding.errors().len(), 1);
        assert_eq!(binding.errors()[0].path.to_string(), "Name");
        let strict = bind::<Strict>(json!({ "name": "x" })).into_result().unwrap();
        assert_eq!(strict.name, "x");
        assert!(strict.note.is_empty());
    }

    #[test]
    fn test_abstract_member_is_skipped() {
        let host = bind::<Host>(json!({ "Plugin": { "Kind": "x" }, "Name": "h" }))
            .into_result()
            .unwrap();
        assert_eq!(host.name, "h");
    }

    #[test]
    fn test_required_abstract_member_missing() {
        let binding = bind::<Host>(json!({ "Name": "h" }));
        assert_eq!(binding.errors().len(), 1);
        assert_eq!(binding.errors()[0].path.to_string(), "Plugin");
        assert_eq!(binding.errors()[0].kind, BindErrorKind::RequiredPropertyIsNull);
    }

    #[derive(Debug, Default, PartialEq)]
    enum Backend {
        #[default]
        Unset,
        Redis(String),
        Memory,
    }

    impl Bindable for Backend {
        fn is_abstract() -> bool {
            true
        }

        fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
            Some(Arc::new(|node: &SettingsNode, _: &BinderRegistry| {
                match node.get("Kind").and_then(SettingsNode::as_leaf) {
                    Some("redis") => Binding::ok(Backend::Redis(
                        node.get("Url").and_then(SettingsNode::as_leaf).unwrap_or_default().to_string(),
                    )),
                    Some("memory") => Binding::ok(Backend::Memory),
                    other => Binding::failed(BindError::mismatch(
                        "backend kind",
                        other.unwrap_or("nothing"),
                    )),
                }
            }))
        }
    }

    #[derive(Debug, Default)]
    struct Cache {
        backend: Backend,
    }

    impl SettingsStruct for Cache {
        fn schema() -> StructSchema<Self> {
            StructSchema::new().field(Field::<Backend>::new("Backend"))
        }

        fn assemble(members: &mut BoundMembers) -> Self {
            Self {
                backend: members.take("Backend"),
            }
        }
    }

    crate::bindable_struct!(Cache);

    #[test]
    fn test_abstract_member_with_dispatching_binder_is_bound() {
        let cache = bind::<Cache>(json!({ "Backend": { "Kind": "redis", "Url": "redis://r" } }))
            .into_result()
            .unwrap();
        assert_eq!(cache.backend, Backend::Redis("redis://r".to_string()));

        let binding = bind::<Cache>(json!({ "Backend": { "Kind": "disk" } }));
        assert_eq!(binding.errors()[0].path.to_string(), "Backend");
        assert_eq!(binding.value().backend, Backend::Unset);
    }

    #[test]
    fn test_unresolvable_member_reports_binder_not_found() {
        #[derive(Debug, Default)]
        struct Opaque;
        impl Bindable for Opaque {}

        #[derive(Debug, Default)]
        struct Outer {
            _opaque: Opaque,
            name: String,
        }

        impl SettingsStruct for Outer {
            fn schema() -> StructSchema<Self> {
                StructSchema::new()
                    .field(Field::<Opaque>::new("Opaque"))
                    .field(Field::<String>::new("Name"))
            }

            fn assemble(members: &mut BoundMembers) -> Self {
                Self {
                    _opaque: members.take("Opaque"),
                    name: members.take("Name"),
                }
            }
        }

        crate::bindable_struct!(Outer);

        let binding = bind::<Outer>(json!({ "Name": "n" }));
        assert_eq!(binding.value().name, "n");
        assert_eq!(binding.errors().len(), 1);
        assert_eq!(binding.errors()[0].path.to_string(), "Opaque");
        assert!(matches!(
            binding.errors()[0].kind,
            BindErrorKind::BinderNotFound { .. }
        ));
    }

    #[test]
    fn test_member_binder_override() {
        #[derive(Debug, Default)]
        struct Shouty {
            name: String,
        }

        impl SettingsStruct for Shouty {
            fn schema() -> StructSchema<Self> {
                StructSchema::new().field(Field::<String>::new("Name").binder(
                    |node: &SettingsNode, _: &BinderRegistry| {
                        Binding::ok(node.as_leaf().unwrap_or_default().to_uppercase())
                    },
                ))
            }

            fn assemble(members: &mut BoundMembers) -> Self {
                Self {
                    name: members.take("Name"),
                }
            }
        }

        crate::bindable_struct!(Shouty);

        let value = bind::<Shouty>(json!({ "Name": "quiet" })).into_result().unwrap();
        assert_eq!(value.name, "QUIET");
    }

    #[test]
    fn test_take_with_wrong_type_is_wrapped() {
        #[derive(Debug, Default)]
        struct Confused {
            port: u32,
        }

        impl SettingsStruct for Confused {
            fn schema() -> StructSchema<Self> {
                StructSchema::new().field(Field::<u16>::new("Port"))
            }

            fn assemble(members: &mut BoundMembers) -> Self {
                Self {
                    port: members.take("Port"),
                }
            }
        }

        crate::bindable_struct!(Confused);

        let binding = bind::<Confused>(json!({ "Port": "1" }));
        assert_eq!(binding.value().port, 0);
        assert!(matches!(
            binding.errors()[0].kind,
            BindErrorKind::WrappedException { .. }
        ));
        assert_eq!(binding.errors()[0].path.to_string(), "Port");
    }

    #[test]
    fn test_later_field_replaces_earlier() {
        let schema = StructSchema::<Endpoint>::new()
            .field(Field::<String>::new("Host"))
            .field(Field::<u16>::new("Port"))
            .field(Field::<String>::new("Host").required());
        assert_eq!(schema.member_names(), vec!["Host", "Port"]);
    }

    #[derive(Debug, Default)]
    struct TreeNode {
        name: String,
        children: Vec<TreeNode>,
    }

    impl SettingsStruct for TreeNode {
        fn schema() -> StructSchema<Self> {
            StructSchema::new()
                .field(Field::<String>::new("Name"))
                .field(Field::<Vec<TreeNode>>::new("Children"))
        }

        fn assemble(members: &mut BoundMembers) -> Self {
            Self {
                name: members.take("Name"),
                children: members.take("Children"),
            }
        }
    }

    crate::bindable_struct!(TreeNode);

    #[test]
    fn test_recursive_type() {
        let root = bind::<TreeNode>(json!({
            "Name": "root",
            "Children": [{ "Name": "a", "Children": [{ "Name": "b" }] }]
        }))
        .into_result()
        .unwrap();
        assert_eq!(root.children[0].children[0].name, "b");
    }
}
