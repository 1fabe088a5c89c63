//! Binders for containers.
//!
//! Lists and sets accept list-shaped nodes and keyed maps (whose values are
//! taken in order); `Null` binds to an empty container and a leaf is a
//! mismatch. Every child is bound on its own, so one bad element never
//! stops its siblings, and its errors are reported under its index.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use super::binder::{Bindable, Binder, Binding};
use super::registry::BinderRegistry;
use crate::domain::errors::{BindError, PathSegment};
use crate::domain::models::SettingsNode;

/// Bind each child of a list- or map-shaped node, in order.
fn bind_children<T: Bindable>(
    node: &SettingsNode,
    registry: &BinderRegistry,
    expected: &str,
) -> Result<Vec<Binding<T>>, BindError> {
    match node {
        SettingsNode::Null => Ok(Vec::new()),
        SettingsNode::Leaf(_) => Err(BindError::mismatch(expected, node.kind())),
        SettingsNode::List(_) | SettingsNode::Map(_) => Ok(node
            .children()
            .into_iter()
            .enumerate()
            .map(|(index, (_, child))| registry.bind::<T>(child).at(PathSegment::Index(index)))
            .collect()),
    }
}

/// Binds `Vec<T>`. Failed positions keep `T::default()`.
pub struct ListBinder<T> {
    _element: PhantomData<fn() -> T>,
}

impl<T> Default for ListBinder<T> {
    fn default() -> Self {
        Self {
            _element: PhantomData,
        }
    }
}

impl<T: Bindable> Binder<Vec<T>> for ListBinder<T> {
    fn bind(&self, node: &SettingsNode, registry: &BinderRegistry) -> Binding<Vec<T>> {
        let children = match bind_children::<T>(node, registry, "list") {
            Ok(children) => children,
            Err(error) => return Binding::failed(error),
        };
        let mut values = Vec::with_capacity(children.len());
        let mut errors = Vec::new();
        for child in children {
            let (value, child_errors) = child.into_parts();
            values.push(value);
            errors.extend(child_errors);
        }
        Binding::with_errors(values, errors)
    }
}

impl<T: Bindable> Bindable for Vec<T> {
    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(ListBinder::<T>::default()))
    }
}

/// Binds set-like containers. Duplicates collapse after binding and
/// failed positions are dropped.
pub struct SetBinder<C, T> {
    _shape: PhantomData<fn() -> (C, T)>,
}

impl<C, T> Default for SetBinder<C, T> {
    fn default() -> Self {
        Self {
            _shape: PhantomData,
        }
    }
}

impl<C, T> Binder<C> for SetBinder<C, T>
where
    C: Bindable + FromIterator<T>,
    T: Bindable,
{
    fn bind(&self, node: &SettingsNode, registry: &BinderRegistry) -> Binding<C> {
        let children = match bind_children::<T>(node, registry, "set") {
            Ok(children) => children,
            Err(error) => return Binding::failed(error),
        };
        let mut values = Vec::with_capacity(children.len());
        let mut errors = Vec::new();
        for child in children {
            let (value, child_errors) = child.into_parts();
            if child_errors.is_empty() {
                values.push(value);
            } else {
                errors.extend(child_errors);
            }
        }
        Binding::with_errors(values.into_iter().collect(), errors)
    }
}

impl<T: Bindable + Ord> Bindable for BTreeSet<T> {
    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(SetBinder::<Self, T>::default()))
    }
}

impl<T: Bindable + Hash + Eq> Bindable for HashSet<T> {
    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(SetBinder::<Self, T>::default()))
    }
}

/// Binds string-keyed maps from map nodes. Errors are reported under the
/// entry key.
pub struct MapBinder<C, T> {
    _shape: PhantomData<fn() -> (C, T)>,
}

impl<C, T> Default for MapBinder<C, T> {
    fn default() -> Self {
        Self {
            _shape: PhantomData,
        }
    }
}

impl<C, T> Binder<C> for MapBinder<C, T>
where
    C: Bindable + FromIterator<(String, T)>,
    T: Bindable,
{
    fn bind(&self, node: &SettingsNode, registry: &BinderRegistry) -> Binding<C> {
        let map = match node {
            SettingsNode::Null => return Binding::ok(C::default()),
            SettingsNode::Map(map) => map,
            _ => return Binding::failed(BindError::mismatch("map", node.kind())),
        };
        let mut entries = Vec::with_capacity(map.len());
        let mut errors = Vec::new();
        for (key, child) in map.iter() {
            let (value, child_errors) = registry
                .bind::<T>(child)
                .at(PathSegment::Member(key.to_string()))
                .into_parts();
            if child_errors.is_empty() {
                entries.push((key.to_string(), value));
            } else {
                errors.extend(child_errors);
            }
        }
        Binding::with_errors(entries.into_iter().collect(), errors)
    }
}

impl<T: Bindable> Bindable for BTreeMap<String, T> {
    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(MapBinder::<Self, T>::default()))
    }
}

impl<T: Bindable> Bindable for HashMap<String, T> {
    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(MapBinder::<Self, T>::default()))
    }
}

/// Binds `Option<T>`: null, or the leaf text `null`, is `None`.
pub struct OptionBinder<T> {
    _inner: PhantomData<fn() -> T>,
}

impl<T> Default for OptionBinder<T> {
    fn default() -> Self {
        Self {
            _inner: PhantomData,
        }
    }
}

impl<T: Bindable> Binder<Option<T>> for OptionBinder<T> {
    fn bind(&self, node: &SettingsNode, registry: &BinderRegistry) -> Binding<Option<T>> {
        let is_null = match node {
            SettingsNode::Null => true,
            SettingsNode::Leaf(text) => text.eq_ignore_ascii_case("null"),
            _ => false,
        };
        if is_null {
            return Binding::ok(None);
        }
        let binding = registry.bind::<T>(node);
        if binding.is_ok() {
            binding.map(Some)
        } else {
            binding.map(|_| None)
        }
    }
}

impl<T: Bindable> Bindable for Option<T> {
    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(OptionBinder::<T>::default()))
    }
}
