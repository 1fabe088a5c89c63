//! Settings tree: the immutable, hierarchical value produced by sources.
//!
//! A tree is one of three shapes (leaf, ordered list, keyed map) plus an
//! explicit `Null`. Sources publish whole trees wrapped in `Arc` and never
//! mutate a published tree, so readers always see a complete snapshot.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// One node of a settings tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SettingsNode {
    /// Explicit null (YAML `~`, JSON `null`).
    #[default]
    Null,
    /// A single textual value.
    Leaf(String),
    /// Ordered mapping from key to child node.
    Map(SettingsMap),
    /// Index-addressable sequence of child nodes.
    List(Vec<SettingsNode>),
}

/// Shape of a node, used in mismatch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Null,
    Leaf,
    Map,
    List,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Leaf => write!(f, "value"),
            Self::Map => write!(f, "map"),
            Self::List => write!(f, "list"),
        }
    }
}

impl SettingsNode {
    /// Create a leaf node.
    pub fn leaf(value: impl Into<String>) -> Self {
        Self::Leaf(value.into())
    }

    /// Create a map node from key/value pairs. Later duplicates replace
    /// earlier ones in place.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, SettingsNode)>,
    {
        Self::Map(entries.into_iter().collect())
    }

    /// Create a list node.
    pub fn list(items: impl IntoIterator<Item = SettingsNode>) -> Self {
        Self::List(items.into_iter().collect())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Null => NodeKind::Null,
            Self::Leaf(_) => NodeKind::Leaf,
            Self::Map(_) => NodeKind::Map,
            Self::List(_) => NodeKind::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&SettingsMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SettingsNode]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a child by key. Absence is `None`; an explicit null is
    /// `Some(SettingsNode::Null)`.
    pub fn get(&self, key: &str) -> Option<&SettingsNode> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Look up a child by list index.
    pub fn index(&self, index: usize) -> Option<&SettingsNode> {
        self.as_list().and_then(|items| items.get(index))
    }

    /// Follow a `.`-separated path of keys and list indices, e.g.
    /// `servers.0.port`.
    pub fn lookup(&self, path: &str) -> Option<&SettingsNode> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| match node {
                Self::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                Self::Map(map) => map.get(segment),
                _ => None,
            })
    }

    /// Children in order, as `(key, node)` pairs. Lists use `None` keys.
    ///
    /// Leaves and nulls have no children.
    pub fn children(&self) -> Vec<(Option<&str>, &SettingsNode)> {
        match self {
            Self::Map(map) => map.iter().map(|(k, v)| (Some(k), v)).collect(),
            Self::List(items) => items.iter().map(|item| (None, item)).collect(),
            Self::Null | Self::Leaf(_) => Vec::new(),
        }
    }

    /// Deep merge with `other` taking precedence.
    ///
    /// Maps merge key by key recursively; for every other pairing the
    /// right-hand node wins, including an explicit null.
    pub fn merged_with(&self, other: &SettingsNode) -> SettingsNode {
        match (self, other) {
            (Self::Map(left), Self::Map(right)) => {
                let mut merged = left.clone();
                for (key, value) in right.iter() {
                    match merged.matching_key(key) {
                        Some(existing_key) => {
                            let next = match merged.get_exact(&existing_key) {
                                Some(existing) => existing.merged_with(value),
                                None => value.clone(),
                            };
                            merged.insert(existing_key, next);
                        }
                        None => merged.insert(key, value.clone()),
                    }
                }
                Self::Map(merged)
            }
            (_, right) => right.clone(),
        }
    }

    /// Multi-line indented rendering used by the CLI.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        match self {
            Self::Null => out.push_str("~\n"),
            Self::Leaf(value) => {
                out.push_str(value);
                out.push('\n');
            }
            Self::Map(map) => {
                if depth > 0 {
                    out.push('\n');
                }
                for (key, value) in map.iter() {
                    out.push_str(&pad);
                    out.push_str(key);
                    out.push_str(": ");
                    value.render_into(out, depth + 1);
                }
            }
            Self::List(items) => {
                if depth > 0 {
                    out.push('\n');
                }
                for (i, item) in items.iter().enumerate() {
                    out.push_str(&format!("{pad}[{i}]: "));
                    item.render_into(out, depth + 1);
                }
            }
        }
    }
}

impl From<&str> for SettingsNode {
    fn from(value: &str) -> Self {
        Self::leaf(value)
    }
}

impl From<String> for SettingsNode {
    fn from(value: String) -> Self {
        Self::Leaf(value)
    }
}

impl From<serde_json::Value> for SettingsNode {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Leaf(b.to_string()),
            Value::Number(n) => Self::Leaf(n.to_string()),
            Value::String(s) => Self::Leaf(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl Serialize for SettingsNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Leaf(value) => serializer.serialize_str(value),
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.iter() {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Self::List(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(item)?;
                }
                out.end()
            }
        }
    }
}

/// Ordered map of unique keys to child nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsMap {
    entries: Vec<(String, SettingsNode)>,
}

impl SettingsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace in place, keeping the original position of an
    /// existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: SettingsNode) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Exact match first, then ASCII case-insensitive.
    pub fn get(&self, key: &str) -> Option<&SettingsNode> {
        self.get_exact(key).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// The stored spelling of `key`, matched like [`SettingsMap::get`].
    fn matching_key(&self, key: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| self.entries.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)))
            .map(|(k, _)| k.clone())
    }

    fn get_exact(&self, key: &str) -> Option<&SettingsNode> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingsNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, SettingsNode)> for SettingsMap {
    fn from_iter<I: IntoIterator<Item = (K, SettingsNode)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
