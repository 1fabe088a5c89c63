//! Built-in binders for scalar types.

use std::fmt::Display;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use super::binder::{Bindable, Binder, Binding};
use super::registry::BinderRegistry;
use crate::domain::errors::BindError;
use crate::domain::models::SettingsNode;

/// Short type name for error messages (`u16`, `String`).
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Parses a leaf with [`FromStr`].
pub struct ParseBinder<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> ParseBinder<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for ParseBinder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Binder<T> for ParseBinder<T>
where
    T: FromStr + Default,
    T::Err: Display,
{
    fn bind(&self, node: &SettingsNode, _registry: &BinderRegistry) -> Binding<T> {
        let Some(text) = node.as_leaf() else {
            return Binding::failed(BindError::mismatch(short_type_name::<T>(), node.kind()));
        };
        match text.trim().parse::<T>() {
            Ok(value) => Binding::ok(value),
            Err(err) => Binding::failed(BindError::mismatch(
                short_type_name::<T>(),
                format!("'{text}' ({err})"),
            )),
        }
    }
}

/// Takes the leaf text verbatim.
pub struct StringBinder;

impl Binder<String> for StringBinder {
    fn bind(&self, node: &SettingsNode, _registry: &BinderRegistry) -> Binding<String> {
        match node.as_leaf() {
            Some(text) => Binding::ok(text.to_string()),
            None => Binding::failed(BindError::mismatch("String", node.kind())),
        }
    }
}

/// Accepts `true`/`false` in any ASCII case.
pub struct BoolBinder;

impl Binder<bool> for BoolBinder {
    fn bind(&self, node: &SettingsNode, _registry: &BinderRegistry) -> Binding<bool> {
        match node.as_leaf().map(str::trim) {
            Some(text) if text.eq_ignore_ascii_case("true") => Binding::ok(true),
            Some(text) if text.eq_ignore_ascii_case("false") => Binding::ok(false),
            Some(text) => Binding::failed(BindError::mismatch("bool", format!("'{text}'"))),
            None => Binding::failed(BindError::mismatch("bool", node.kind())),
        }
    }
}

impl Bindable for String {
    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(StringBinder))
    }
}

impl Bindable for bool {
    const NULL_TEXT_IS_ABSENT: bool = false;

    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(BoolBinder))
    }
}

impl Bindable for PathBuf {
    fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
        Some(Arc::new(ParseBinder::<Self>::new()))
    }
}

macro_rules! value_type_bindable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Bindable for $ty {
                const NULL_TEXT_IS_ABSENT: bool = false;

                fn default_binder() -> Option<Arc<dyn Binder<Self>>> {
                    Some(Arc::new(ParseBinder::<Self>::new()))
                }
            }
        )*
    };
}

value_type_bindable!(
    char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::BindErrorKind;

    fn bind<T: Bindable>(node: SettingsNode) -> Binding<T> {
        BinderRegistry::new().bind::<T>(&node)
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(bind::<u16>(SettingsNode::leaf("8080")).into_result().unwrap(), 8080);
        assert_eq!(bind::<i32>(SettingsNode::leaf(" -3 ")).into_result().unwrap(), -3);
        assert!((bind::<f64>(SettingsNode::leaf("1.5")).into_result().unwrap() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_out_of_range_is_mismatch() {
        let binding = bind::<u8>(SettingsNode::leaf("300"));
        assert_eq!(binding.value(), &0);
        assert!(matches!(
            &binding.errors()[0].kind,
            BindErrorKind::NodeTypeMismatch { expected, .. } if expected == "u8"
        ));
    }

    #[test]
    fn test_map_node_is_mismatch() {
        let binding = bind::<String>(SettingsNode::map([("a", SettingsNode::leaf("b"))]));
        assert_eq!(
            binding.errors()[0].kind,
            BindErrorKind::NodeTypeMismatch {
                expected: "String".to_string(),
                found: "map".to_string()
            }
        );
    }

    #[test]
    fn test_bool_is_case_insensitive() {
        assert!(bind::<bool>(SettingsNode::leaf("True")).into_result().unwrap());
        assert!(!bind::<bool>(SettingsNode::leaf("FALSE")).into_result().unwrap());
        assert!(!bind::<bool>(SettingsNode::leaf("yes")).is_ok());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<u16>(), "u16");
        assert_eq!(short_type_name::<String>(), "String");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }
}
