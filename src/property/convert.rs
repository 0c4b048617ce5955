//! Conversion between host values and property values.
//!
//! [`HostValue`] is the "any host value" surface: plain scalars, sequences,
//! and string-keyed maps, plus a pass-through slot for values already in
//! engine form. Structured records enter through their serde annotations.
//! Each conversion entry point takes an optional pair of replacement hooks
//! `(replk, replv)` that may short-circuit key or value conversion.

use serde::Serialize;
use std::collections::BTreeMap;

use super::map::{PropertyKey, PropertyMap};
use super::value::PropertyValue;

/// A replacement hook for keys during conversion into property form.
pub type KeyReplacer<'a> = &'a dyn Fn(&str) -> Option<PropertyKey>;

/// A replacement hook for values during conversion into property form.
pub type ValueReplacer<'a> = &'a dyn Fn(&HostValue) -> Option<PropertyValue>;

/// A replacement hook for keys during rendering back to host form.
pub type KeyRenderer<'a> = &'a dyn Fn(&str) -> Option<String>;

/// A replacement hook for values during rendering back to host form.
pub type ValueRenderer<'a> = &'a dyn Fn(&PropertyValue) -> Option<HostValue>;

/// A host-side value: the input to property conversion and the output of
/// rendering.
///
/// Engine-native values (assets, archives, computed placeholders, outputs,
/// secrets, resource references) ride in the [`Property`](HostValue::Property)
/// slot and pass through conversion and rendering unchanged; the host
/// decides how to display them.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer; widened lossily to float during conversion.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// UTF-8 text.
    String(String),
    /// An ordered sequence.
    Array(Vec<HostValue>),
    /// A string-keyed mapping.
    Map(BTreeMap<String, HostValue>),
    /// A value already in engine form, passed through unchanged.
    Property(PropertyValue),
}

impl PropertyValue {
    /// Converts a host value into a property value.
    #[must_use]
    pub fn from_host(v: HostValue) -> Self {
        Self::from_host_repl(v, None, None)
    }

    /// Converts a host value into a property value, with optional key and
    /// value replacement hooks.
    #[must_use]
    pub fn from_host_repl(
        v: HostValue,
        replk: Option<KeyReplacer<'_>>,
        replv: Option<ValueReplacer<'_>>,
    ) -> Self {
        if let Some(replv) = replv
            && let Some(replaced) = replv(&v)
        {
            return replaced;
        }

        match v {
            HostValue::Null => Self::Null,
            HostValue::Bool(b) => Self::Bool(b),
            #[allow(clippy::cast_precision_loss)]
            HostValue::Int(i) => Self::Number(i as f64),
            HostValue::Float(f) => Self::Number(f),
            HostValue::String(s) => Self::String(s),
            HostValue::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(|item| Self::from_host_repl(item, replk, replv))
                    .collect(),
            ),
            HostValue::Map(m) => Self::Object(PropertyMap::from_host_map_repl(m, replk, replv)),
            HostValue::Property(p) => p,
        }
    }

    /// Renders the value back to host form.
    ///
    /// Scalars, arrays, and objects become their host counterparts; assets,
    /// archives, computed placeholders, outputs, secrets, and resource
    /// references pass through unchanged.
    #[must_use]
    pub fn mappable(&self) -> HostValue {
        self.map_repl(None, None)
    }

    /// Renders the value back to host form, with optional key and value
    /// replacement hooks.
    #[must_use]
    pub fn map_repl(
        &self,
        replk: Option<KeyRenderer<'_>>,
        replv: Option<ValueRenderer<'_>>,
    ) -> HostValue {
        if let Some(replv) = replv
            && let Some(replaced) = replv(self)
        {
            return replaced;
        }

        match self {
            Self::Null => HostValue::Null,
            Self::Bool(b) => HostValue::Bool(*b),
            Self::Number(n) => HostValue::Float(*n),
            Self::String(s) => HostValue::String(s.clone()),
            Self::Array(items) => HostValue::Array(
                items
                    .iter()
                    .map(|item| item.map_repl(replk, replv))
                    .collect(),
            ),
            Self::Object(map) => HostValue::Map(map.map_repl(replk, replv)),
            other => HostValue::Property(other.clone()),
        }
    }
}

impl PropertyMap {
    /// Converts a host map into a property map.
    #[must_use]
    pub fn from_host_map(m: BTreeMap<String, HostValue>) -> Self {
        Self::from_host_map_repl(m, None, None)
    }

    /// Converts a host map into a property map, with optional key and value
    /// replacement hooks.
    ///
    /// # Panics
    ///
    /// Panics if a key replacement maps two distinct host keys onto the same
    /// property key; colliding keys are rejected rather than guessed at.
    #[must_use]
    pub fn from_host_map_repl(
        m: BTreeMap<String, HostValue>,
        replk: Option<KeyReplacer<'_>>,
        replv: Option<ValueReplacer<'_>>,
    ) -> Self {
        let mut result = Self::new();
        for (k, v) in m {
            let key = replk
                .and_then(|replk| replk(&k))
                .unwrap_or_else(|| PropertyKey::from(k.as_str()));
            assert!(
                !result.contains_key(key.as_str()),
                "duplicate property key '{key}' after replacement"
            );
            result.insert(key, PropertyValue::from_host_repl(v, replk, replv));
        }
        result
    }

    /// Converts a structured record into a property map, using its serde
    /// field annotations to determine naming.
    ///
    /// # Panics
    ///
    /// Panics if the record cannot be serialized or does not serialize to a
    /// map; converting an unsupported host type is a programming error, not
    /// a runtime condition.
    #[must_use]
    pub fn from_serializable<T: Serialize>(record: &T) -> Self {
        Self::from_serializable_repl(record, None, None)
    }

    /// Converts a structured record into a property map with optional key
    /// and value replacement hooks.
    ///
    /// # Panics
    ///
    /// Panics if the record cannot be serialized or does not serialize to a
    /// map.
    #[must_use]
    pub fn from_serializable_repl<T: Serialize>(
        record: &T,
        replk: Option<KeyReplacer<'_>>,
        replv: Option<ValueReplacer<'_>>,
    ) -> Self {
        let value = match serde_json::to_value(record) {
            Ok(v) => v,
            Err(e) => panic!("record of properties failed to convert: {e}"),
        };
        match HostValue::from(value) {
            HostValue::Map(m) => Self::from_host_map_repl(m, replk, replv),
            other => panic!("expected a structured record, found {other:?}"),
        }
    }

    /// Renders the map back to host form.
    #[must_use]
    pub fn mappable(&self) -> BTreeMap<String, HostValue> {
        self.map_repl(None, None)
    }

    /// Renders the map back to host form, with optional key and value
    /// replacement hooks. Keys are visited in stable order.
    #[must_use]
    pub fn map_repl(
        &self,
        replk: Option<KeyRenderer<'_>>,
        replv: Option<ValueRenderer<'_>>,
    ) -> BTreeMap<String, HostValue> {
        let mut obj = BTreeMap::new();
        for (k, v) in self {
            let key = replk
                .and_then(|replk| replk(k.as_str()))
                .unwrap_or_else(|| k.as_str().to_string());
            obj.insert(key, v.map_repl(replk, replv));
        }
        obj
    }
}

impl From<serde_json::Value> for HostValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_i64().map_or_else(
                || Self::Float(n.as_f64().unwrap_or_default()),
                Self::Int,
            ),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(m) => {
                Self::Map(m.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for HostValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<HostValue>> for HostValue {
    fn from(v: Vec<HostValue>) -> Self {
        Self::Array(v)
    }
}

impl From<BTreeMap<String, HostValue>> for HostValue {
    fn from(v: BTreeMap<String, HostValue>) -> Self {
        Self::Map(v)
    }
}

impl From<PropertyValue> for HostValue {
    fn from(v: PropertyValue) -> Self {
        Self::Property(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::asset::Asset;

    fn host_map(entries: Vec<(&str, HostValue)>) -> BTreeMap<String, HostValue> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_primitive_map_round_trip() {
        let data = host_map(vec![
            ("boolean", HostValue::from(false)),
            ("float", HostValue::from(2.17)),
            ("integer", HostValue::from(-12i64)),
            ("string", HostValue::from("Goodbye")),
            (
                "boolArray",
                HostValue::from(vec![HostValue::from(false), HostValue::from(true)]),
            ),
            (
                "stringMap",
                HostValue::from(host_map(vec![
                    ("two", HostValue::from("turtle doves")),
                    ("three", HostValue::from("french hens")),
                ])),
            ),
        ]);
        let input = host_map(vec![("data", HostValue::from(data))]);

        let props = PropertyMap::from_host_map(input);
        let rendered = props.mappable();

        // Integers widen to floats on the way in; everything else is
        // reproduced exactly.
        let expected_data = host_map(vec![
            ("boolean", HostValue::from(false)),
            ("float", HostValue::from(2.17)),
            ("integer", HostValue::from(-12.0)),
            ("string", HostValue::from("Goodbye")),
            (
                "boolArray",
                HostValue::from(vec![HostValue::from(false), HostValue::from(true)]),
            ),
            (
                "stringMap",
                HostValue::from(host_map(vec![
                    ("two", HostValue::from("turtle doves")),
                    ("three", HostValue::from("french hens")),
                ])),
            ),
        ]);
        let expected = host_map(vec![("data", HostValue::from(expected_data))]);

        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_engine_values_pass_through() {
        let asset = Asset::from_text("content");
        let secret = PropertyValue::make_secret(PropertyValue::from("pw"));

        let input = host_map(vec![
            ("blob", HostValue::from(PropertyValue::Asset(asset.clone()))),
            ("token", HostValue::from(secret.clone())),
        ]);

        let props = PropertyMap::from_host_map(input);
        assert!(props.get("blob").expect("present").is_asset());

        let rendered = props.mappable();
        assert_eq!(
            rendered.get("blob"),
            Some(&HostValue::Property(PropertyValue::Asset(asset)))
        );
        assert_eq!(rendered.get("token"), Some(&HostValue::Property(secret)));
    }

    #[test]
    fn test_replacement_hooks() {
        let input = host_map(vec![
            ("DisplayName", HostValue::from("web")),
            ("replicas", HostValue::from(3i64)),
        ]);

        let replk = |k: &str| {
            (k == "DisplayName").then(|| PropertyKey::from("displayName"))
        };
        let replv = |v: &HostValue| match v {
            HostValue::Int(i) => Some(PropertyValue::make_secret(PropertyValue::from(*i))),
            _ => None,
        };

        let props = PropertyMap::from_host_map_repl(input, Some(&replk), Some(&replv));

        assert!(props.contains_key("displayName"));
        assert!(!props.contains_key("DisplayName"));
        assert!(props.get("replicas").expect("present").is_secret());
    }

    #[test]
    #[should_panic(expected = "duplicate property key")]
    fn test_colliding_replaced_keys_are_rejected() {
        let input = host_map(vec![
            ("name", HostValue::from("a")),
            ("NAME", HostValue::from("b")),
        ]);

        let replk = |k: &str| Some(PropertyKey::from(k.to_lowercase()));
        let _ = PropertyMap::from_host_map_repl(input, Some(&replk), None);
    }

    #[test]
    fn test_from_serializable_uses_field_annotations() {
        #[derive(Serialize)]
        struct Record {
            #[serde(rename = "displayName")]
            display_name: String,
            replicas: i64,
            optional: Option<String>,
        }

        let props = PropertyMap::from_serializable(&Record {
            display_name: String::from("web"),
            replicas: 3,
            optional: None,
        });

        assert_eq!(
            props.get("displayName"),
            Some(&PropertyValue::from("web"))
        );
        assert_eq!(props.get("replicas"), Some(&PropertyValue::from(3i64)));
        assert_eq!(props.get("optional"), Some(&PropertyValue::Null));
    }
}
