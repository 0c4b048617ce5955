//! Property keys and maps.
//!
//! A [`PropertyMap`] maps unique string keys to property values. It is
//! backed by an ordered map so that every observable iteration happens in
//! sorted key order.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use super::value::{Property, PropertyValue};
use crate::error::PropertyError;

/// Prefix marking a property key as internal; internal properties are never
/// shown to users.
pub const INTERNAL_KEY_PREFIX: &str = "__";

/// The name of a property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PropertyKey(String);

impl PropertyKey {
    /// Creates a new property key.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this key is internal and should not be displayed to
    /// users.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.0.starts_with(INTERNAL_KEY_PREFIX)
    }
}

impl Borrow<str> for PropertyKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A map keyed by property name with property values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap(BTreeMap<PropertyKey, PropertyValue>);

impl PropertyMap {
    /// Creates an empty property map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the number of properties in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets the value for a key, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    /// Returns true if the key is present, regardless of its value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts a property, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<PropertyKey>, value: PropertyValue) {
        self.0.insert(key.into(), value);
    }

    /// Removes a property, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.0.remove(key)
    }

    /// Iterates the properties in sorted key order.
    pub fn iter(&self) -> btree_map::Iter<'_, PropertyKey, PropertyValue> {
        self.0.iter()
    }

    /// Returns the map's keys in a stable, sorted order.
    #[must_use]
    pub fn stable_keys(&self) -> Vec<&PropertyKey> {
        self.0.keys().collect()
    }

    /// Returns the map's entries as key/value pairs in stable order.
    #[must_use]
    pub fn properties(&self) -> Vec<Property> {
        self.0
            .iter()
            .map(|(key, value)| Property {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Returns true if the slot for the key contains a real value: present,
    /// non-null, and not an output still awaiting resolution.
    #[must_use]
    pub fn has_value(&self, key: &str) -> bool {
        self.get(key).is_some_and(PropertyValue::has_value)
    }

    /// Gets the value for a key, or a required-property error naming the
    /// missing key.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::RequiredPropertyMissing`] if the key is
    /// absent.
    pub fn require(&self, key: &str) -> Result<&PropertyValue, PropertyError> {
        self.get(key)
            .ok_or_else(|| PropertyError::required(PropertyKey::from(key)))
    }

    /// Returns true if any value in the map contains an unknown, deeply.
    #[must_use]
    pub fn contains_unknowns(&self) -> bool {
        self.0.values().any(PropertyValue::contains_unknowns)
    }

    /// Returns true if any value in the map contains a secret, deeply.
    #[must_use]
    pub fn contains_secrets(&self) -> bool {
        self.0.values().any(PropertyValue::contains_secrets)
    }

    /// Makes a shallow copy of the map.
    ///
    /// Values are cloned; a secret value's shared cell is not duplicated,
    /// so copies keep the original's secret identity.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

impl FromIterator<(PropertyKey, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (PropertyKey, PropertyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = (&'a PropertyKey, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, PropertyKey, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for PropertyMap {
    type Item = (PropertyKey, PropertyValue);
    type IntoIter = btree_map::IntoIter<PropertyKey, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Output;

    #[test]
    fn test_stable_iteration_order() {
        let mut map = PropertyMap::new();
        map.insert("zebra", PropertyValue::from(1i64));
        map.insert("apple", PropertyValue::from(2i64));
        map.insert("mango", PropertyValue::from(3i64));

        let first: Vec<String> = map.stable_keys().iter().map(|k| k.to_string()).collect();
        let second: Vec<String> = map.stable_keys().iter().map(|k| k.to_string()).collect();

        assert_eq!(first, vec!["apple", "mango", "zebra"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_properties_are_ordered_pairs() {
        let mut map = PropertyMap::new();
        map.insert("replicas", PropertyValue::from(3i64));
        map.insert(
            "token",
            PropertyValue::make_secret(PropertyValue::from("t0ps3cret")),
        );
        map.insert("image", PropertyValue::from("web:latest"));

        let pairs = map.properties();
        let keys: Vec<&str> = pairs.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["image", "replicas", "token"]);
        assert_eq!(pairs[1].value, PropertyValue::from(3i64));

        // Pairs carry the same secret cell as the map, not a duplicate.
        assert!(pairs[2].value.is_same_secret(map.get("token").expect("present")));
    }

    #[test]
    fn test_has_value_semantics() {
        let mut map = PropertyMap::new();
        map.insert("present", PropertyValue::from("yes"));
        map.insert("nothing", PropertyValue::Null);
        map.insert(
            "pending",
            PropertyValue::from(Output::new(PropertyValue::String(String::new()))),
        );
        map.insert(
            "resolved",
            PropertyValue::from(Output::new(PropertyValue::from(1i64)).with_known(true)),
        );

        assert!(map.has_value("present"));
        assert!(!map.has_value("nothing"));
        assert!(!map.has_value("pending"));
        assert!(map.has_value("resolved"));
        assert!(!map.has_value("absent"));
    }

    #[test]
    fn test_require_reports_missing_key() {
        let map = PropertyMap::new();
        let err = map.require("endpoint").expect_err("key is absent");

        assert!(matches!(
            err,
            PropertyError::RequiredPropertyMissing { ref key } if key.as_str() == "endpoint"
        ));
    }

    #[test]
    fn test_internal_keys() {
        assert!(PropertyKey::from("__provider").is_internal());
        assert!(!PropertyKey::from("provider").is_internal());
    }

    #[test]
    fn test_copy_preserves_secret_identity() {
        let mut map = PropertyMap::new();
        map.insert(
            "token",
            PropertyValue::make_secret(PropertyValue::from("t0ps3cret")),
        );

        let copy1 = map.copy();
        let copy2 = map.copy();

        let a = copy1.get("token").expect("present");
        let b = copy2.get("token").expect("present");
        assert!(a.is_same_secret(b));
    }

    #[test]
    fn test_deep_predicates_reach_nested_values() {
        let mut inner = PropertyMap::new();
        inner.insert(
            "password",
            PropertyValue::make_secret(PropertyValue::from("pw")),
        );

        let mut map = PropertyMap::new();
        map.insert("config", PropertyValue::Object(inner));

        assert!(map.contains_secrets());
        assert!(!map.contains_unknowns());
    }
}
