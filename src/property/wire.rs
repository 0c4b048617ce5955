//! Wire encoding of property values.
//!
//! Property maps cross the monitor RPC boundary and the snapshot as plain
//! JSON. Flattening into JSON would lose the type identity of secrets,
//! outputs, resource references, assets, and archives, so those encode as
//! objects carrying a well-known signature key whose value names the
//! original type. Decoding recognizes the signatures and reconstructs the
//! engine-native values.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

use super::asset::{Archive, ArchiveSource, Asset, AssetSource};
use super::map::PropertyMap;
use super::value::{Output, PropertyValue, ResourceReference};
use crate::error::PropertyError;
use crate::resource::Urn;

/// The key used to encode type identity inside a flattened map.
pub const SIG_KEY: &str = "4dabf18193072939515e22adb298388d";

/// The unique signature of an encoded secret.
pub const SECRET_SIG: &str = "1b47061264138c4ac30d75fd1eb44270";

/// The unique signature of an encoded resource reference.
pub const RESOURCE_REFERENCE_SIG: &str = "5cf8f73096256a8f31e491e813e4eb8e";

/// The unique signature of an encoded output value.
pub const OUTPUT_VALUE_SIG: &str = "d0e6a833031e9bbcd3f4e8bde6ca49a4";

/// The unique signature of an encoded asset.
pub const ASSET_SIG: &str = "c44067f5952c0a294b673a41bacd8c17";

/// The unique signature of an encoded archive.
pub const ARCHIVE_SIG: &str = "0def7320c3a5731c473e5ecbe6d01bc7";

/// Checks whether a property map carries the given signature match under
/// the signature key.
#[must_use]
pub fn has_sig(obj: &PropertyMap, signature: &str) -> bool {
    obj.get(SIG_KEY)
        .is_some_and(|v| v.is_string() && v.string_value() == signature)
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_wire(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        from_wire(value).map_err(D::Error::custom)
    }
}

impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::Object(map_to_wire(self)).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Object(obj) => map_from_wire(obj).map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected a JSON object for a property map, found {other}"
            ))),
        }
    }
}

/// Encodes a value as wire JSON.
fn to_wire(v: &PropertyValue) -> Value {
    match v {
        PropertyValue::Null => Value::Null,
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::Number(n) => {
            serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number)
        }
        PropertyValue::String(s) => Value::String(s.clone()),
        PropertyValue::Array(items) => Value::Array(items.iter().map(to_wire).collect()),
        PropertyValue::Object(map) => Value::Object(map_to_wire(map)),
        PropertyValue::Asset(asset) => Value::Object(asset_to_wire(asset)),
        PropertyValue::Archive(archive) => Value::Object(archive_to_wire(archive)),
        // A computed placeholder has no wire form of its own; it encodes as
        // an unknown output value. The element's type exemplar is not
        // preserved across the boundary.
        PropertyValue::Computed(_) => json!({ SIG_KEY: OUTPUT_VALUE_SIG }),
        PropertyValue::Output(o) => {
            let mut obj = Map::new();
            obj.insert(SIG_KEY.to_string(), Value::String(OUTPUT_VALUE_SIG.into()));
            if o.known {
                obj.insert(String::from("value"), to_wire(&o.element));
            }
            if o.secret {
                obj.insert(String::from("secret"), Value::Bool(true));
            }
            if !o.dependencies.is_empty() {
                obj.insert(
                    String::from("dependencies"),
                    Value::Array(
                        o.dependencies
                            .iter()
                            .map(|urn| Value::String(urn.to_string()))
                            .collect(),
                    ),
                );
            }
            Value::Object(obj)
        }
        PropertyValue::Secret(s) => json!({
            SIG_KEY: SECRET_SIG,
            "value": to_wire(&s.element),
        }),
        PropertyValue::ResourceReference(r) => {
            let mut obj = Map::new();
            obj.insert(
                SIG_KEY.to_string(),
                Value::String(RESOURCE_REFERENCE_SIG.into()),
            );
            obj.insert(String::from("urn"), Value::String(r.urn.to_string()));
            match &r.id {
                PropertyValue::Null => {}
                PropertyValue::String(id) => {
                    obj.insert(String::from("id"), Value::String(id.clone()));
                }
                // An unassigned ID is marked with a nested unknown output.
                _ => {
                    obj.insert(String::from("id"), json!({ SIG_KEY: OUTPUT_VALUE_SIG }));
                }
            }
            if !r.package_version.is_empty() {
                obj.insert(
                    String::from("packageVersion"),
                    Value::String(r.package_version.clone()),
                );
            }
            Value::Object(obj)
        }
    }
}

/// Encodes a property map as a wire JSON object.
fn map_to_wire(map: &PropertyMap) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.as_str().to_string(), to_wire(v)))
        .collect()
}

fn asset_to_wire(asset: &Asset) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert(SIG_KEY.to_string(), Value::String(ASSET_SIG.into()));
    if let Some(hash) = asset.hash() {
        obj.insert(String::from("hash"), Value::String(hash.to_string()));
    }
    match asset.source() {
        AssetSource::Text(t) => obj.insert(String::from("text"), Value::String(t.clone())),
        AssetSource::Path(p) => obj.insert(String::from("path"), Value::String(p.clone())),
        AssetSource::Uri(u) => obj.insert(String::from("uri"), Value::String(u.clone())),
    };
    obj
}

fn archive_to_wire(archive: &Archive) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert(SIG_KEY.to_string(), Value::String(ARCHIVE_SIG.into()));
    if let Some(hash) = archive.hash() {
        obj.insert(String::from("hash"), Value::String(hash.to_string()));
    }
    match archive.source() {
        ArchiveSource::Assets(members) => {
            let assets: Map<String, Value> = members
                .iter()
                .map(|(name, asset)| (name.clone(), Value::Object(asset_to_wire(asset))))
                .collect();
            obj.insert(String::from("assets"), Value::Object(assets))
        }
        ArchiveSource::Path(p) => obj.insert(String::from("path"), Value::String(p.clone())),
        ArchiveSource::Uri(u) => obj.insert(String::from("uri"), Value::String(u.clone())),
    };
    obj
}

/// Decodes wire JSON into a property value.
fn from_wire(value: Value) -> Result<PropertyValue, PropertyError> {
    match value {
        Value::Null => Ok(PropertyValue::Null),
        Value::Bool(b) => Ok(PropertyValue::Bool(b)),
        Value::Number(n) => Ok(PropertyValue::Number(n.as_f64().unwrap_or_default())),
        Value::String(s) => Ok(PropertyValue::String(s)),
        Value::Array(items) => Ok(PropertyValue::Array(
            items
                .into_iter()
                .map(from_wire)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Value::Object(obj) => from_wire_object(obj),
    }
}

fn from_wire_object(obj: Map<String, Value>) -> Result<PropertyValue, PropertyError> {
    let signature = match obj.get(SIG_KEY) {
        None => {
            return Ok(PropertyValue::Object(map_from_wire(obj)?));
        }
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(PropertyError::InvalidWireValue {
                message: format!("signature key must hold a string, found {other}"),
            });
        }
    };

    match signature.as_str() {
        SECRET_SIG => {
            let value = obj.get("value").cloned().ok_or_else(|| {
                PropertyError::InvalidWireValue {
                    message: String::from("secret is missing its value"),
                }
            })?;
            Ok(PropertyValue::make_secret(from_wire(value)?))
        }
        OUTPUT_VALUE_SIG => {
            let (element, known) = match obj.get("value") {
                Some(v) => (from_wire(v.clone())?, true),
                None => (PropertyValue::Null, false),
            };
            let secret = obj.get("secret").and_then(Value::as_bool).unwrap_or(false);
            let dependencies = match obj.get("dependencies") {
                Some(Value::Array(deps)) => deps
                    .iter()
                    .map(|d| {
                        let s = d.as_str().ok_or_else(|| PropertyError::InvalidWireValue {
                            message: format!("output dependency must be a string, found {d}"),
                        })?;
                        Urn::parse(s).map_err(|e| PropertyError::InvalidWireValue {
                            message: format!("output dependency is not a URN: {e}"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            Ok(PropertyValue::from(
                Output::new(element)
                    .with_known(known)
                    .with_secret(secret)
                    .with_dependencies(dependencies),
            ))
        }
        RESOURCE_REFERENCE_SIG => {
            let urn = obj
                .get("urn")
                .and_then(Value::as_str)
                .ok_or_else(|| PropertyError::InvalidWireValue {
                    message: String::from("resource reference is missing its URN"),
                })?;
            let urn = Urn::parse(urn).map_err(|e| PropertyError::InvalidWireValue {
                message: format!("resource reference URN is malformed: {e}"),
            })?;

            let id = match obj.get("id") {
                None => PropertyValue::Null,
                Some(Value::String(id)) => PropertyValue::String(id.clone()),
                Some(Value::Object(id_obj))
                    if id_obj.get(SIG_KEY).and_then(Value::as_str) == Some(OUTPUT_VALUE_SIG)
                        && !id_obj.contains_key("value") =>
                {
                    PropertyValue::make_computed(PropertyValue::String(String::new()))
                }
                Some(other) => {
                    return Err(PropertyError::InvalidWireValue {
                        message: format!("resource reference ID must be a string or unknown, found {other}"),
                    });
                }
            };

            let package_version = obj
                .get("packageVersion")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();

            Ok(PropertyValue::from(ResourceReference {
                urn,
                id,
                package_version,
            }))
        }
        ASSET_SIG => Ok(PropertyValue::Asset(asset_from_wire(&obj)?)),
        ARCHIVE_SIG => Ok(PropertyValue::Archive(archive_from_wire(&obj)?)),
        other => Err(PropertyError::UnrecognizedSignature {
            signature: other.to_string(),
        }),
    }
}

/// Decodes a wire JSON object into a property map.
fn map_from_wire(obj: Map<String, Value>) -> Result<PropertyMap, PropertyError> {
    let mut map = PropertyMap::new();
    for (k, v) in obj {
        map.insert(k, from_wire(v)?);
    }
    Ok(map)
}

fn asset_from_wire(obj: &Map<String, Value>) -> Result<Asset, PropertyError> {
    let hash = obj
        .get("hash")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let source = if let Some(text) = obj.get("text").and_then(Value::as_str) {
        AssetSource::Text(text.to_string())
    } else if let Some(path) = obj.get("path").and_then(Value::as_str) {
        AssetSource::Path(path.to_string())
    } else if let Some(uri) = obj.get("uri").and_then(Value::as_str) {
        AssetSource::Uri(uri.to_string())
    } else {
        return Err(PropertyError::InvalidWireValue {
            message: String::from("asset carries none of text, path, or uri"),
        });
    };
    Ok(Asset { hash, source })
}

fn archive_from_wire(obj: &Map<String, Value>) -> Result<Archive, PropertyError> {
    let hash = obj
        .get("hash")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let source = if let Some(Value::Object(members)) = obj.get("assets") {
        let mut assets = std::collections::BTreeMap::new();
        for (name, member) in members {
            let Value::Object(member_obj) = member else {
                return Err(PropertyError::InvalidWireValue {
                    message: format!("archive member '{name}' is not an asset object"),
                });
            };
            if member_obj.get(SIG_KEY).and_then(Value::as_str) != Some(ASSET_SIG) {
                return Err(PropertyError::InvalidWireValue {
                    message: format!("archive member '{name}' does not carry the asset signature"),
                });
            }
            assets.insert(name.clone(), asset_from_wire(member_obj)?);
        }
        ArchiveSource::Assets(assets)
    } else if let Some(path) = obj.get("path").and_then(Value::as_str) {
        ArchiveSource::Path(path.to_string())
    } else if let Some(uri) = obj.get("uri").and_then(Value::as_str) {
        ArchiveSource::Uri(uri.to_string())
    } else {
        return Err(PropertyError::InvalidWireValue {
            message: String::from("archive carries none of assets, path, or uri"),
        });
    };
    Ok(Archive { hash, source })
}
