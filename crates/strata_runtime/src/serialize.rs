//! Wire encoding of property bags and decoding of engine responses.
//!
//! Property values cross the monitor channel as JSON with three special
//! shapes layered on top: a sentinel string for values the engine has not
//! determined yet, and sigil-keyed wrapper objects for secrets, assets,
//! and archives. Both directions live here so the two halves cannot
//! drift apart.

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use strata_core::input::PropertyMap;
use strata_core::output::{OutputData, OutputError};
use strata_core::property::{Archive, Asset, PropertyValue};
use strata_core::resource::{DependencySet, Resource, ResourceRef};
use thiserror::Error;

/// Marker key identifying wrapper objects in wire bags.
pub const SIG_KEY: &str = "4c8f2b915e3a7d06";
/// Sigil marking a secret-wrapped value.
pub const SECRET_SIG: &str = "d0e7b1a24c6f3859";
/// Sigil marking a literal asset.
pub const ASSET_SIG: &str = "a17c4e90f2b8d635";
/// Sigil marking a literal archive.
pub const ARCHIVE_SIG: &str = "e5902dc1b7a4f386";
/// Sentinel standing in for values the engine has not determined yet.
pub const UNKNOWN_VALUE: &str = "f96b1c52-8e04-47a9-b3d7-20c6e5a1d84f";

// ─────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────

/// Values the wire format cannot carry, in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    /// Wire numbers must be finite.
    #[error("property '{0}' contains a non-finite number")]
    NonFiniteNumber(String),

    /// A wrapper object arrived with a sigil this runtime does not know.
    #[error("property '{property}' carries unrecognized sigil {sigil:?}")]
    UnknownSigil {
        /// Property the wrapper arrived under.
        property: String,
        /// The unrecognized sigil value.
        sigil: String,
    },

    /// A wrapper object arrived without its expected payload.
    #[error("property '{0}' is a malformed wrapper object")]
    MalformedWrapper(String),

    /// Awaiting a property failed because its producer failed.
    #[error("property '{property}' failed to resolve: {cause}")]
    Source {
        /// Property whose value could not be awaited.
        property: String,
        /// The underlying failure.
        #[source]
        cause: OutputError,
    },
}

// ─────────────────────────────────────────────────────────────────────────
// Request side
// ─────────────────────────────────────────────────────────────────────────

/// A property bag prepared for one registration request.
#[derive(Debug, Default)]
pub struct SerializedProperties {
    /// Encoded bag, ready for the request.
    pub object: Map<String, Value>,
    /// Direct, unexpanded dependencies per property.
    pub property_dependencies: BTreeMap<String, Vec<Resource>>,
}

/// Awaits and encodes every property of a declaration, collecting each
/// property's direct dependencies along the way.
///
/// # Errors
///
/// Fails when a property's producing registration failed or its value
/// cannot be represented on the wire.
pub async fn serialize_properties(
    properties: PropertyMap,
) -> Result<SerializedProperties, SerializeError> {
    let mut serialized = SerializedProperties::default();
    for (name, input) in properties {
        let data = input.into_output().data().await.map_err(|cause| {
            SerializeError::Source { property: name.clone(), cause }
        })?;
        let direct = data
            .resources
            .iter()
            .filter_map(ResourceRef::upgrade)
            .collect();
        serialized.object.insert(name.clone(), encode_output(&name, &data)?);
        serialized.property_dependencies.insert(name, direct);
    }
    Ok(serialized)
}

/// Encodes one resolved property for a request bag.
///
/// Unknown values collapse to the sentinel regardless of their payload;
/// secret values wrap last so the marker is outermost.
///
/// # Errors
///
/// Fails when the value contains a non-finite number.
pub fn encode_output(
    property: &str,
    data: &OutputData<PropertyValue>,
) -> Result<Value, SerializeError> {
    if !data.known {
        return Ok(Value::String(UNKNOWN_VALUE.to_string()));
    }
    let encoded = encode_value(property, &data.value)?;
    if data.secret {
        let mut wrapper = sig_object(SECRET_SIG);
        wrapper.insert("value".to_string(), encoded);
        Ok(Value::Object(wrapper))
    } else {
        Ok(encoded)
    }
}

fn sig_object(sigil: &str) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert(SIG_KEY.to_string(), Value::String(sigil.to_string()));
    object
}

fn encode_value(property: &str, value: &PropertyValue) -> Result<Value, SerializeError> {
    match value {
        PropertyValue::Null => Ok(Value::Null),
        PropertyValue::Bool(flag) => Ok(Value::Bool(*flag)),
        PropertyValue::Number(number) => Number::from_f64(*number)
            .map(Value::Number)
            .ok_or_else(|| SerializeError::NonFiniteNumber(property.to_string())),
        PropertyValue::String(text) => Ok(Value::String(text.clone())),
        PropertyValue::List(items) => items
            .iter()
            .map(|item| encode_value(property, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        PropertyValue::Object(entries) => {
            let mut object = Map::new();
            for (key, entry) in entries {
                object.insert(key.clone(), encode_value(property, entry)?);
            }
            Ok(Value::Object(object))
        }
        PropertyValue::Asset(asset) => Ok(encode_asset(asset)),
        PropertyValue::Archive(archive) => Ok(encode_archive(archive)),
    }
}

fn encode_asset(asset: &Asset) -> Value {
    let mut object = sig_object(ASSET_SIG);
    let (key, payload) = match asset {
        Asset::File(path) => ("path", path),
        Asset::Remote(uri) => ("uri", uri),
        Asset::Text(text) => ("text", text),
    };
    object.insert(key.to_string(), Value::String(payload.clone()));
    Value::Object(object)
}

fn encode_archive(archive: &Archive) -> Value {
    let mut object = sig_object(ARCHIVE_SIG);
    match archive {
        Archive::File(path) => {
            object.insert("path".to_string(), Value::String(path.clone()));
        }
        Archive::Remote(uri) => {
            object.insert("uri".to_string(), Value::String(uri.clone()));
        }
        Archive::Assets(members) => {
            let mut assets = Map::new();
            for (name, member) in members {
                assets.insert(name.clone(), encode_asset(member));
            }
            object.insert("assets".to_string(), Value::Object(assets));
        }
    }
    Value::Object(object)
}

// ─────────────────────────────────────────────────────────────────────────
// Response side
// ─────────────────────────────────────────────────────────────────────────

/// Decodes one engine output value into resolved output data.
///
/// Secret wrappers anywhere in the value mark the whole output secret.
/// Nulls and the unknown sentinel settle as defaults that are known
/// exactly when the run is not a preview.
///
/// # Errors
///
/// Fails on malformed or unrecognized wrapper objects.
pub fn decode_output(
    property: &str,
    value: &Value,
    dry_run: bool,
) -> Result<OutputData<PropertyValue>, SerializeError> {
    let mut secret = false;
    let value = unwrap_secret(property, value, &mut secret)?;
    if value.is_null() || value.as_str() == Some(UNKNOWN_VALUE) {
        return Ok(OutputData::new(
            DependencySet::new(),
            PropertyValue::Null,
            !dry_run,
            secret,
        ));
    }
    let decoded = decode_value(property, value, &mut secret)?;
    Ok(OutputData::new(DependencySet::new(), decoded, true, secret))
}

fn unwrap_secret<'a>(
    property: &str,
    mut value: &'a Value,
    secret: &mut bool,
) -> Result<&'a Value, SerializeError> {
    while let Some(object) = value.as_object() {
        if object.get(SIG_KEY).and_then(Value::as_str) != Some(SECRET_SIG) {
            break;
        }
        *secret = true;
        value = object
            .get("value")
            .ok_or_else(|| SerializeError::MalformedWrapper(property.to_string()))?;
    }
    Ok(value)
}

fn decode_value(
    property: &str,
    value: &Value,
    secret: &mut bool,
) -> Result<PropertyValue, SerializeError> {
    let value = unwrap_secret(property, value, secret)?;
    match value {
        Value::Null => Ok(PropertyValue::Null),
        Value::Bool(flag) => Ok(PropertyValue::Bool(*flag)),
        Value::Number(number) => number
            .as_f64()
            .map(PropertyValue::Number)
            .ok_or_else(|| SerializeError::NonFiniteNumber(property.to_string())),
        Value::String(text) => Ok(PropertyValue::String(text.clone())),
        Value::Array(items) => items
            .iter()
            .map(|item| decode_value(property, item, secret))
            .collect::<Result<Vec<_>, _>>()
            .map(PropertyValue::List),
        Value::Object(object) => match object.get(SIG_KEY).and_then(Value::as_str) {
            Some(ASSET_SIG) => decode_asset(property, object).map(PropertyValue::Asset),
            Some(ARCHIVE_SIG) => decode_archive(property, object, secret),
            Some(other) => Err(SerializeError::UnknownSigil {
                property: property.to_string(),
                sigil: other.to_string(),
            }),
            None => {
                let mut entries = BTreeMap::new();
                for (key, entry) in object {
                    entries.insert(key.clone(), decode_value(property, entry, secret)?);
                }
                Ok(PropertyValue::Object(entries))
            }
        },
    }
}

fn decode_asset(
    property: &str,
    object: &Map<String, Value>,
) -> Result<Asset, SerializeError> {
    let field = |key: &str| object.get(key).and_then(Value::as_str);
    if let Some(path) = field("path") {
        Ok(Asset::File(path.to_string()))
    } else if let Some(uri) = field("uri") {
        Ok(Asset::Remote(uri.to_string()))
    } else if let Some(text) = field("text") {
        Ok(Asset::Text(text.to_string()))
    } else {
        Err(SerializeError::MalformedWrapper(property.to_string()))
    }
}

fn decode_archive(
    property: &str,
    object: &Map<String, Value>,
    secret: &mut bool,
) -> Result<PropertyValue, SerializeError> {
    if let Some(path) = object.get("path").and_then(Value::as_str) {
        return Ok(PropertyValue::Archive(Archive::File(path.to_string())));
    }
    if let Some(uri) = object.get("uri").and_then(Value::as_str) {
        return Ok(PropertyValue::Archive(Archive::Remote(uri.to_string())));
    }
    let Some(Value::Object(raw)) = object.get("assets") else {
        return Err(SerializeError::MalformedWrapper(property.to_string()));
    };
    let mut members = BTreeMap::new();
    for (name, member) in raw {
        let member = unwrap_secret(property, member, secret)?;
        let Some(member) = member.as_object() else {
            return Err(SerializeError::MalformedWrapper(property.to_string()));
        };
        members.insert(name.clone(), decode_asset(property, member)?);
    }
    Ok(PropertyValue::Archive(Archive::Assets(members)))
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────
