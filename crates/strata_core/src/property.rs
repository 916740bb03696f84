//! Pure-data property values, including asset and archive literals.
//!
//! [`PropertyValue`] is the declared shape of resource properties and the
//! decoded shape of engine output bags. It carries no taint and no futures;
//! unknown-ness and secrecy live on the containing
//! [`Output`](crate::output::Output).

use std::collections::BTreeMap;

/// A property value as declared by user code or returned by the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PropertyValue {
    /// Absent value. Also the default every unresolved output field is
    /// forced to during finalization.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Floating-point number; integers are widened on conversion.
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list.
    List(Vec<PropertyValue>),
    /// String-keyed object.
    Object(BTreeMap<String, PropertyValue>),
    /// Asset literal.
    Asset(Asset),
    /// Archive literal.
    Archive(Archive),
}

impl PropertyValue {
    /// Whether this is [`PropertyValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(values: Vec<PropertyValue>) -> Self {
        Self::List(values)
    }
}

impl From<BTreeMap<String, PropertyValue>> for PropertyValue {
    fn from(entries: BTreeMap<String, PropertyValue>) -> Self {
        Self::Object(entries)
    }
}

impl From<Asset> for PropertyValue {
    fn from(asset: Asset) -> Self {
        Self::Asset(asset)
    }
}

impl From<Archive> for PropertyValue {
    fn from(archive: Archive) -> Self {
        Self::Archive(archive)
    }
}

// ─────────────────────
// Assets and archives
// ─────────────────────

/// A single file-like payload referenced by properties.
///
/// Pure data: the runtime never opens the path or fetches the location, it
/// only carries the reference to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    /// Local file path.
    File(String),
    /// Remote location.
    Remote(String),
    /// Inline UTF-8 contents.
    Text(String),
}

/// A bundle of assets referenced by properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Archive {
    /// Local archive file path.
    File(String),
    /// Remote location.
    Remote(String),
    /// Literal map of member name to asset.
    Assets(BTreeMap<String, Asset>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_null() {
        assert!(PropertyValue::default().is_null());
    }

    #[test]
    fn conversions_cover_the_wire_shapes() {
        assert_eq!(PropertyValue::from(true), PropertyValue::Bool(true));
        assert_eq!(PropertyValue::from(3_i64), PropertyValue::Number(3.0));
        assert_eq!(
            PropertyValue::from("ok"),
            PropertyValue::String("ok".to_string())
        );

        let listed = PropertyValue::from(vec![PropertyValue::from(1_i64)]);
        assert_eq!(listed, PropertyValue::List(vec![PropertyValue::Number(1.0)]));
    }

    #[test]
    fn asset_and_archive_literals_are_values() {
        let asset = PropertyValue::from(Asset::File("site/index.html".to_string()));
        assert!(matches!(asset, PropertyValue::Asset(Asset::File(_))));

        let mut members = BTreeMap::new();
        members.insert("index".to_string(), Asset::Text("hello".to_string()));
        let archive = PropertyValue::from(Archive::Assets(members));
        assert!(matches!(archive, PropertyValue::Archive(Archive::Assets(_))));
    }
}
