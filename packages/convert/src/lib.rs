#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Conversion of raw `ArcGIS` features into a canonical, typed form.
//!
//! A [`Feature`] owns its attributes as [`AttributeValue`]s, keeps the
//! source Esri JSON geometry (for the tabular JSON export), and carries
//! the translated [`CanonicalGeometry`] used by every spatial encoder.

pub mod geometry;
pub mod symbol;
pub mod value;

use std::collections::BTreeMap;

use arcgis_export_arcgis_models::{RawFeature, Symbol};

pub use geometry::{CanonicalGeometry, Coord, to_canonical, to_wkt};
pub use symbol::{Renderer, SymbolClass, SymbolResolver, attach_symbols};
pub use value::AttributeValue;

/// Attribute key under which a resolved symbol is attached.
pub const SYMBOL_KEY: &str = "symbol";

/// A feature ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Attributes keyed by field name, sorted.
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Esri JSON geometry as received.
    pub source_geometry: Option<serde_json::Value>,
    /// Translated geometry, `None` when absent or malformed.
    pub geometry: Option<CanonicalGeometry>,
}

impl Feature {
    /// Converts a raw query record, translating its geometry.
    #[must_use]
    pub fn from_raw(raw: RawFeature) -> Self {
        let geometry = raw.geometry.as_ref().and_then(to_canonical);
        Self {
            attributes: raw
                .attributes
                .into_iter()
                .map(|(key, value)| (key, AttributeValue::from_json(value)))
                .collect(),
            source_geometry: raw.geometry,
            geometry,
        }
    }

    /// The attached symbol, if any.
    #[must_use]
    pub fn symbol(&self) -> Option<&Symbol> {
        match self.attributes.get(SYMBOL_KEY) {
            Some(AttributeValue::Symbol(symbol)) => Some(symbol.as_ref()),
            _ => None,
        }
    }

    /// Attaches a symbol under [`SYMBOL_KEY`], replacing any attribute of
    /// that name.
    pub fn set_symbol(&mut self, symbol: Symbol) {
        self.attributes
            .insert(SYMBOL_KEY.to_string(), AttributeValue::Symbol(Box::new(symbol)));
    }

    /// Attributes other than the attached symbol.
    pub fn properties(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes
            .iter()
            .filter(|(_, value)| !matches!(value, AttributeValue::Symbol(_)))
    }

    /// WKT of the translated geometry, or `""`.
    #[must_use]
    pub fn wkt(&self) -> String {
        self.geometry
            .as_ref()
            .map(CanonicalGeometry::to_wkt)
            .unwrap_or_default()
    }
}

/// All features of one layer, plus the name used in document headers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSet {
    /// Resolved layer name.
    pub layer_name: String,
    /// Features in query order.
    pub features: Vec<Feature>,
}

impl FeatureSet {
    /// Converts raw query records.
    #[must_use]
    pub fn from_raw(layer_name: impl Into<String>, features: Vec<RawFeature>) -> Self {
        Self {
            layer_name: layer_name.into(),
            features: features.into_iter().map(Feature::from_raw).collect(),
        }
    }

    /// Features that have a translated geometry.
    pub fn with_geometry(&self) -> impl Iterator<Item = (&Feature, &CanonicalGeometry)> {
        self.features
            .iter()
            .filter_map(|feature| feature.geometry.as_ref().map(|g| (feature, g)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawFeature {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn translates_geometry_and_keeps_source() {
        let feature = Feature::from_raw(raw(json!({
            "attributes": {"NAME": "Hydrant", "ID": 4},
            "geometry": {"x": -122.0, "y": 37.0}
        })));

        assert_eq!(
            feature.geometry,
            Some(CanonicalGeometry::Point(Coord::new(-122.0, 37.0)))
        );
        assert_eq!(feature.source_geometry, Some(json!({"x": -122.0, "y": 37.0})));
        assert_eq!(feature.wkt(), "POINT (-122.0000000000 37.0000000000)");
        let keys: Vec<&str> = feature.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, ["ID", "NAME"]);
    }

    #[test]
    fn attribute_only_records_survive() {
        let set = FeatureSet::from_raw(
            "Owners",
            vec![
                raw(json!({"attributes": {"OWNER": "A"}})),
                raw(json!({"attributes": {"OWNER": "B"}, "geometry": {"x": 1, "y": 2}})),
            ],
        );

        assert_eq!(set.features.len(), 2);
        assert_eq!(set.features[0].wkt(), "");
        assert_eq!(set.with_geometry().count(), 1);
    }

    #[test]
    fn symbol_is_excluded_from_properties() {
        let mut feature = Feature::from_raw(raw(json!({"attributes": {"A": 1}})));
        feature.set_symbol(Symbol {
            kind: "esriSMS".to_string(),
            ..Symbol::default()
        });

        assert_eq!(feature.symbol().map(|s| s.kind.as_str()), Some("esriSMS"));
        let names: Vec<&str> = feature.properties().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["A"]);
    }
}
