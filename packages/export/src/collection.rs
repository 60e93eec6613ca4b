//! `GeoJSON` `FeatureCollection` encoder.

use arcgis_export_convert::{CanonicalGeometry, Coord, Feature, FeatureSet};
use geojson::{FeatureCollection, Geometry, JsonObject, Value};

use crate::ExportError;

/// URN of the WGS84 longitude/latitude reference system.
pub const CRS84_URN: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";

fn position(coord: Coord) -> Vec<f64> {
    vec![coord.x, coord.y]
}

/// Converts a canonical geometry into a `GeoJSON` geometry value.
#[must_use]
pub fn to_geojson(geometry: &CanonicalGeometry) -> Value {
    match geometry {
        CanonicalGeometry::Point(coord) => Value::Point(position(*coord)),
        CanonicalGeometry::LineString(coords) => {
            Value::LineString(coords.iter().copied().map(position).collect())
        }
        CanonicalGeometry::Polygon(rings) => Value::Polygon(
            rings
                .iter()
                .map(|ring| ring.iter().copied().map(position).collect())
                .collect(),
        ),
    }
}

fn properties(feature: &Feature) -> JsonObject {
    feature
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

fn crs_member() -> JsonObject {
    let mut members = JsonObject::new();
    members.insert(
        "crs".to_string(),
        serde_json::json!({
            "type": "name",
            "properties": {"name": CRS84_URN}
        }),
    );
    members
}

/// Builds the collection for a layer. Features without a geometry are
/// left out; an attached symbol stays in the properties.
#[must_use]
pub fn to_collection(set: &FeatureSet) -> FeatureCollection {
    let features = set
        .with_geometry()
        .map(|(feature, geometry)| geojson::Feature {
            bbox: None,
            geometry: Some(Geometry::new(to_geojson(geometry))),
            id: None,
            properties: Some(properties(feature)),
            foreign_members: None,
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(crs_member()),
    }
}

/// Encodes a layer as pretty-printed `GeoJSON`.
///
/// # Errors
///
/// * If serialization fails
pub fn encode(set: &FeatureSet) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(&to_collection(set))?)
}
