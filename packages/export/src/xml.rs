//! Text helpers shared by the KML and GPX encoders.

use arcgis_export_convert::{AttributeValue, Feature, geometry::format_ordinate};

/// Attribute names tried, in order, for a placemark or waypoint name.
const NAME_FIELDS: [&str; 8] = [
    "name", "Name", "NAME", "title", "Title", "TITLE", "OBJECTID", "FID",
];

/// Fallback display name.
pub const DEFAULT_FEATURE_NAME: &str = "Feature";

/// Escapes `& < > " ' /` for XML text and attribute content.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '/' => out.push_str("&#x2F;"),
            other => out.push(other),
        }
    }
    out
}

/// The first non-null well-known name attribute, or `"Feature"`.
pub fn feature_name(feature: &Feature) -> String {
    NAME_FIELDS
        .iter()
        .filter_map(|key| feature.attributes.get(*key))
        .find(|value| !value.is_null())
        .map_or_else(|| DEFAULT_FEATURE_NAME.to_string(), AttributeValue::to_string)
}

/// `x,y,0` with ten decimals.
pub fn kml_coordinate(x: f64, y: f64) -> String {
    format!("{},{},0", format_ordinate(x), format_ordinate(y))
}
