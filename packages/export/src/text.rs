//! Plain-text report encoder.

use std::fmt::Write as _;

use arcgis_export_convert::FeatureSet;

/// Marker written in place of a missing geometry.
pub const NO_GEOMETRY: &str = "<No Geometry>";

/// Renders a human-readable report of every feature in a layer.
#[must_use]
pub fn encode(set: &FeatureSet) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "Layer: {}\nTotal Features: {}\n{}\n\n",
        set.layer_name,
        set.features.len(),
        "=".repeat(40)
    );

    for (i, feature) in set.features.iter().enumerate() {
        let _ = writeln!(out, "--- Feature {} ---", i + 1);
        out.push_str("Attributes:\n");
        for (key, value) in &feature.attributes {
            let _ = writeln!(out, "  {key}: {value}");
        }
        out.push_str("Geometry (WKT):\n");
        match &feature.geometry {
            Some(geometry) => {
                let _ = writeln!(out, "  {}", geometry.to_wkt());
            }
            None => {
                let _ = writeln!(out, "  {NO_GEOMETRY}");
            }
        }
        out.push('\n');
    }

    out
}
