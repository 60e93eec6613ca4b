//! GPX 1.1 encoder.
//!
//! Points become waypoints. Lines become single-segment tracks, and
//! polygons become a `(Boundary)` track over the outer ring. Waypoints are
//! written before tracks, as GPX requires.

use std::fmt::Write as _;

use arcgis_export_convert::{CanonicalGeometry, Coord, Feature, FeatureSet, geometry::format_ordinate};

use crate::xml::{escape, feature_name};

const CREATOR: &str = "arcgis_export";

/// Properties as `key: value`, joined by `, `.
fn description(feature: &Feature) -> String {
    feature
        .properties()
        .map(|(key, value)| format!("{key}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn track(out: &mut String, name: &str, desc: &str, points: &[Coord]) {
    let _ = write!(
        out,
        "\n    <trk>\n        <name>{}</name>\n        <desc>{}</desc>\n        <trkseg>",
        escape(name),
        escape(desc)
    );
    for point in points {
        let _ = write!(
            out,
            "<trkpt lat=\"{}\" lon=\"{}\"></trkpt>",
            format_ordinate(point.y),
            format_ordinate(point.x)
        );
    }
    out.push_str("\n        </trkseg>\n    </trk>");
}

/// Encodes a layer as a GPX document.
#[must_use]
pub fn encode(set: &FeatureSet) -> String {
    let mut waypoints = String::new();
    let mut tracks = String::new();

    for (feature, geometry) in set.with_geometry() {
        let name = feature_name(feature);
        let desc = description(feature);

        match geometry {
            CanonicalGeometry::Point(point) => {
                let _ = write!(
                    waypoints,
                    "\n    <wpt lat=\"{}\" lon=\"{}\">\n        <name>{}</name>\n        <desc>{}</desc>\n    </wpt>",
                    format_ordinate(point.y),
                    format_ordinate(point.x),
                    escape(&name),
                    escape(&desc)
                );
            }
            CanonicalGeometry::LineString(points) => track(&mut tracks, &name, &desc, points),
            CanonicalGeometry::Polygon(rings) => {
                if let Some(outer) = rings.first() {
                    track(&mut tracks, &format!("{name} (Boundary)"), &desc, outer);
                }
            }
        }
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <gpx version=\"1.1\" creator=\"{CREATOR}\"\n    \
         xmlns=\"http://www.topografix.com/GPX/1/1\"\n    \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"\n    \
         xsi:schemaLocation=\"http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd\">\n    \
         <metadata>\n        <name>{}</name>\n    </metadata>{waypoints}{tracks}\n</gpx>\n",
        escape(&set.layer_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcgis_export_arcgis_models::RawFeature;
    use serde_json::json;

    fn layer(features: serde_json::Value) -> FeatureSet {
        let raw: Vec<RawFeature> = serde_json::from_value(features).unwrap();
        FeatureSet::from_raw("Trails", raw)
    }

    #[test]
    fn waypoints_precede_tracks() {
        let set = layer(json!([
            {"attributes": {"name": "Loop"}, "geometry": {"paths": [[[-122.0, 37.0], [-122.1, 37.1]]]}},
            {"attributes": {"name": "Trailhead", "ELEV": 120}, "geometry": {"x": -122.0, "y": 37.0}}
        ]));
        let gpx = encode(&set);

        let wpt = gpx.find("<wpt").unwrap();
        let trk = gpx.find("<trk>").unwrap();
        assert!(wpt < trk);
        assert!(gpx.contains("<metadata>\n        <name>Trails</name>"));
        assert!(gpx.contains("<wpt lat=\"37.0000000000\" lon=\"-122.0000000000\">"));
        assert!(gpx.contains("<desc>ELEV: 120, name: Trailhead</desc>"));
        assert_eq!(gpx.matches("<trkpt ").count(), 2);
    }

    #[test]
    fn polygon_becomes_boundary_track_of_outer_ring() {
        let set = layer(json!([{
            "attributes": {"NAME": "Lot"},
            "geometry": {"rings": [[[0, 0], [1, 0], [1, 1]], [[0.2, 0.2], [0.3, 0.2], [0.3, 0.3]]]}
        }]));
        let gpx = encode(&set);

        assert!(gpx.contains("<name>Lot (Boundary)</name>"));
        assert_eq!(gpx.matches("<trk>").count(), 1);
        assert_eq!(gpx.matches("<trkpt ").count(), 4);
    }

    #[test]
    fn features_without_geometry_are_skipped() {
        let gpx = encode(&layer(json!([{"attributes": {"name": "Ghost"}}])));
        assert!(!gpx.contains("Ghost"));
        assert!(gpx.ends_with("</gpx>\n"));
    }
}
