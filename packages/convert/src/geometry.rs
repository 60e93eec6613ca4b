//! Esri JSON geometry translation.
//!
//! Esri encodes points as `{x, y}`, lines as `{paths: [[[x, y], ...], ...]}`
//! and polygons as `{rings: [[[x, y], ...], ...]}`. [`to_canonical`] maps
//! those onto [`CanonicalGeometry`]; it never fails, degrading malformed
//! input to `None`.
//!
//! Only the first path of a multi-path line is kept. Polygon rings are
//! closed on translation and rings without a valid vertex are dropped.

use std::fmt::Write as _;

/// A 2D vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    /// Longitude / easting.
    pub x: f64,
    /// Latitude / northing.
    pub y: f64,
}

impl Coord {
    /// Creates a vertex.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A translated geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalGeometry {
    /// A single position.
    Point(Coord),
    /// An ordered vertex list.
    LineString(Vec<Coord>),
    /// Outer ring followed by holes; every ring is closed.
    Polygon(Vec<Vec<Coord>>),
}

/// Formats one ordinate with ten fixed decimals.
#[must_use]
pub fn format_ordinate(value: f64) -> String {
    format!("{value:.10}")
}

impl CanonicalGeometry {
    /// GeoJSON-style type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::LineString(_) => "LineString",
            Self::Polygon(_) => "Polygon",
        }
    }

    /// Renders the geometry as Well-Known Text.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        match self {
            Self::Point(coord) => format!("POINT ({})", wkt_coord(*coord)),
            Self::LineString(coords) => format!("LINESTRING ({})", wkt_coords(coords)),
            Self::Polygon(rings) => {
                let mut out = String::from("POLYGON (");
                for (i, ring) in rings.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "({})", wkt_coords(ring));
                }
                out.push(')');
                out
            }
        }
    }
}

fn wkt_coord(coord: Coord) -> String {
    format!("{} {}", format_ordinate(coord.x), format_ordinate(coord.y))
}

fn wkt_coords(coords: &[Coord]) -> String {
    coords
        .iter()
        .map(|c| wkt_coord(*c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reads an `[x, y, ...]` vertex; both leading components must be numbers.
fn parse_vertex(value: &serde_json::Value) -> Option<Coord> {
    let parts = value.as_array()?;
    if parts.len() < 2 {
        return None;
    }
    Some(Coord::new(parts[0].as_f64()?, parts[1].as_f64()?))
}

fn parse_vertices(value: &serde_json::Value) -> Option<Vec<Coord>> {
    value
        .as_array()
        .map(|vertices| vertices.iter().filter_map(parse_vertex).collect())
}

/// Translates an Esri JSON geometry.
///
/// The `x` key takes precedence over `paths`, which takes precedence over
/// `rings`. Returns `None` for anything that does not yield at least one
/// valid vertex.
#[must_use]
pub fn to_canonical(value: &serde_json::Value) -> Option<CanonicalGeometry> {
    let object = value.as_object()?;

    if let Some(x) = object.get("x") {
        let x = x.as_f64()?;
        let y = object.get("y")?.as_f64()?;
        return Some(CanonicalGeometry::Point(Coord::new(x, y)));
    }

    if let Some(paths) = object.get("paths") {
        let first = paths.as_array()?.first()?;
        let coords = parse_vertices(first)?;
        if coords.is_empty() {
            return None;
        }
        return Some(CanonicalGeometry::LineString(coords));
    }

    if let Some(rings) = object.get("rings") {
        let rings: Vec<Vec<Coord>> = rings
            .as_array()?
            .iter()
            .filter_map(parse_vertices)
            .filter(|ring| !ring.is_empty())
            .map(close_ring)
            .collect();
        if rings.is_empty() {
            return None;
        }
        return Some(CanonicalGeometry::Polygon(rings));
    }

    None
}

fn close_ring(mut ring: Vec<Coord>) -> Vec<Coord> {
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied())
        && first != last
    {
        ring.push(first);
    }
    ring
}

/// Translates an Esri JSON geometry straight to WKT, or `""` if it cannot
/// be translated.
#[must_use]
pub fn to_wkt(value: &serde_json::Value) -> String {
    to_canonical(value)
        .map(|geometry| geometry.to_wkt())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn point_to_wkt() {
        let geometry = json!({"x": -122.0, "y": 37.0});
        assert_eq!(
            to_canonical(&geometry),
            Some(CanonicalGeometry::Point(Coord::new(-122.0, 37.0)))
        );
        assert_eq!(to_wkt(&geometry), "POINT (-122.0000000000 37.0000000000)");
    }

    #[test]
    fn integer_coordinates_are_numeric() {
        assert_eq!(
            to_canonical(&json!({"x": 3, "y": -4})),
            Some(CanonicalGeometry::Point(Coord::new(3.0, -4.0)))
        );
    }

    #[test]
    fn only_first_path_is_kept() {
        let geometry = json!({"paths": [[[0.0, 0.0], [1.0, 1.0]], [[5.0, 5.0], [6.0, 6.0]]]});
        assert_eq!(
            to_wkt(&geometry),
            "LINESTRING (0.0000000000 0.0000000000, 1.0000000000 1.0000000000)"
        );
    }

    #[test]
    fn open_ring_is_closed() {
        let geometry = json!({"rings": [[[-1.0, 1.0], [-2.0, 1.0], [-2.0, 2.0]]]});
        let Some(CanonicalGeometry::Polygon(rings)) = to_canonical(&geometry) else {
            panic!("expected polygon");
        };
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[0][3], Coord::new(-1.0, 1.0));
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn closed_ring_is_untouched_and_holes_kept() {
        let geometry = json!({"rings": [
            [[0, 0], [4, 0], [4, 4], [0, 0]],
            [[1, 1], [2, 1], [2, 2]],
            []
        ]});
        let Some(CanonicalGeometry::Polygon(rings)) = to_canonical(&geometry) else {
            panic!("expected polygon");
        };
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[1].len(), 4);
        for ring in &rings {
            assert_eq!(ring.first(), ring.last());
        }
        assert_eq!(
            to_wkt(&geometry),
            "POLYGON ((0.0000000000 0.0000000000, 4.0000000000 0.0000000000, \
             4.0000000000 4.0000000000, 0.0000000000 0.0000000000), \
             (1.0000000000 1.0000000000, 2.0000000000 1.0000000000, \
             2.0000000000 2.0000000000, 1.0000000000 1.0000000000))"
        );
    }

    #[test]
    fn malformed_input_degrades_to_absent() {
        let cases = [
            json!(null),
            json!("POINT (1 2)"),
            json!([1, 2]),
            json!({}),
            json!({"x": 1.0}),
            json!({"x": "1", "y": 2}),
            json!({"x": 1, "y": null}),
            json!({"paths": []}),
            json!({"paths": [[]]}),
            json!({"paths": [[[1.0]], [["a", "b"]]]}),
            json!({"paths": "nope"}),
            json!({"rings": []}),
            json!({"rings": [[], [[1.0]], "x"]}),
            json!({"rings": [[["a", 1.0]]]}),
            json!({"spatialReference": {"wkid": 4326}}),
        ];
        for case in cases {
            assert_eq!(to_canonical(&case), None, "case: {case}");
            assert_eq!(to_wkt(&case), "", "case: {case}");
        }
    }

    #[test]
    fn invalid_vertices_are_dropped_from_lines() {
        let geometry = json!({"paths": [[[0, 0], ["bad", 1], [2, 2, 9]]]});
        assert_eq!(
            to_canonical(&geometry),
            Some(CanonicalGeometry::LineString(vec![
                Coord::new(0.0, 0.0),
                Coord::new(2.0, 2.0)
            ]))
        );
    }
}
