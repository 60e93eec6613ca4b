//! KML and KMZ encoders.
//!
//! Both share one document builder. Styles are collected in first-seen
//! order, one per distinct symbol signature, and placemarks reference them
//! by id. The only difference is where symbol images live: inline as
//! `data:` URIs for KML, or as `images/symbol_{n}{ext}` archive entries
//! for KMZ.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::io::{Cursor, Write as _};

use arcgis_export_arcgis_models::Symbol;
use arcgis_export_convert::{CanonicalGeometry, Coord, Feature, FeatureSet};
use base64::Engine as _;

use crate::ExportError;
use crate::xml::{escape, feature_name, kml_coordinate};

/// Icon used when a symbol kind has no KML equivalent.
pub const DEFAULT_ICON: &str = "http://maps.google.com/mapfiles/kml/shapes/placemark_circle.png";

/// Icon used for markers without an image inside a KMZ.
pub const PUSHPIN_ICON: &str = "http://maps.google.com/mapfiles/kml/pushpin/ylw-pushpin.png";

const LABEL_STYLE: &str = "<LabelStyle><scale>1.0</scale></LabelStyle>";

/// Where symbol images end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    /// Base64 payloads become `data:` URIs.
    Inline,
    /// Payloads are decoded into archive entries.
    Archive,
}

/// An image destined for the KMZ archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveImage {
    /// Path inside the archive.
    pub path: String,
    /// Decoded image bytes.
    pub data: Vec<u8>,
}

/// A rendered KML document plus any images it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmlDocument {
    /// The KML text.
    pub kml: String,
    /// Images referenced by relative path (empty in inline mode).
    pub images: Vec<ArchiveImage>,
}

/// Style id derived from a symbol's kind, size, offsets and angle.
#[must_use]
pub fn style_id(symbol: &Symbol) -> String {
    format!(
        "style_{}_{}_{}_{}_{}_{:.2}",
        symbol.kind, symbol.width, symbol.height, symbol.x_offset, symbol.y_offset, symbol.angle
    )
}

/// File extension for an image content type.
#[must_use]
pub fn image_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/svg+xml" => ".svg",
        _ => ".png",
    }
}

fn ratio(offset: f64, size: f64) -> f64 {
    if size > 0.0 { offset / size } else { 0.0 }
}

fn picture_marker(symbol: &Symbol, href: &str) -> String {
    let scale = if symbol.width > 0.0 && symbol.height > 0.0 {
        symbol.width / 32.0
    } else {
        1.0
    };
    format!(
        "<IconStyle><scale>{scale:.2}</scale><heading>{:.2}</heading>\
         <Icon><href>{}</href></Icon>\
         <hotSpot x=\"{:.2}\" y=\"{:.2}\" xunits=\"fraction\" yunits=\"fraction\"/>\
         </IconStyle>{LABEL_STYLE}",
        symbol.angle,
        escape(href),
        ratio(symbol.x_offset, symbol.width),
        ratio(symbol.y_offset, symbol.height),
    )
}

fn archive_picture_marker(symbol: &Symbol, href: &str) -> String {
    let href = if href.is_empty() { PUSHPIN_ICON } else { href };
    let scale = if symbol.width > 0.0 {
        symbol.width / 32.0
    } else {
        1.0
    };
    format!(
        "<IconStyle><Icon><href>{}</href></Icon><scale>{scale:.2}</scale>\
         <hotSpot x=\"0.5\" y=\"0\" xunits=\"fraction\" yunits=\"fraction\"/></IconStyle>",
        escape(href),
    )
}

fn simple_marker(symbol: &Symbol) -> String {
    let scale = if symbol.width > 0.0 {
        symbol.width / 16.0
    } else {
        1.0
    };
    format!(
        "<IconStyle><color>ff0000ff</color><scale>{scale:.2}</scale>\
         <Icon><href>{PUSHPIN_ICON}</href></Icon></IconStyle>"
    )
}

fn simple_line(symbol: &Symbol) -> String {
    let width = if symbol.width > 0.0 { symbol.width } else { 2.0 };
    format!("<LineStyle><width>{width}</width><color>ff0000ff</color></LineStyle>{LABEL_STYLE}")
}

fn simple_fill() -> String {
    format!(
        "<PolyStyle><color>7f0000ff</color><fill>1</fill><outline>1</outline></PolyStyle>\
         <LineStyle><width>2</width><color>ff0000ff</color></LineStyle>{LABEL_STYLE}"
    )
}

fn default_style() -> String {
    format!("<IconStyle><scale>1.0</scale><Icon><href>{DEFAULT_ICON}</href></Icon></IconStyle>{LABEL_STYLE}")
}

/// Renders the body of a `<Style>` element.
fn style_body(symbol: &Symbol, href: &str, mode: ImageMode) -> String {
    match (symbol.kind.as_str(), mode) {
        ("esriPMS" | "esriSMS", ImageMode::Inline) => picture_marker(symbol, href),
        ("esriPMS", ImageMode::Archive) => archive_picture_marker(symbol, href),
        ("esriSMS", ImageMode::Archive) => simple_marker(symbol),
        ("esriSLS", _) => simple_line(symbol),
        ("esriSFS", _) => simple_fill(),
        _ => default_style(),
    }
}

fn coordinates(coords: &[Coord]) -> String {
    coords
        .iter()
        .map(|c| kml_coordinate(c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn linear_ring(tag: &str, ring: &[Coord]) -> String {
    format!(
        "<{tag}><LinearRing><coordinates>{}</coordinates></LinearRing></{tag}>",
        coordinates(ring)
    )
}

/// Renders a geometry element.
#[must_use]
pub fn geometry_element(geometry: &CanonicalGeometry) -> String {
    match geometry {
        CanonicalGeometry::Point(c) => {
            format!("<Point><coordinates>{}</coordinates></Point>", kml_coordinate(c.x, c.y))
        }
        CanonicalGeometry::LineString(coords) => format!(
            "<LineString><coordinates>{}</coordinates></LineString>",
            coordinates(coords)
        ),
        CanonicalGeometry::Polygon(rings) => {
            let mut out = String::from("<Polygon>");
            if let Some((outer, holes)) = rings.split_first() {
                out.push_str(&linear_ring("outerBoundaryIs", outer));
                for hole in holes {
                    out.push_str(&linear_ring("innerBoundaryIs", hole));
                }
            }
            out.push_str("</Polygon>");
            out
        }
    }
}

/// HTML description: `<strong>key</strong>: value` per property.
fn description(feature: &Feature) -> String {
    feature
        .properties()
        .map(|(key, value)| {
            format!(
                "<strong>{}</strong>: {}",
                escape(key),
                escape(&value.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("<br>")
}

struct StyleCollector {
    mode: ImageMode,
    seen: BTreeSet<String>,
    styles: String,
    images: Vec<ArchiveImage>,
}

impl StyleCollector {
    const fn new(mode: ImageMode) -> Self {
        Self {
            mode,
            seen: BTreeSet::new(),
            styles: String::new(),
            images: Vec::new(),
        }
    }

    /// Registers a symbol, returning its style id.
    fn register(&mut self, symbol: &Symbol) -> String {
        let id = style_id(symbol);
        if self.seen.insert(id.clone()) {
            let href = self.image_href(symbol);
            let _ = write!(
                self.styles,
                "<Style id=\"{}\">{}</Style>",
                escape(&id),
                style_body(symbol, &href, self.mode)
            );
        }
        id
    }

    fn image_href(&mut self, symbol: &Symbol) -> String {
        if symbol.image_data.is_empty() {
            return symbol.url.clone();
        }
        match self.mode {
            ImageMode::Inline => {
                format!("data:{};base64,{}", symbol.content_type, symbol.image_data)
            }
            ImageMode::Archive => {
                match base64::engine::general_purpose::STANDARD.decode(&symbol.image_data) {
                    Ok(data) => {
                        let path = format!(
                            "images/symbol_{}{}",
                            self.images.len() + 1,
                            image_extension(&symbol.content_type)
                        );
                        self.images.push(ArchiveImage {
                            path: path.clone(),
                            data,
                        });
                        path
                    }
                    Err(e) => {
                        log::warn!("Failed to decode symbol image for KMZ: {e}");
                        symbol.url.clone()
                    }
                }
            }
        }
    }
}

/// Builds the KML document for a layer.
#[must_use]
pub fn build(set: &FeatureSet, mode: ImageMode) -> KmlDocument {
    let mut collector = StyleCollector::new(mode);
    let mut placemarks = String::new();

    for (feature, geometry) in set.with_geometry() {
        let style_url = feature
            .symbol()
            .map(|symbol| format!("<styleUrl>#{}</styleUrl>", escape(&collector.register(symbol))))
            .unwrap_or_default();

        let _ = write!(
            placemarks,
            "<Placemark><name>{}</name><description><![CDATA[{}]]></description>{style_url}{}</Placemark>",
            escape(&feature_name(feature)),
            description(feature),
            geometry_element(geometry),
        );
    }

    let kml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document><name>{}</name>{}{placemarks}</Document></kml>\n",
        escape(&set.layer_name),
        collector.styles,
    );

    KmlDocument {
        kml,
        images: collector.images,
    }
}

/// Encodes a layer as KML with inline images.
#[must_use]
pub fn encode(set: &FeatureSet) -> String {
    build(set, ImageMode::Inline).kml
}

/// Encodes a layer as a KMZ archive: `doc.kml` followed by its images.
///
/// # Errors
///
/// * If writing the archive fails
pub fn encode_kmz(set: &FeatureSet) -> Result<Vec<u8>, ExportError> {
    let document = build(set, ImageMode::Archive);

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    writer.start_file("doc.kml", options)?;
    writer.write_all(document.kml.as_bytes())?;

    for image in &document.images {
        writer.start_file(image.path.as_str(), options)?;
        writer.write_all(&image.data)?;
    }

    Ok(writer.finish()?.into_inner())
}
