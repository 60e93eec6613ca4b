#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Format encoders for converted `ArcGIS` layers.
//!
//! Every encoder is a pure function from a [`FeatureSet`] to the bytes of
//! one output file. Nothing here touches the network or the filesystem;
//! the pipeline decides where the bytes go.
//!
//! Spatial formats ([`OutputFormat::GeoJson`], [`OutputFormat::Kml`],
//! [`OutputFormat::Kmz`], [`OutputFormat::Gpx`]) only emit features with a
//! translated geometry. Attribute-oriented formats ([`OutputFormat::Csv`],
//! [`OutputFormat::Json`], [`OutputFormat::Text`]) emit every feature.

pub mod collection;
pub mod gpx;
pub mod kml;
pub mod tabular;
pub mod text;
mod xml;

use arcgis_export_convert::FeatureSet;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub use kml::ImageMode;

/// Errors that can occur while encoding a layer.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Writing a CSV record failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Building the KMZ archive failed.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An in-memory write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The encoder produced output it could not finalize.
    #[error("Encoding failed: {message}")]
    Encode {
        /// What went wrong.
        message: String,
    },
}

/// Output file formats.
///
/// Parsing is case-insensitive; `text` is accepted as an alias of `txt`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// RFC 7946 `FeatureCollection` with a CRS84 declaration.
    #[default]
    GeoJson,
    /// KML 2.2 document with inline styles.
    Kml,
    /// Zipped KML with symbol images as archive entries.
    Kmz,
    /// GPX 1.1 waypoints and tracks.
    Gpx,
    /// Attribute table with a trailing WKT column.
    Csv,
    /// Array of `{attributes, geometry}` records.
    Json,
    /// Human-readable report.
    #[strum(to_string = "txt", serialize = "text")]
    Text,
}

impl OutputFormat {
    /// File extension (without the dot) for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::GeoJson => "geojson",
            Self::Kml => "kml",
            Self::Kmz => "kmz",
            Self::Gpx => "gpx",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "txt",
        }
    }
}

/// Encodes a layer in the given format.
///
/// # Errors
///
/// * If serialization or archive creation fails
pub fn encode(format: OutputFormat, set: &FeatureSet) -> Result<Vec<u8>, ExportError> {
    log::debug!(
        "Encoding {} features of '{}' as {format}",
        set.features.len(),
        set.layer_name
    );

    match format {
        OutputFormat::GeoJson => collection::encode(set),
        OutputFormat::Kml => Ok(kml::encode(set).into_bytes()),
        OutputFormat::Kmz => kml::encode_kmz(set),
        OutputFormat::Gpx => Ok(gpx::encode(set).into_bytes()),
        OutputFormat::Csv => tabular::encode_csv(set),
        OutputFormat::Json => tabular::encode_json(set),
        OutputFormat::Text => Ok(text::encode(set).into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcgis_export_arcgis_models::RawFeature;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!(OutputFormat::from_str("GeoJSON").unwrap(), OutputFormat::GeoJson);
        assert_eq!(OutputFormat::from_str("KMZ").unwrap(), OutputFormat::Kmz);
        assert_eq!(OutputFormat::from_str("text").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("TXT").unwrap(), OutputFormat::Text);
        assert!(OutputFormat::from_str("shapefile").is_err());
    }

    #[test]
    fn display_matches_extension() {
        for format in OutputFormat::iter() {
            assert_eq!(format.to_string(), format.extension());
        }
    }

    #[test]
    fn every_format_encodes_a_point() {
        let raw: RawFeature = serde_json::from_value(serde_json::json!({
            "attributes": {"NAME": "Hydrant"},
            "geometry": {"x": -122.0, "y": 37.0}
        }))
        .unwrap();
        let set = FeatureSet::from_raw("Hydrants", vec![raw]);

        for format in OutputFormat::iter() {
            let bytes = encode(format, &set).unwrap();
            assert!(!bytes.is_empty(), "{format} produced no output");
        }
    }
}
