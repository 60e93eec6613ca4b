//! Attribute-oriented encoders: CSV and tabular JSON.

use std::collections::{BTreeMap, BTreeSet};

use arcgis_export_convert::{AttributeValue, Feature, FeatureSet};
use serde::Serialize;

use crate::ExportError;

/// Name of the trailing geometry column.
pub const WKT_COLUMN: &str = "WKT_Geometry";

/// Sorted union of every feature's attribute keys.
#[must_use]
pub fn attribute_columns(set: &FeatureSet) -> Vec<&str> {
    set.features
        .iter()
        .flat_map(|feature| feature.attributes.keys())
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn cell(feature: &Feature, column: &str) -> String {
    feature
        .attributes
        .get(column)
        .map(AttributeValue::to_cell)
        .unwrap_or_default()
}

/// Encodes a layer as CSV. An empty layer produces an empty file.
///
/// # Errors
///
/// * If writing a record fails
pub fn encode_csv(set: &FeatureSet) -> Result<Vec<u8>, ExportError> {
    if set.features.is_empty() {
        return Ok(Vec::new());
    }

    let columns = attribute_columns(set);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(columns.iter().copied().chain([WKT_COLUMN]))?;
    for feature in &set.features {
        let mut row: Vec<String> = columns.iter().map(|column| cell(feature, column)).collect();
        row.push(feature.wkt());
        writer.write_record(&row)?;
    }

    writer.into_inner().map_err(|e| ExportError::Encode {
        message: e.to_string(),
    })
}

#[derive(Serialize)]
struct Record<'a> {
    attributes: &'a BTreeMap<String, AttributeValue>,
    geometry: Option<&'a serde_json::Value>,
}

/// Encodes a layer as a pretty-printed array of `{attributes, geometry}`
/// records, keeping the source geometry as received.
///
/// # Errors
///
/// * If serialization fails
pub fn encode_json(set: &FeatureSet) -> Result<Vec<u8>, ExportError> {
    let records: Vec<Record<'_>> = set
        .features
        .iter()
        .map(|feature| Record {
            attributes: &feature.attributes,
            geometry: feature.source_geometry.as_ref(),
        })
        .collect();

    Ok(serde_json::to_vec_pretty(&records)?)
}
