#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `ArcGIS` REST document types and discovered layer descriptors.
//!
//! The document types mirror the JSON returned by `FeatureServer`,
//! `MapServer`, layer, item, and web map endpoints. They are deliberately
//! lenient: every field has a default, and string/array fields tolerate an
//! explicit `null`, because real services omit or null out fields freely.
//!
//! [`LayerDescriptor`] is the unit of work produced by discovery and keyed
//! by [`LayerKey`] everywhere downstream.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Sentinel `parentLayerId` for top-level `MapServer` layers.
pub const NO_PARENT_LAYER: i64 = -1;

/// `MapServer` layer type that marks a queryable leaf layer.
pub const FEATURE_LAYER_TYPE: &str = "Feature Layer";

/// Deserializes a field that may be `null` into its default value.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

const fn no_parent_layer() -> i64 {
    NO_PARENT_LAYER
}

// ---------------------------------------------------------------------------
// Resource classification
// ---------------------------------------------------------------------------

/// The two `ArcGIS` service container types this tool can enumerate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr,
)]
pub enum ServiceType {
    /// A `FeatureServer` exposing a flat list of layers and tables.
    FeatureServer,
    /// A `MapServer` exposing a layer hierarchy with group layers.
    MapServer,
}

impl ServiceType {
    /// Detects the service type from the `/FeatureServer` or `/MapServer`
    /// path token of a URL (case-insensitive). `MapServer` is checked first.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_ascii_lowercase();
        if lower.contains("/mapserver") {
            Some(Self::MapServer)
        } else if lower.contains("/featureserver") {
            Some(Self::FeatureServer)
        } else {
            None
        }
    }
}

/// Classification of a normalized input reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum ResourceKind {
    /// A single layer, addressed by a numeric trailing path segment.
    SingleLayer,
    /// A whole `FeatureServer`.
    FeatureServer,
    /// A whole `MapServer`.
    MapServer,
    /// An `ArcGIS` Online item page (`home/item.html?id=...`).
    OnlineItem,
}

impl From<ServiceType> for ResourceKind {
    fn from(value: ServiceType) -> Self {
        match value {
            ServiceType::FeatureServer => Self::FeatureServer,
            ServiceType::MapServer => Self::MapServer,
        }
    }
}

// ---------------------------------------------------------------------------
// Discovered layers
// ---------------------------------------------------------------------------

/// Identity of a layer: the service it lives in plus its numeric ID.
///
/// Two descriptors with the same key describe the same layer and are only
/// ever processed once.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerKey {
    /// Service URL without a trailing slash.
    pub service_url: String,
    /// Layer ID within the service.
    pub layer_id: String,
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service_url, self.layer_id)
    }
}

/// A feature layer reachable from the input reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    /// Service URL the layer belongs to.
    pub service_url: String,
    /// Layer ID within the service.
    pub layer_id: String,
    /// Name known at discovery time (may be replaced by layer metadata).
    pub name: String,
    /// Esri layer type (e.g. `"Feature Layer"`), empty if unknown.
    pub esri_type: String,
    /// Esri geometry type (e.g. `"esriGeometryPolygon"`), empty if unknown.
    pub geometry_type: String,
    /// Names of the ancestors of this layer, outermost first.
    pub parent_path: Vec<String>,
    /// Whether the layer can be queried for features.
    pub is_feature_layer: bool,
}

impl LayerDescriptor {
    /// Creates a descriptor for a layer known only by its URL.
    ///
    /// The name is synthesized as `Layer_{id}`.
    #[must_use]
    pub fn single(service_url: &str, layer_id: &str) -> Self {
        Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            layer_id: layer_id.to_string(),
            name: synthesized_layer_name(layer_id),
            esri_type: String::new(),
            geometry_type: String::new(),
            parent_path: Vec::new(),
            is_feature_layer: true,
        }
    }

    /// Returns the identity of this layer.
    #[must_use]
    pub fn key(&self) -> LayerKey {
        LayerKey {
            service_url: self.service_url.trim_end_matches('/').to_string(),
            layer_id: self.layer_id.clone(),
        }
    }

    /// Returns the ancestor path joined with `" > "`, or `None` at top level.
    #[must_use]
    pub fn breadcrumb(&self) -> Option<String> {
        if self.parent_path.is_empty() {
            None
        } else {
            Some(self.parent_path.join(" > "))
        }
    }
}

/// Name given to a layer whose real name is unknown.
#[must_use]
pub fn synthesized_layer_name(layer_id: &str) -> String {
    format!("Layer_{layer_id}")
}

/// Parses a declared layer ID into its canonical string form.
///
/// Accepts non-negative integer JSON numbers and strings holding one.
/// Anything else (fractions, negative numbers, text, `null`) yields `None`.
#[must_use]
pub fn parse_layer_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(|id| id.to_string()),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<u64>().ok().map(|id| id.to_string())
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// REST documents
// ---------------------------------------------------------------------------

/// The `error` object embedded in a failed REST response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Numeric error code, if reported.
    #[serde(default)]
    pub code: Option<i64>,
    /// Human-readable error message.
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    /// Additional detail lines.
    #[serde(default, deserialize_with = "nullable")]
    pub details: Vec<String>,
}

/// A decoded REST document that may carry an embedded error payload.
pub trait ApiDocument {
    /// Returns the embedded error, if the service reported one.
    fn api_error(&self) -> Option<&ErrorPayload>;
}

macro_rules! api_document {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ApiDocument for $ty {
                fn api_error(&self) -> Option<&ErrorPayload> {
                    self.error.as_ref()
                }
            }
        )*
    };
}

api_document!(
    FeatureServerMetadata,
    MapServiceMetadata,
    LayerMetadata,
    FeatureQueryResponse,
    ItemData,
    WebMapData,
);

/// `FeatureServer?f=json` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureServerMetadata {
    /// Server version, reported as a number by most services.
    #[serde(default)]
    pub current_version: serde_json::Value,
    /// Declared layers.
    #[serde(default, deserialize_with = "nullable")]
    pub layers: Vec<ServiceLayer>,
    /// Declared tables (never processed).
    #[serde(default, deserialize_with = "nullable")]
    pub tables: Vec<ServiceLayer>,
    /// Service name.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Service description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// Item ID backing the service, if any.
    #[serde(default, deserialize_with = "nullable")]
    pub service_item_id: String,
    /// Embedded error.
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

/// A layer entry in a `FeatureServer` listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLayer {
    /// Declared ID; usually a number but not guaranteed.
    #[serde(default)]
    pub id: serde_json::Value,
    /// Layer name.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Esri layer type.
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub esri_type: String,
    /// Esri geometry type.
    #[serde(default, deserialize_with = "nullable")]
    pub geometry_type: String,
}

/// `MapServer?f=json` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapServiceMetadata {
    /// Service name.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// All layers, leaves and groups alike.
    #[serde(default, deserialize_with = "nullable")]
    pub layers: Vec<MapServiceLayer>,
    /// Service description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// Embedded error.
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

/// A layer entry in a `MapServer` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapServiceLayer {
    /// Layer ID.
    pub id: i64,
    /// Layer name.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Esri layer type (`"Feature Layer"`, `"Group Layer"`, ...).
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub esri_type: String,
    /// Esri geometry type.
    #[serde(default, deserialize_with = "nullable")]
    pub geometry_type: String,
    /// Parent layer ID, [`NO_PARENT_LAYER`] at the top level.
    #[serde(default = "no_parent_layer")]
    pub parent_layer_id: i64,
    /// Child layer IDs; `null` for leaves.
    #[serde(default, deserialize_with = "nullable")]
    pub sub_layer_ids: Vec<i64>,
}

/// Single layer `{service}/{id}?f=json` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMetadata {
    /// Declared ID.
    #[serde(default)]
    pub id: serde_json::Value,
    /// Layer name.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Esri layer type.
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub esri_type: String,
    /// Esri geometry type.
    #[serde(default, deserialize_with = "nullable")]
    pub geometry_type: String,
    /// Layer description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// Rendering information.
    #[serde(default)]
    pub drawing_info: Option<DrawingInfo>,
    /// Embedded error.
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

impl LayerMetadata {
    /// Returns the renderer definition, if the layer declares one.
    #[must_use]
    pub fn renderer(&self) -> Option<&RendererDefinition> {
        self.drawing_info.as_ref()?.renderer.as_ref()
    }
}

/// `drawingInfo` block of a layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingInfo {
    /// The layer's renderer.
    #[serde(default)]
    pub renderer: Option<RendererDefinition>,
}

/// Raw renderer definition as declared by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererDefinition {
    /// Renderer type (`"simple"`, `"uniqueValue"`, ...).
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    /// Attribute field driving a unique-value renderer.
    #[serde(default, deserialize_with = "nullable")]
    pub field1: String,
    /// Symbol for features not matched by any class.
    #[serde(default)]
    pub default_symbol: Option<Symbol>,
    /// Symbol of a simple renderer.
    #[serde(default)]
    pub symbol: Option<Symbol>,
    /// Label of the default symbol.
    #[serde(default, deserialize_with = "nullable")]
    pub default_label: String,
    /// Grouped unique-value classes.
    #[serde(default, deserialize_with = "nullable")]
    pub unique_value_groups: Vec<UniqueValueGroup>,
    /// Flat unique-value classes.
    #[serde(default, deserialize_with = "nullable")]
    pub unique_value_infos: Vec<UniqueValueInfo>,
}

/// A visual symbol.
///
/// Numeric fields are `f64` because services report fractional point sizes
/// (e.g. `7.5`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    /// Esri symbol type (`"esriPMS"`, `"esriSMS"`, `"esriSLS"`, `"esriSFS"`).
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    /// Image URL, relative to the layer for picture symbols.
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    /// Base64 image payload.
    #[serde(default, deserialize_with = "nullable")]
    pub image_data: String,
    /// MIME type of the image payload.
    #[serde(default, deserialize_with = "nullable")]
    pub content_type: String,
    /// Width in points.
    #[serde(default, deserialize_with = "nullable")]
    pub width: f64,
    /// Height in points.
    #[serde(default, deserialize_with = "nullable")]
    pub height: f64,
    /// Horizontal offset in points.
    #[serde(rename = "xoffset", default, deserialize_with = "nullable")]
    pub x_offset: f64,
    /// Vertical offset in points.
    #[serde(rename = "yoffset", default, deserialize_with = "nullable")]
    pub y_offset: f64,
    /// Rotation in degrees.
    #[serde(default, deserialize_with = "nullable")]
    pub angle: f64,
}

/// A heading grouping unique-value classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniqueValueGroup {
    /// Group heading.
    #[serde(default, deserialize_with = "nullable")]
    pub heading: String,
    /// Classes in declaration order.
    #[serde(default, deserialize_with = "nullable")]
    pub classes: Vec<UniqueValueClass>,
}

/// One unique-value class: a set of value tuples sharing a symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniqueValueClass {
    /// Class label.
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    /// Class description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// Value tuples; only the first element of each tuple is matched.
    #[serde(default, deserialize_with = "nullable")]
    pub values: Vec<Vec<serde_json::Value>>,
    /// Symbol shared by every value of the class.
    #[serde(default)]
    pub symbol: Option<Symbol>,
}

/// A flat unique-value entry (`uniqueValueInfos`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniqueValueInfo {
    /// The matched value.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Entry label.
    #[serde(default, deserialize_with = "nullable")]
    pub label: String,
    /// Entry description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// Symbol for the value.
    #[serde(default)]
    pub symbol: Option<Symbol>,
}

/// `{layer}/query` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureQueryResponse {
    /// Returned records.
    #[serde(default, deserialize_with = "nullable")]
    pub features: Vec<RawFeature>,
    /// Set when the server truncated the result set.
    #[serde(default, deserialize_with = "nullable")]
    pub exceeded_transfer_limit: bool,
    /// Embedded error.
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

/// One record as returned by a feature query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    /// Attribute values keyed by field name.
    #[serde(default, deserialize_with = "nullable")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Esri JSON geometry (`x`/`y`, `paths`, or `rings`), if any.
    #[serde(default)]
    pub geometry: Option<serde_json::Value>,
}

/// `ArcGIS` Online item metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemData {
    /// Item ID.
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Item file name.
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Item title.
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    /// Item type (`"Feature Service"`, `"Map Service"`, `"Web Map"`, ...).
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub item_type: String,
    /// Service URL for service items; empty for web maps.
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    /// Embedded error.
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

/// Web map item data (`items/{id}/data`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebMapData {
    /// Top-level operational layers in document order.
    #[serde(default, deserialize_with = "nullable")]
    pub operational_layers: Vec<OperationalLayer>,
    /// Embedded error.
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

/// A node of a web map's operational layer tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalLayer {
    /// Node ID within the web map.
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// Display title.
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    /// Service or layer URL.
    #[serde(default, deserialize_with = "nullable")]
    pub url: String,
    /// Referenced portal item.
    #[serde(default, deserialize_with = "nullable")]
    pub item_id: String,
    /// Web map layer type (`"GroupLayer"`, `"ArcGISFeatureLayer"`, ...).
    #[serde(default, deserialize_with = "nullable")]
    pub layer_type: String,
    /// Child nodes of a group.
    #[serde(default, deserialize_with = "nullable")]
    pub layers: Vec<Self>,
    /// Inline feature collection.
    #[serde(default)]
    pub feature_collection: Option<FeatureCollection>,
}

/// Inline feature collection embedded in a web map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Collection layers.
    #[serde(default, deserialize_with = "nullable")]
    pub layers: Vec<FeatureCollectionLayer>,
}

/// One layer of an inline feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCollectionLayer {
    /// Layer ID.
    #[serde(default)]
    pub id: serde_json::Value,
    /// Layer definition (schema and renderer).
    #[serde(default)]
    pub layer_definition: serde_json::Value,
    /// Embedded records.
    #[serde(default)]
    pub feature_set: Option<FeatureSetDocument>,
}

/// Embedded `featureSet` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSetDocument {
    /// Embedded records.
    #[serde(default, deserialize_with = "nullable")]
    pub features: Vec<RawFeature>,
}
