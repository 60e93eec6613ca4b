//! Layer discovery.
//!
//! [`discover`] dispatches on the [`ResourceKind`] of a normalized URL and
//! returns every feature layer reachable from it, in document order.
//! Duplicates are not removed here; the selection stage keys its work set
//! by [`LayerKey`](arcgis_export_arcgis_models::LayerKey).

use std::collections::HashMap;

use arcgis_export_arcgis_models::{
    FEATURE_LAYER_TYPE, FeatureServerMetadata, LayerDescriptor, MapServiceLayer,
    MapServiceMetadata, NO_PARENT_LAYER, ResourceKind, ServiceType, parse_layer_id,
};

use crate::normalize::{classify, extract_item_id, normalize, split_layer_id};
use crate::{ArcGisClient, ArcGisError, webmap};

/// Default cap on web map nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Tuning for discovery.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    /// Web map nodes nested deeper than this are skipped with a warning.
    pub max_depth: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Enumerates the feature layers reachable from `url`.
///
/// `url` is expected to be normalized already.
///
/// # Errors
///
/// Returns [`ArcGisError`] if a top-level metadata fetch fails, the URL
/// cannot be interpreted, or an item has an unsupported type. Failures
/// inside a web map walk are logged and skipped instead.
pub async fn discover(
    client: &ArcGisClient,
    url: &str,
    options: &DiscoveryOptions,
) -> Result<Vec<LayerDescriptor>, ArcGisError> {
    match classify(url) {
        ResourceKind::OnlineItem => {
            log::info!("Detected ArcGIS Online item URL");
            discover_item(client, url, options).await
        }
        ResourceKind::MapServer => {
            log::info!("Detected Map Server URL");
            service_layers(client, url, ServiceType::MapServer).await
        }
        ResourceKind::FeatureServer => {
            log::info!("Detected Feature Server URL");
            service_layers(client, url, ServiceType::FeatureServer).await
        }
        ResourceKind::SingleLayer => {
            log::info!("Processing as single layer URL");
            single_layer(url).map(|descriptor| vec![descriptor])
        }
    }
}

/// Builds the descriptor for a single layer URL without a round-trip.
///
/// The last path segment is the layer ID and everything before it is the
/// service URL.
///
/// # Errors
///
/// Returns [`ArcGisError::Validation`] if the URL has fewer than two
/// segments.
pub fn single_layer(url: &str) -> Result<LayerDescriptor, ArcGisError> {
    let (service_url, layer_id) = split_layer_id(url)
        .or_else(|| url.rsplit_once('/'))
        .filter(|(base, id)| !base.is_empty() && !id.is_empty())
        .ok_or_else(|| ArcGisError::Validation {
            message: format!("Invalid single layer URL format: {url}"),
        })?;

    Ok(LayerDescriptor::single(service_url, layer_id))
}

/// Discovers layers of a service URL that may still carry a trailing
/// layer ID.
///
/// # Errors
///
/// Returns [`ArcGisError`] if the service metadata fetch fails.
pub async fn discover_service(
    client: &ArcGisClient,
    url: &str,
    service_type: ServiceType,
) -> Result<Vec<LayerDescriptor>, ArcGisError> {
    let url = normalize(url);
    if split_layer_id(&url).is_some() {
        return single_layer(&url).map(|descriptor| vec![descriptor]);
    }
    service_layers(client, &url, service_type).await
}

/// Fetches and flattens the layers of a `FeatureServer` or `MapServer`.
///
/// # Errors
///
/// Returns [`ArcGisError`] if the service metadata fetch fails.
pub async fn service_layers(
    client: &ArcGisClient,
    service_url: &str,
    service_type: ServiceType,
) -> Result<Vec<LayerDescriptor>, ArcGisError> {
    let layers = match service_type {
        ServiceType::FeatureServer => {
            let metadata = client.fetch_feature_server(service_url).await?;
            feature_server_layers(service_url, &metadata)
        }
        ServiceType::MapServer => {
            let metadata = client.fetch_map_server(service_url).await?;
            map_server_layers(service_url, &metadata)
        }
    };

    if layers.is_empty() {
        log::info!("No processable feature layers found in {service_type} at {service_url}");
    } else {
        log::info!(
            "Found {} potential feature layer(s) in {service_type}",
            layers.len()
        );
    }

    Ok(layers)
}

/// One descriptor per declared layer; tables are ignored.
///
/// Layers whose ID is not a non-negative integer are skipped with a
/// warning.
#[must_use]
pub fn feature_server_layers(
    service_url: &str,
    metadata: &FeatureServerMetadata,
) -> Vec<LayerDescriptor> {
    let service_url = service_url.trim_end_matches('/');

    if metadata.layers.is_empty() && metadata.tables.is_empty() {
        log::info!("No layers or tables found in Feature Server metadata at {service_url}");
    }

    metadata
        .layers
        .iter()
        .filter_map(|layer| {
            let Some(layer_id) = parse_layer_id(&layer.id) else {
                log::warn!("Could not parse layer ID {} for {}", layer.id, layer.name);
                return None;
            };
            Some(LayerDescriptor {
                service_url: service_url.to_string(),
                layer_id,
                name: layer.name.clone(),
                esri_type: layer.esri_type.clone(),
                geometry_type: layer.geometry_type.clone(),
                parent_path: Vec::new(),
                is_feature_layer: true,
            })
        })
        .collect()
}

/// One descriptor per `"Feature Layer"` entry, each carrying the names of
/// its ancestors.
#[must_use]
pub fn map_server_layers(service_url: &str, metadata: &MapServiceMetadata) -> Vec<LayerDescriptor> {
    let service_url = service_url.trim_end_matches('/');
    let by_id: HashMap<i64, &MapServiceLayer> =
        metadata.layers.iter().map(|layer| (layer.id, layer)).collect();
    let mut memo: HashMap<i64, Vec<String>> = HashMap::new();

    let mut descriptors = Vec::new();
    for layer in &metadata.layers {
        if layer.esri_type != FEATURE_LAYER_TYPE {
            log::debug!(
                "Skipping layer '{}' (ID: {}) - type is '{}'",
                layer.name,
                layer.id,
                layer.esri_type
            );
            continue;
        }

        let mut parent_path = layer_path(layer.id, &by_id, &mut memo);
        parent_path.pop();

        descriptors.push(LayerDescriptor {
            service_url: service_url.to_string(),
            layer_id: layer.id.to_string(),
            name: layer.name.clone(),
            esri_type: layer.esri_type.clone(),
            geometry_type: layer.geometry_type.clone(),
            parent_path,
            is_feature_layer: true,
        });
    }

    descriptors
}

/// Names from the root down to (and including) `layer_id`.
///
/// An empty placeholder is memoized before recursing so a malformed
/// `parentLayerId` cycle ends instead of looping.
fn layer_path(
    layer_id: i64,
    by_id: &HashMap<i64, &MapServiceLayer>,
    memo: &mut HashMap<i64, Vec<String>>,
) -> Vec<String> {
    if let Some(path) = memo.get(&layer_id) {
        return path.clone();
    }
    let Some(layer) = by_id.get(&layer_id) else {
        return Vec::new();
    };

    memo.insert(layer_id, Vec::new());

    let mut path = if layer.parent_layer_id == NO_PARENT_LAYER {
        Vec::new()
    } else {
        layer_path(layer.parent_layer_id, by_id, memo)
    };
    path.push(layer.name.clone());

    memo.insert(layer_id, path.clone());
    path
}

async fn discover_item(
    client: &ArcGisClient,
    url: &str,
    options: &DiscoveryOptions,
) -> Result<Vec<LayerDescriptor>, ArcGisError> {
    let item_id = extract_item_id(url).ok_or_else(|| ArcGisError::Validation {
        message: format!("Could not extract item ID from URL: {url}"),
    })?;
    log::info!("Item ID: {item_id}");

    let item = client.fetch_item(&item_id).await?;
    log::info!("Item type: {}", item.item_type);

    match item.item_type.as_str() {
        "Feature Service" | "Map Service" => {
            let service_type = if item.item_type == "Feature Service" {
                ServiceType::FeatureServer
            } else {
                ServiceType::MapServer
            };
            if item.url.is_empty() {
                return Err(ArcGisError::Validation {
                    message: format!("{} item has no URL", item.item_type),
                });
            }
            discover_service(client, &item.url, service_type).await
        }
        "Web Map" => {
            let web_map_id = if item.id.is_empty() {
                item_id.as_str()
            } else {
                item.id.as_str()
            };
            webmap::discover_web_map(client, web_map_id, options).await
        }
        other => Err(ArcGisError::Validation {
            message: format!(
                "Unsupported item type: {other}. Supported types are Feature Service, \
                 Map Service, and Web Map"
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::DEFAULT_PORTAL_URL;
    use crate::transport::StaticTransport;

    const FEATURE_SERVER: &str = "https://h/ArcGIS/rest/services/City/FeatureServer/";
    const MAP_SERVER: &str = "https://h/ArcGIS/rest/services/City/MapServer/";

    fn client(transport: StaticTransport) -> ArcGisClient {
        ArcGisClient::with_transport(Arc::new(transport), DEFAULT_PORTAL_URL)
    }

    fn map_server_doc() -> serde_json::Value {
        serde_json::json!({
            "layers": [
                {"id": 0, "name": "Utilities", "type": "Group Layer", "parentLayerId": -1, "subLayerIds": [1, 2]},
                {"id": 1, "name": "Water", "type": "Group Layer", "parentLayerId": 0, "subLayerIds": [3]},
                {"id": 2, "name": "Poles", "type": "Feature Layer", "parentLayerId": 0, "subLayerIds": null},
                {"id": 3, "name": "Mains", "type": "Feature Layer", "parentLayerId": 1, "subLayerIds": null},
                {"id": 4, "name": "Parcels", "type": "Feature Layer", "parentLayerId": -1, "subLayerIds": null}
            ]
        })
    }

    #[tokio::test]
    async fn feature_server_lists_layers_and_skips_bad_ids() {
        let transport = StaticTransport::new().with(
            format!("{FEATURE_SERVER}?f=json"),
            serde_json::json!({
                "layers": [
                    {"id": 0, "name": "Roads", "type": "Feature Layer", "geometryType": "esriGeometryPolyline"},
                    {"id": "x", "name": "Broken"},
                    {"id": 1, "name": "Rivers", "type": "Feature Layer"}
                ],
                "tables": [{"id": 2, "name": "Owners"}]
            }),
        );

        let layers = discover(&client(transport), FEATURE_SERVER, &DiscoveryOptions::default())
            .await
            .unwrap();

        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Roads", "Rivers"]);
        assert_eq!(
            layers[0].service_url,
            "https://h/ArcGIS/rest/services/City/FeatureServer"
        );
        assert_eq!(layers[1].layer_id, "1");
    }

    #[tokio::test]
    async fn map_server_yields_only_feature_layers_with_paths() {
        let transport =
            StaticTransport::new().with(format!("{MAP_SERVER}?f=json"), map_server_doc());

        let layers = discover(&client(transport), MAP_SERVER, &DiscoveryOptions::default())
            .await
            .unwrap();

        assert_eq!(layers.len(), 3);
        let poles = &layers[0];
        assert_eq!(poles.name, "Poles");
        assert_eq!(poles.parent_path, ["Utilities"]);
        let mains = &layers[1];
        assert_eq!(mains.parent_path, ["Utilities", "Water"]);
        assert_eq!(mains.breadcrumb().as_deref(), Some("Utilities > Water"));
        assert!(layers[2].parent_path.is_empty());
    }

    #[test]
    fn map_server_parent_cycle_terminates() {
        let metadata: MapServiceMetadata = serde_json::from_value(serde_json::json!({
            "layers": [
                {"id": 0, "name": "A", "type": "Group Layer", "parentLayerId": 1},
                {"id": 1, "name": "B", "type": "Group Layer", "parentLayerId": 0},
                {"id": 2, "name": "Leaf", "type": "Feature Layer", "parentLayerId": 0}
            ]
        }))
        .unwrap();

        let layers = map_server_layers(MAP_SERVER, &metadata);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].parent_path, ["B", "A"]);
    }

    #[tokio::test]
    async fn single_layer_needs_no_round_trip() {
        let transport = StaticTransport::new();
        let client = ArcGisClient::with_transport(Arc::new(transport.clone()), DEFAULT_PORTAL_URL);

        let layers = discover(
            &client,
            "https://h/ArcGIS/rest/services/City/FeatureServer/7",
            &DiscoveryOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].layer_id, "7");
        assert_eq!(layers[0].name, "Layer_7");
        assert_eq!(
            layers[0].service_url,
            "https://h/ArcGIS/rest/services/City/FeatureServer"
        );
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn single_layer_requires_two_segments() {
        assert!(matches!(
            single_layer("layer"),
            Err(ArcGisError::Validation { .. })
        ));
        let descriptor = single_layer("https://example.com/data/roads").unwrap();
        assert_eq!(descriptor.layer_id, "roads");
        assert_eq!(descriptor.service_url, "https://example.com/data");
    }

    #[tokio::test]
    async fn feature_service_item_delegates_to_service() {
        let transport = StaticTransport::new()
            .with(
                "https://www.arcgis.com/sharing/rest/content/items/abc123?f=json",
                serde_json::json!({
                    "id": "abc123",
                    "type": "Feature Service",
                    "url": "https://h/arcgis/rest/services/City/FeatureServer"
                }),
            )
            .with(
                format!("{FEATURE_SERVER}?f=json"),
                serde_json::json!({"layers": [{"id": 0, "name": "Roads"}]}),
            );

        let layers = discover(
            &client(transport),
            "https://www.arcgis.com/home/item.html?id=abc123",
            &DiscoveryOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "Roads");
    }

    #[tokio::test]
    async fn unsupported_item_type_is_validation_error() {
        let transport = StaticTransport::new().with(
            "https://www.arcgis.com/sharing/rest/content/items/abc123?f=json",
            serde_json::json!({"id": "abc123", "type": "PDF"}),
        );

        let err = discover(
            &client(transport),
            "https://www.arcgis.com/home/item.html?id=abc123",
            &DiscoveryOptions::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ArcGisError::Validation { ref message } if message.contains("PDF")));
    }

    #[tokio::test]
    async fn service_error_is_fatal_at_top_level() {
        let transport = StaticTransport::new().with(
            format!("{FEATURE_SERVER}?f=json"),
            serde_json::json!({"error": {"code": 499, "message": "Token Required"}}),
        );

        let err = discover(&client(transport), FEATURE_SERVER, &DiscoveryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ArcGisError::Service { .. }));
    }
}
