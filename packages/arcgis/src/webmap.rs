//! Web map operational layer traversal.
//!
//! Walks the operational layer tree depth-first in document order. Each
//! node is classified into an [`OperationalNode`] and contributes zero or
//! more [`LayerDescriptor`]s to a shared accumulator. Failures inside the
//! walk never abort it; they are logged and the node is dropped.

use arcgis_export_arcgis_models::{LayerDescriptor, OperationalLayer, ServiceType};
use futures::future::{BoxFuture, FutureExt as _};

use crate::discover::{DiscoveryOptions, discover_service, service_layers};
use crate::normalize::{normalize, split_layer_id};
use crate::{ArcGisClient, ArcGisError};

/// Web map layer type of an explicit group node.
pub const GROUP_LAYER_TYPE: &str = "GroupLayer";

/// What an operational layer node refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationalNode<'a> {
    /// A group; recurse into the children.
    Group(&'a [OperationalLayer]),
    /// An inline feature collection (not exported).
    InlineCollection,
    /// A `FeatureServer`/`MapServer` URL, either a service or one layer.
    ServiceRef(&'a str),
    /// A reference to another portal item.
    ItemRef(&'a str),
    /// Anything else (basemaps, tiles, ...).
    Unrecognized,
}

impl<'a> OperationalNode<'a> {
    /// Classifies a node. The first matching rule wins.
    #[must_use]
    pub fn classify(layer: &'a OperationalLayer) -> Self {
        if layer.layer_type == GROUP_LAYER_TYPE || !layer.layers.is_empty() {
            Self::Group(&layer.layers)
        } else if layer
            .feature_collection
            .as_ref()
            .is_some_and(|collection| !collection.layers.is_empty())
        {
            Self::InlineCollection
        } else if !layer.url.is_empty() && ServiceType::from_url(&layer.url).is_some() {
            Self::ServiceRef(&layer.url)
        } else if !layer.item_id.is_empty() {
            Self::ItemRef(&layer.item_id)
        } else {
            Self::Unrecognized
        }
    }
}

/// Fetches a web map and returns every layer its operational layers
/// reference.
///
/// # Errors
///
/// Returns [`ArcGisError`] only if the web map document itself cannot be
/// fetched.
pub async fn discover_web_map(
    client: &ArcGisClient,
    item_id: &str,
    options: &DiscoveryOptions,
) -> Result<Vec<LayerDescriptor>, ArcGisError> {
    let web_map = client.fetch_web_map(item_id).await?;

    let walker = Walker {
        client,
        max_depth: options.max_depth,
    };
    let mut layers = Vec::new();
    for node in &web_map.operational_layers {
        walker.visit(node, &[], 0, &mut layers).await;
    }

    if layers.is_empty() {
        log::info!("No processable feature layers found in this web map");
    } else {
        log::info!("Found {} potential feature layer(s) in web map", layers.len());
    }

    Ok(layers)
}

struct Walker<'c> {
    client: &'c ArcGisClient,
    max_depth: usize,
}

impl Walker<'_> {
    fn visit<'a>(
        &'a self,
        node: &'a OperationalLayer,
        parent_path: &'a [String],
        depth: usize,
        out: &'a mut Vec<LayerDescriptor>,
    ) -> BoxFuture<'a, ()> {
        async move {
            let mut current_path = parent_path.to_vec();
            current_path.push(node.title.clone());
            let breadcrumb = current_path.join(" > ");

            if depth >= self.max_depth {
                log::warn!(
                    "Skipping '{breadcrumb}': web map nesting exceeds depth {}",
                    self.max_depth
                );
                return;
            }

            match OperationalNode::classify(node) {
                OperationalNode::Group(children) => {
                    log::info!("Processing group: {breadcrumb}");
                    for child in children {
                        self.visit(child, &current_path, depth + 1, out).await;
                    }
                }
                OperationalNode::InlineCollection => {
                    log::info!("Skipping inline feature collection: {breadcrumb}");
                }
                OperationalNode::ServiceRef(url) => {
                    self.service_ref(node, url, current_path, out).await;
                }
                OperationalNode::ItemRef(item_id) => {
                    log::info!("Processing item reference: {breadcrumb} (ID: {item_id})");
                    self.item_ref(item_id, &current_path, out).await;
                }
                OperationalNode::Unrecognized => {
                    log::info!(
                        "Skipping layer '{}': no URL, item ID, or feature collection",
                        node.title
                    );
                }
            }
        }
        .boxed()
    }

    async fn service_ref(
        &self,
        node: &OperationalLayer,
        url: &str,
        mut current_path: Vec<String>,
        out: &mut Vec<LayerDescriptor>,
    ) {
        let url = normalize(url);

        if let Some((service_url, layer_id)) = split_layer_id(&url) {
            log::info!(
                "Adding layer reference: {} (ID: {layer_id}) from service {service_url}",
                current_path.join(" > ")
            );
            // The node names the layer itself, so it is not its own ancestor.
            current_path.pop();
            let mut descriptor = LayerDescriptor::single(service_url, layer_id);
            if !node.title.is_empty() {
                descriptor.name.clone_from(&node.title);
            }
            descriptor.esri_type.clone_from(&node.layer_type);
            descriptor.parent_path = current_path;
            out.push(descriptor);
            return;
        }

        let Some(service_type) = ServiceType::from_url(&url) else {
            return;
        };
        log::info!(
            "Service URL found: {url} for layer {}. Fetching service layers...",
            node.title
        );
        match service_layers(self.client, &url, service_type).await {
            Ok(layers) => out.extend(layers.into_iter().map(|mut layer| {
                layer.parent_path.clone_from(&current_path);
                layer
            })),
            Err(e) => log::warn!("Failed to fetch layers for service {url}: {e}"),
        }
    }

    async fn item_ref(
        &self,
        item_id: &str,
        current_path: &[String],
        out: &mut Vec<LayerDescriptor>,
    ) {
        let item = match self.client.fetch_item(item_id).await {
            Ok(item) if !item.url.is_empty() => item,
            Ok(_) => {
                log::warn!("Referenced item {item_id} has no service URL");
                return;
            }
            Err(e) => {
                log::warn!("Failed to fetch referenced item {item_id}: {e}");
                return;
            }
        };
        log::info!(
            "Referenced item type: {}, URL: {}",
            item.item_type,
            item.url
        );

        let Some(service_type) = ServiceType::from_url(&item.url) else {
            log::warn!(
                "Referenced item {item_id} has unsupported service URL type: {}",
                item.url
            );
            return;
        };

        match discover_service(self.client, &item.url, service_type).await {
            Ok(layers) => out.extend(layers.into_iter().map(|mut layer| {
                let mut path = current_path.to_vec();
                path.append(&mut layer.parent_path);
                layer.parent_path = path;
                layer
            })),
            Err(e) => log::warn!(
                "Failed to fetch layers for referenced item service {}: {e}",
                item.url
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::DEFAULT_PORTAL_URL;
    use crate::discover::discover;
    use crate::transport::StaticTransport;

    const ITEM_PAGE: &str = "https://www.arcgis.com/home/item.html?id=beef01";
    const ITEM_URL: &str = "https://www.arcgis.com/sharing/rest/content/items/beef01?f=json";
    const DATA_URL: &str = "https://www.arcgis.com/sharing/rest/content/items/beef01/data?f=json";

    fn web_map_transport(operational_layers: serde_json::Value) -> StaticTransport {
        StaticTransport::new()
            .with(
                ITEM_URL,
                serde_json::json!({"id": "beef01", "type": "Web Map", "title": "City", "url": null}),
            )
            .with(
                DATA_URL,
                serde_json::json!({"operationalLayers": operational_layers}),
            )
    }

    async fn run(transport: StaticTransport, options: DiscoveryOptions) -> Vec<LayerDescriptor> {
        let client = ArcGisClient::with_transport(Arc::new(transport), DEFAULT_PORTAL_URL);
        discover(&client, ITEM_PAGE, &options).await.unwrap()
    }

    #[test]
    fn classifies_nodes_in_rule_order() {
        let group: OperationalLayer = serde_json::from_value(serde_json::json!({
            "title": "G",
            "url": "https://h/arcgis/rest/services/A/FeatureServer/0",
            "layers": [{"title": "child"}]
        }))
        .unwrap();
        assert!(matches!(OperationalNode::classify(&group), OperationalNode::Group(c) if c.len() == 1));

        let inline: OperationalLayer = serde_json::from_value(serde_json::json!({
            "title": "Notes",
            "featureCollection": {"layers": [{"id": 0, "featureSet": {"features": []}}]}
        }))
        .unwrap();
        assert_eq!(OperationalNode::classify(&inline), OperationalNode::InlineCollection);

        let tiles: OperationalLayer = serde_json::from_value(serde_json::json!({
            "title": "Imagery",
            "url": "https://tiles.example.com/{z}/{x}/{y}.png"
        }))
        .unwrap();
        assert_eq!(OperationalNode::classify(&tiles), OperationalNode::Unrecognized);

        let item: OperationalLayer =
            serde_json::from_value(serde_json::json!({"title": "Ref", "itemId": "abc"})).unwrap();
        assert_eq!(OperationalNode::classify(&item), OperationalNode::ItemRef("abc"));
    }

    #[tokio::test]
    async fn direct_layer_reference_excludes_own_title_from_path() {
        let transport = web_map_transport(serde_json::json!([
            {
                "title": "Infrastructure",
                "layerType": "GroupLayer",
                "layers": [
                    {
                        "title": "Hydrants",
                        "layerType": "ArcGISFeatureLayer",
                        "url": "https://h/arcgis/rest/services/Water/FeatureServer/2"
                    }
                ]
            }
        ]));

        let layers = run(transport, DiscoveryOptions::default()).await;

        assert_eq!(layers.len(), 1);
        let hydrants = &layers[0];
        assert_eq!(hydrants.name, "Hydrants");
        assert_eq!(hydrants.layer_id, "2");
        assert_eq!(
            hydrants.service_url,
            "https://h/ArcGIS/rest/services/Water/FeatureServer"
        );
        assert_eq!(hydrants.parent_path, ["Infrastructure"]);
    }

    #[tokio::test]
    async fn service_base_reference_tags_layers_with_current_path() {
        let transport = web_map_transport(serde_json::json!([
            {
                "title": "Transit",
                "url": "https://h/arcgis/rest/services/Transit/MapServer"
            },
            {"title": "Basemap"},
            {
                "title": "Sketches",
                "featureCollection": {"layers": [{"id": 0}]}
            }
        ]))
        .with(
            "https://h/ArcGIS/rest/services/Transit/MapServer/?f=json",
            serde_json::json!({
                "layers": [
                    {"id": 0, "name": "Routes", "type": "Group Layer", "parentLayerId": -1},
                    {"id": 1, "name": "Bus", "type": "Feature Layer", "parentLayerId": 0},
                    {"id": 2, "name": "Rail", "type": "Feature Layer", "parentLayerId": 0}
                ]
            }),
        );

        let layers = run(transport, DiscoveryOptions::default()).await;

        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Bus", "Rail"]);
        for layer in &layers {
            assert_eq!(layer.parent_path, ["Transit"]);
        }
    }

    #[tokio::test]
    async fn item_reference_prefixes_existing_ancestry() {
        let transport = web_map_transport(serde_json::json!([
            {
                "title": "Planning",
                "layers": [{"title": "Zoning", "itemId": "cafe02"}]
            }
        ]))
        .with(
            "https://www.arcgis.com/sharing/rest/content/items/cafe02?f=json",
            serde_json::json!({
                "id": "cafe02",
                "type": "Map Service",
                "url": "https://h/arcgis/rest/services/Zoning/MapServer"
            }),
        )
        .with(
            "https://h/ArcGIS/rest/services/Zoning/MapServer/?f=json",
            serde_json::json!({
                "layers": [
                    {"id": 0, "name": "Districts", "type": "Group Layer", "parentLayerId": -1},
                    {"id": 1, "name": "Overlay", "type": "Feature Layer", "parentLayerId": 0}
                ]
            }),
        );

        let layers = run(transport, DiscoveryOptions::default()).await;

        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].parent_path, ["Planning", "Zoning", "Districts"]);
    }

    #[tokio::test]
    async fn failed_references_are_skipped() {
        let transport = web_map_transport(serde_json::json!([
            {"title": "Gone", "url": "https://h/arcgis/rest/services/Gone/FeatureServer"},
            {"title": "Missing item", "itemId": "dead03"},
            {"title": "Kept", "url": "https://h/arcgis/rest/services/Kept/FeatureServer/0"}
        ]));

        let layers = run(transport, DiscoveryOptions::default()).await;

        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "Kept");
    }

    #[tokio::test]
    async fn depth_cap_stops_runaway_nesting() {
        let mut node = serde_json::json!({
            "title": "Leaf",
            "url": "https://h/arcgis/rest/services/Deep/FeatureServer/0"
        });
        for level in 0..5 {
            node = serde_json::json!({"title": format!("G{level}"), "layers": [node]});
        }

        let shallow = run(
            web_map_transport(serde_json::json!([node.clone()])),
            DiscoveryOptions { max_depth: 3 },
        )
        .await;
        assert!(shallow.is_empty());

        let deep = run(
            web_map_transport(serde_json::json!([node])),
            DiscoveryOptions::default(),
        )
        .await;
        assert_eq!(deep.len(), 1);
        assert_eq!(deep[0].parent_path.len(), 5);
    }
}
