//! Typed access to `ArcGIS` REST documents.

use std::sync::Arc;
use std::time::Duration;

use arcgis_export_arcgis_models::{
    ApiDocument, FeatureQueryResponse, FeatureServerMetadata, ItemData, LayerMetadata,
    MapServiceMetadata, RawFeature, WebMapData,
};
use serde::de::DeserializeOwned;

use crate::ArcGisError;
use crate::transport::{HttpTransport, Transport};

/// Default portal root used for item lookups.
pub const DEFAULT_PORTAL_URL: &str = "https://www.arcgis.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`ArcGisClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Portal root for item and web map lookups.
    pub portal_url: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            portal_url: DEFAULT_PORTAL_URL.to_string(),
        }
    }
}

/// Appends `f=json` to a URL, respecting an existing query string.
fn with_json_format(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}f=json")
}

/// `{service}?f=json`.
#[must_use]
pub fn service_metadata_url(service_url: &str) -> String {
    with_json_format(service_url)
}

/// `{service}/{layer}?f=json`.
#[must_use]
pub fn layer_metadata_url(service_url: &str, layer_id: &str) -> String {
    format!("{}/{layer_id}?f=json", service_url.trim_end_matches('/'))
}

/// Feature query for every record of a layer, geometry in WGS84.
#[must_use]
pub fn feature_query_url(service_url: &str, layer_id: &str) -> String {
    format!(
        "{}/{layer_id}/query\
         ?f=json\
         &where=1%3D1\
         &outFields=*\
         &returnGeometry=true\
         &outSR=4326",
        service_url.trim_end_matches('/')
    )
}

/// Thin typed client over a [`Transport`].
#[derive(Clone)]
pub struct ArcGisClient {
    transport: Arc<dyn Transport>,
    portal_url: String,
}

impl std::fmt::Debug for ArcGisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArcGisClient")
            .field("portal_url", &self.portal_url)
            .finish_non_exhaustive()
    }
}

impl ArcGisClient {
    /// Creates an HTTP-backed client.
    ///
    /// # Errors
    ///
    /// Returns [`ArcGisError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(options: &ClientOptions) -> Result<Self, ArcGisError> {
        let transport = HttpTransport::new(options.timeout)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            options.portal_url.as_str(),
        ))
    }

    /// Creates a client over an arbitrary transport.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>, portal_url: &str) -> Self {
        Self {
            transport,
            portal_url: portal_url.trim_end_matches('/').to_string(),
        }
    }

    /// Portal root without a trailing slash.
    #[must_use]
    pub fn portal_url(&self) -> &str {
        &self.portal_url
    }

    /// `{portal}/sharing/rest/content/items/{id}?f=json`.
    #[must_use]
    pub fn item_url(&self, item_id: &str) -> String {
        format!(
            "{}/sharing/rest/content/items/{item_id}?f=json",
            self.portal_url
        )
    }

    /// `{portal}/sharing/rest/content/items/{id}/data?f=json`.
    #[must_use]
    pub fn item_data_url(&self, item_id: &str) -> String {
        format!(
            "{}/sharing/rest/content/items/{item_id}/data?f=json",
            self.portal_url
        )
    }

    /// Fetches `url` and decodes it as `T`, surfacing an embedded `error`
    /// payload as [`ArcGisError::Service`].
    async fn fetch_document<T>(&self, url: &str) -> Result<T, ArcGisError>
    where
        T: DeserializeOwned + ApiDocument,
    {
        let value = self.transport.get_json(url).await?;
        let document: T = serde_json::from_value(value).map_err(|source| ArcGisError::Decode {
            url: url.to_string(),
            source,
        })?;

        if let Some(error) = document.api_error() {
            return Err(ArcGisError::Service {
                url: url.to_string(),
                message: error.message.clone(),
            });
        }

        Ok(document)
    }

    /// Fetches `FeatureServer` metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ArcGisError`] if the request, decoding, or the service
    /// itself fails.
    pub async fn fetch_feature_server(
        &self,
        service_url: &str,
    ) -> Result<FeatureServerMetadata, ArcGisError> {
        let url = service_metadata_url(service_url);
        log::info!("Fetching service metadata: {url}");
        self.fetch_document(&url).await
    }

    /// Fetches `MapServer` metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ArcGisError`] if the request, decoding, or the service
    /// itself fails.
    pub async fn fetch_map_server(
        &self,
        service_url: &str,
    ) -> Result<MapServiceMetadata, ArcGisError> {
        let url = service_metadata_url(service_url);
        log::info!("Fetching service metadata: {url}");
        self.fetch_document(&url).await
    }

    /// Fetches metadata (name, renderer) for a single layer.
    ///
    /// # Errors
    ///
    /// Returns [`ArcGisError`] if the request, decoding, or the service
    /// itself fails.
    pub async fn fetch_layer_metadata(
        &self,
        service_url: &str,
        layer_id: &str,
    ) -> Result<LayerMetadata, ArcGisError> {
        let url = layer_metadata_url(service_url, layer_id);
        log::debug!("Fetching layer metadata: {url}");
        self.fetch_document(&url).await
    }

    /// Fetches `ArcGIS` Online item metadata.
    ///
    /// # Errors
    ///
    /// Returns [`ArcGisError`] if the request, decoding, or the portal
    /// itself fails.
    pub async fn fetch_item(&self, item_id: &str) -> Result<ItemData, ArcGisError> {
        let url = self.item_url(item_id);
        log::debug!("Fetching item metadata: {url}");
        self.fetch_document(&url).await
    }

    /// Fetches a web map's operational layer document.
    ///
    /// # Errors
    ///
    /// Returns [`ArcGisError`] if the request, decoding, or the portal
    /// itself fails.
    pub async fn fetch_web_map(&self, item_id: &str) -> Result<WebMapData, ArcGisError> {
        let url = self.item_data_url(item_id);
        log::info!("Fetching web map data: {url}");
        self.fetch_document(&url).await
    }

    /// Fetches every record of a layer in a single query.
    ///
    /// A truncated result (`exceededTransferLimit`) is logged and returned
    /// as-is. An empty result without that flag is
    /// [`ArcGisError::NoFeatures`].
    ///
    /// # Errors
    ///
    /// Returns [`ArcGisError`] if the request, decoding, or the service
    /// itself fails, or if no features come back.
    pub async fn fetch_features(
        &self,
        service_url: &str,
        layer_id: &str,
    ) -> Result<Vec<RawFeature>, ArcGisError> {
        let url = feature_query_url(service_url, layer_id);
        log::info!("Fetching features: {url}");

        let response: FeatureQueryResponse = self.fetch_document(&url).await?;

        if response.exceeded_transfer_limit {
            log::warn!(
                "Feature transfer limit exceeded for layer {layer_id}. Results may be incomplete."
            );
        } else if response.features.is_empty() {
            return Err(ArcGisError::NoFeatures {
                service_url: service_url.trim_end_matches('/').to_string(),
                layer_id: layer_id.to_string(),
            });
        }

        Ok(response.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::StaticTransport;

    const SERVICE: &str = "https://h/ArcGIS/rest/services/A/FeatureServer";

    fn client(transport: StaticTransport) -> ArcGisClient {
        ArcGisClient::with_transport(Arc::new(transport), DEFAULT_PORTAL_URL)
    }

    #[test]
    fn builds_request_urls() {
        assert_eq!(
            service_metadata_url("https://h/ArcGIS/rest/services/A/FeatureServer/"),
            "https://h/ArcGIS/rest/services/A/FeatureServer/?f=json"
        );
        assert_eq!(
            service_metadata_url("https://h/ArcGIS/rest/services/A/FeatureServer/?token=1"),
            "https://h/ArcGIS/rest/services/A/FeatureServer/?token=1&f=json"
        );
        assert_eq!(
            layer_metadata_url("https://h/ArcGIS/rest/services/A/FeatureServer/", "3"),
            "https://h/ArcGIS/rest/services/A/FeatureServer/3?f=json"
        );
        assert_eq!(
            feature_query_url(SERVICE, "0"),
            "https://h/ArcGIS/rest/services/A/FeatureServer/0/query?f=json&where=1%3D1&outFields=*&returnGeometry=true&outSR=4326"
        );

        let client = client(StaticTransport::new());
        assert_eq!(
            client.item_url("abc"),
            "https://www.arcgis.com/sharing/rest/content/items/abc?f=json"
        );
        assert_eq!(
            client.item_data_url("abc"),
            "https://www.arcgis.com/sharing/rest/content/items/abc/data?f=json"
        );
    }

    #[tokio::test]
    async fn embedded_error_becomes_service_error() {
        let transport = StaticTransport::new().with(
            layer_metadata_url(SERVICE, "0"),
            serde_json::json!({"error": {"code": 400, "message": "Invalid layer"}}),
        );

        let err = client(transport)
            .fetch_layer_metadata(SERVICE, "0")
            .await
            .unwrap_err();
        assert!(
            matches!(err, ArcGisError::Service { ref message, .. } if message == "Invalid layer")
        );
    }

    #[tokio::test]
    async fn malformed_document_is_decode_error() {
        let transport = StaticTransport::new().with(
            feature_query_url(SERVICE, "0"),
            serde_json::json!({"features": "nope"}),
        );

        let err = client(transport)
            .fetch_features(SERVICE, "0")
            .await
            .unwrap_err();
        assert!(matches!(err, ArcGisError::Decode { .. }));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn empty_result_is_no_features_unless_truncated() {
        let transport = StaticTransport::new()
            .with(
                feature_query_url(SERVICE, "0"),
                serde_json::json!({"features": []}),
            )
            .with(
                feature_query_url(SERVICE, "1"),
                serde_json::json!({"features": [], "exceededTransferLimit": true}),
            );
        let client = client(transport);

        let err = client.fetch_features(SERVICE, "0").await.unwrap_err();
        assert!(matches!(err, ArcGisError::NoFeatures { ref layer_id, .. } if layer_id == "0"));

        let features = client.fetch_features(SERVICE, "1").await.unwrap();
        assert!(features.is_empty());
    }

    #[tokio::test]
    async fn truncated_result_is_returned() {
        let transport = StaticTransport::new().with(
            feature_query_url(SERVICE, "2"),
            serde_json::json!({
                "features": [{"attributes": {"OBJECTID": 1}, "geometry": {"x": 1.0, "y": 2.0}}],
                "exceededTransferLimit": true
            }),
        );

        let features = client(transport)
            .fetch_features(SERVICE, "2")
            .await
            .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].attributes["OBJECTID"], 1);
    }

    #[tokio::test]
    async fn missing_document_is_transport_category() {
        let err = client(StaticTransport::new())
            .fetch_item("abc")
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
