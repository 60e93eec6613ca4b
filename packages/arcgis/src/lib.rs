#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `ArcGIS` REST client and layer discovery.
//!
//! Turns a user-supplied reference (a layer URL, a `FeatureServer`, a
//! `MapServer`, or an `ArcGIS` Online item page) into a flat list of
//! [`LayerDescriptor`]s:
//!
//! 1. [`normalize::normalize`] canonicalizes the URL.
//! 2. [`normalize::classify`] decides which [`ResourceKind`] it is.
//! 3. [`discover::discover`] enumerates every reachable feature layer,
//!    walking web map operational layer trees via [`webmap`].
//!
//! All network access goes through the [`Transport`] trait so discovery
//! can be exercised offline with a [`StaticTransport`].

pub mod client;
pub mod discover;
pub mod normalize;
pub mod transport;
pub mod webmap;

pub use arcgis_export_arcgis_models::{LayerDescriptor, LayerKey, ResourceKind, ServiceType};
pub use client::{ArcGisClient, ClientOptions};
pub use discover::{DiscoveryOptions, discover};
pub use transport::{HttpTransport, StaticTransport, Transport};

/// Errors that can occur while talking to an `ArcGIS` server.
#[derive(Debug, thiserror::Error)]
pub enum ArcGisError {
    /// The request did not complete within the configured timeout.
    #[error("Request timed out fetching {url}")]
    Timeout {
        /// Requested URL.
        url: String,
    },

    /// The request failed before a response was received.
    #[error("Failed to fetch {url}: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying transport error.
        message: String,
    },

    /// The server answered with a status other than 200.
    #[error("Received non-OK HTTP status {status} from {url}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded into the expected document.
    #[error("Failed to parse JSON from {url}: {source}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoding error.
        source: serde_json::Error,
    },

    /// The server returned a structured `error` payload.
    #[error("ArcGIS API error from {url}: {message}")]
    Service {
        /// Requested URL.
        url: String,
        /// Message reported by the server.
        message: String,
    },

    /// The input reference or a referenced item cannot be handled.
    #[error("{message}")]
    Validation {
        /// Description of what is wrong.
        message: String,
    },

    /// A feature query returned no records and no transfer-limit flag.
    #[error("No features found for layer {layer_id} at {service_url}")]
    NoFeatures {
        /// Service the layer belongs to.
        service_url: String,
        /// Queried layer ID.
        layer_id: String,
    },
}

impl ArcGisError {
    /// Whether this error happened below the REST layer (connection,
    /// timeout, or non-OK status).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transport { .. } | Self::HttpStatus { .. }
        )
    }
}
