//! URL normalization and classification.
//!
//! Service URLs are canonicalized so that the same layer always produces
//! the same [`LayerKey`](crate::LayerKey) regardless of how the user typed
//! it: scheme added, well-known path segments re-cased, the `f` format
//! parameter removed, and the trailing slash forced on base service URLs
//! and stripped everywhere else.

use arcgis_export_arcgis_models::{ResourceKind, ServiceType};
use regex::Regex;
use url::Url;

/// Path token identifying an `ArcGIS` Online item page.
pub const ITEM_PAGE_TOKEN: &str = "arcgis.com/home/item.html";

/// Returns `true` if the URL points into an `ArcGIS` REST services tree.
#[must_use]
pub fn is_service_url(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    lower.contains("/rest/services") || lower.contains("/arcgis/rest")
}

/// Returns `true` if the URL is an `ArcGIS` Online item page.
#[must_use]
pub fn is_online_item_url(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains(ITEM_PAGE_TOKEN)
}

/// Returns `true` if the URL parses and its scheme is `http` or `https`.
#[must_use]
pub fn is_valid_http_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn has_scheme(raw: &str) -> bool {
    raw.contains("://")
}

fn looks_host_like(raw: &str) -> bool {
    raw.contains('.') && !raw.contains(' ') && !raw.starts_with('/')
}

fn canonical_segment(segment: &str) -> Option<&'static str> {
    match segment.to_ascii_lowercase().as_str() {
        "arcgis" => Some("ArcGIS"),
        "rest" => Some("rest"),
        "services" => Some("services"),
        "featureserver" => Some("FeatureServer"),
        "mapserver" => Some("MapServer"),
        _ => None,
    }
}

/// Canonicalizes a raw resource reference.
///
/// Non-service, non-item references only gain an `https://` scheme when
/// they look like a bare host. Item pages gain a scheme and are otherwise
/// left alone. Service URLs are fully canonicalized. A reference that
/// cannot be parsed is returned unchanged.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let service = is_service_url(raw);

    if !service && !is_online_item_url(raw) {
        if !has_scheme(raw) && looks_host_like(raw) {
            return format!("https://{raw}");
        }
        return raw.to_string();
    }

    let with_scheme = if has_scheme(raw) {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    if !service {
        return with_scheme;
    }

    let mut url = match Url::parse(&with_scheme) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Failed to parse URL for normalization: {e}");
            return raw.to_string();
        }
    };

    let segments: Vec<String> = url
        .path()
        .trim_matches('/')
        .split('/')
        .map(|segment| {
            canonical_segment(segment).map_or_else(|| segment.to_string(), str::to_string)
        })
        .collect();

    let is_base_service = segments
        .last()
        .is_some_and(|last| last == "FeatureServer" || last == "MapServer");

    let mut path = format!("/{}", segments.join("/"));
    if is_base_service {
        path.push('/');
    }
    url.set_path(&path);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "f")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&kept);
        }
    }

    url.to_string()
}

/// Splits a trailing numeric layer ID off a URL.
///
/// Returns `(service_url, layer_id)` when the last `/`-separated segment
/// is a non-negative integer.
#[must_use]
pub fn split_layer_id(url: &str) -> Option<(&str, &str)> {
    let (base, last) = url.rsplit_once('/')?;
    if last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, last))
}

/// Classifies a normalized URL.
///
/// Item pages win over everything else. A service URL with a trailing
/// numeric segment is a single layer, for `FeatureServer` and `MapServer`
/// alike. Anything that is neither an item nor a service is assumed to be
/// a single layer URL.
#[must_use]
pub fn classify(url: &str) -> ResourceKind {
    if is_online_item_url(url) {
        return ResourceKind::OnlineItem;
    }
    match ServiceType::from_url(url) {
        Some(_) if split_layer_id(url).is_some() => ResourceKind::SingleLayer,
        Some(service_type) => service_type.into(),
        None => ResourceKind::SingleLayer,
    }
}

/// Extracts the item ID from an item page URL (`id=<hex>`).
#[must_use]
pub fn extract_item_id(url: &str) -> Option<String> {
    let re = Regex::new(r"id=([a-f0-9]+)").unwrap_or_else(|_| unreachable!());
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
