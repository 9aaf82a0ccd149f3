//! Place names from Nominatim (OpenStreetMap)
//!
//! Geocoding is cosmetic: every failure degrades to a fallback label or an empty result list
//! instead of an error.

use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::cache::{self, SharedStore};
use crate::config::GeocodingConfig;
use crate::models::LocationBucket;
use crate::{RahuError, Result, http};

/// Label used when reverse geocoding yields nothing usable
pub const FALLBACK_LABEL: &str = "Custom Location";

/// Shortest query sent to the search endpoint
pub const MIN_QUERY_LEN: usize = 3;

const SEARCH_LIMIT: usize = 5;

/// A place returned by name search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceMatch {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
}

/// Nominatim encodes coordinates as strings
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    display_name: String,
}

pub struct NominatimClient {
    client: ClientWithMiddleware,
    base_url: String,
    enabled: bool,
    store: SharedStore,
}

impl NominatimClient {
    pub fn new(config: &GeocodingConfig, store: SharedStore) -> Result<Self> {
        let client = http::build_client(&config.user_agent, Duration::from_secs(10), 1)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            enabled: config.enabled,
            store,
        })
    }

    /// `city_{lat}_{lng}`
    #[must_use]
    pub fn label_key(bucket: &LocationBucket) -> String {
        format!("city_{bucket}")
    }

    /// Human-readable name for a point, cached per bucket
    #[instrument(skip(self))]
    pub async fn resolve_label(&self, latitude: f64, longitude: f64) -> String {
        let key = Self::label_key(&LocationBucket::from_degrees(latitude, longitude));
        if let Some(label) = cache::get_json::<String>(self.store.as_ref(), &key).await {
            debug!("Label cache hit: {label}");
            return label;
        }
        if !self.enabled {
            return FALLBACK_LABEL.to_string();
        }

        match self.reverse(latitude, longitude).await {
            Ok(label) => {
                cache::put_json(self.store.as_ref(), &key, &label).await;
                label
            }
            Err(e) => {
                warn!("Reverse geocoding failed: {e}");
                FALLBACK_LABEL.to_string()
            }
        }
    }

    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<String> {
        let url = format!(
            "{}/reverse?format=json&lat={latitude}&lon={longitude}&zoom=10",
            self.base_url
        );
        let body = self.get_text(&url).await?;
        parse_reverse(&body)
    }

    /// Up to five places matching `query`. Short queries and failures yield no matches.
    #[instrument(skip(self))]
    pub async fn search_by_name(&self, query: &str) -> Vec<PlaceMatch> {
        let query = query.trim();
        if !self.enabled || query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }

        let url = format!(
            "{}/search?format=json&q={}&limit={SEARCH_LIMIT}&addressdetails=1",
            self.base_url,
            urlencoding::encode(query)
        );
        match self.get_text(&url).await.and_then(|body| parse_search(&body)) {
            Ok(matches) => {
                info!("Found {} places for '{query}'", matches.len());
                matches
            }
            Err(e) => {
                warn!("Place search for '{query}' failed: {e}");
                Vec::new()
            }
        }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        debug!("Calling Nominatim: {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RahuError::provider(format!("Nominatim responded with {status}")));
        }
        Ok(response.text().await?)
    }
}

/// Pick "City, State" out of a reverse geocoding payload
pub fn parse_reverse(body: &str) -> Result<String> {
    let response: ReverseResponse = serde_json::from_str(body)?;
    let Some(address) = response.address else {
        return Ok(FALLBACK_LABEL.to_string());
    };

    let city = [
        address.city,
        address.town,
        address.village,
        address.municipality,
        address.county,
    ]
    .into_iter()
    .flatten()
    .find(|name| !name.is_empty());

    let label = match (city, address.state.filter(|s| !s.is_empty())) {
        (Some(city), Some(state)) => format!("{city}, {state}"),
        (Some(city), None) => city,
        (None, _) => response
            .display_name
            .as_deref()
            .and_then(|name| name.split(',').next())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_LABEL)
            .to_string(),
    };
    Ok(label)
}

/// Decode search hits, skipping any whose coordinates do not parse
pub fn parse_search(body: &str) -> Result<Vec<PlaceMatch>> {
    let hits: Vec<SearchHit> = serde_json::from_str(body)?;
    Ok(hits
        .into_iter()
        .filter_map(|hit| {
            let latitude = hit.lat.parse().ok()?;
            let longitude = hit.lon.parse().ok()?;
            Some(PlaceMatch {
                latitude,
                longitude,
                display_name: hit.display_name,
            })
        })
        .take(SEARCH_LIMIT)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryKeyValueStore;
    use rstest::rstest;
    use std::sync::Arc;

    #[rstest]
    #[case(r#"{"address":{"city":"New Delhi","state":"Delhi"}}"#, "New Delhi, Delhi")]
    #[case(r#"{"address":{"town":"Manali","state":"Himachal Pradesh"}}"#, "Manali, Himachal Pradesh")]
    #[case(r#"{"address":{"village":"Hallstatt"}}"#, "Hallstatt")]
    #[case(r#"{"address":{"county":"Kerry","state":""}}"#, "Kerry")]
    #[case(
        r#"{"address":{"state":"Nunavut"},"display_name":"Qikiqtaaluk Region, Nunavut, Canada"}"#,
        "Qikiqtaaluk Region"
    )]
    #[case(r#"{"error":"Unable to geocode"}"#, FALLBACK_LABEL)]
    fn test_parse_reverse(#[case] body: &str, #[case] expected: &str) {
        assert_eq!(parse_reverse(body).unwrap(), expected);
    }

    #[test]
    fn test_parse_reverse_prefers_city_over_county() {
        let body = r#"{"address":{"county":"Gautam Buddha Nagar","city":"Noida","state":"Uttar Pradesh"}}"#;
        assert_eq!(parse_reverse(body).unwrap(), "Noida, Uttar Pradesh");
    }

    #[test]
    fn test_parse_search() {
        let body = r#"[
            {"lat":"51.5073219","lon":"-0.1276474","display_name":"London, Greater London, England, United Kingdom"},
            {"lat":"not-a-number","lon":"0","display_name":"Broken"},
            {"lat":"42.9832406","lon":"-81.243372","display_name":"London, Ontario, Canada"}
        ]"#;
        let matches = parse_search(body).unwrap();
        assert_eq!(matches.len(), 2);
        assert!((matches[0].latitude - 51.507_321_9).abs() < 1e-9);
        assert_eq!(matches[1].display_name, "London, Ontario, Canada");
    }

    #[test]
    fn test_parse_search_rejects_non_array() {
        assert!(parse_search(r#"{"error":"rate limited"}"#).is_err());
    }

    fn disabled_client(store: SharedStore) -> NominatimClient {
        let config = GeocodingConfig {
            enabled: false,
            ..GeocodingConfig::default()
        };
        NominatimClient::new(&config, store).unwrap()
    }

    #[tokio::test]
    async fn test_short_query_returns_nothing() {
        let config = GeocodingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..GeocodingConfig::default()
        };
        let client = NominatimClient::new(&config, Arc::new(MemoryKeyValueStore::new())).unwrap();
        assert!(client.search_by_name("ab").await.is_empty());
        assert!(client.search_by_name("  a ").await.is_empty());
    }

    #[tokio::test]
    async fn test_cached_label_is_served() {
        let store: SharedStore = Arc::new(MemoryKeyValueStore::new());
        let key = NominatimClient::label_key(&LocationBucket::from_degrees(28.6139, 77.209));
        assert_eq!(key, "city_28.614_77.209");
        cache::put_json(store.as_ref(), &key, "New Delhi, Delhi").await;

        let client = disabled_client(store);
        assert_eq!(client.resolve_label(28.61394, 77.20902).await, "New Delhi, Delhi");
        assert_eq!(client.resolve_label(10.0, 10.0).await, FALLBACK_LABEL);
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back() {
        let config = GeocodingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..GeocodingConfig::default()
        };
        let store = Arc::new(MemoryKeyValueStore::new());
        let client = NominatimClient::new(&config, store.clone()).unwrap();

        assert_eq!(client.resolve_label(1.0, 2.0).await, FALLBACK_LABEL);
        assert!(client.search_by_name("Bangalore").await.is_empty());
        assert!(store.is_empty());
    }
}
