//! Standard GBFS HTTP feed client
//!
//! Issues authenticated HTTPS GETs against a vendor's GBFS root and decodes
//! the three feed pages. Timeouts are enforced here so a hung feed fails the
//! whole run instead of blocking it.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::FeedError;
use crate::feed::gbfs::{FreeBikeStatusDoc, GeofencingZonesDoc, VehicleTypesDoc};
use crate::feed::FeedClient;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Standard GBFS feed client configuration
#[derive(Debug, Clone)]
pub struct GbfsClientConfig {
    /// Feed root, e.g. `https://gbfs.example.com/gbfs/2.3/pdx/en`
    pub feed_root: String,
    /// Bearer token, when the vendor requires authentication
    pub auth_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GbfsClientConfig {
    /// Create a config for an unauthenticated feed with the default timeout
    pub fn new(feed_root: impl Into<String>) -> Self {
        Self {
            feed_root: feed_root.into(),
            auth_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the bearer token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// HTTP client for standard GBFS feeds
#[derive(Debug)]
pub struct GbfsFeedClient {
    client: Client,
    config: GbfsClientConfig,
}

impl GbfsFeedClient {
    /// Create a new GBFS feed client
    pub fn new(config: GbfsClientConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    async fn fetch_page<T: DeserializeOwned>(&self, page: &str) -> Result<T, FeedError> {
        let url = format!("{}/{}", self.config.feed_root.trim_end_matches('/'), page);

        debug!(url = url, "Fetching feed page");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout
            } else if e.is_connect() {
                FeedError::ConnectionRefused
            } else {
                FeedError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FeedError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl FeedClient for GbfsFeedClient {
    async fn fetch_geofencing_zones(&self) -> Result<GeofencingZonesDoc, FeedError> {
        self.fetch_page("geofencing_zones.json").await
    }

    async fn fetch_free_bike_status(&self) -> Result<FreeBikeStatusDoc, FeedError> {
        self.fetch_page("free_bike_status.json").await
    }

    async fn fetch_vehicle_types(&self) -> Result<VehicleTypesDoc, FeedError> {
        self.fetch_page("vehicle_types.json").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GbfsFeedClient {
        GbfsFeedClient::new(GbfsClientConfig::new(server.uri()))
    }

    // Test 1: Free bike status page is fetched and decoded
    #[tokio::test]
    async fn test_fetch_free_bike_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/free_bike_status.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"bikes": [{"bike_id": "b1", "lat": 45.5, "lon": -122.6}]}
            })))
            .mount(&server)
            .await;

        let doc = client_for(&server).fetch_free_bike_status().await.unwrap();
        assert_eq!(doc.data.bikes.len(), 1);
        assert_eq!(doc.data.bikes[0].bike_id, "b1");
    }

    // Test 2: Bearer token is attached when configured
    #[tokio::test]
    async fn test_bearer_token_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicle_types.json"))
            .and(header("Authorization", "Bearer sekrit"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"vehicle_types": []}})),
            )
            .mount(&server)
            .await;

        let client =
            GbfsFeedClient::new(GbfsClientConfig::new(server.uri()).with_auth_token("sekrit"));
        let doc = client.fetch_vehicle_types().await.unwrap();
        assert!(doc.data.vehicle_types.is_empty());
    }

    // Test 3: Non-2xx status is a transport error
    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geofencing_zones.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_geofencing_zones()
            .await
            .unwrap_err();
        match err {
            FeedError::Status(code) => assert_eq!(code, 503),
            other => panic!("Expected Status error, got {:?}", other),
        }
    }

    // Test 4: Undecodable body is a malformed-feed error
    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/free_bike_status.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_free_bike_status()
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    // Test 5: A body missing expected keys is a malformed-feed error
    #[tokio::test]
    async fn test_missing_keys_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/free_bike_status.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bikes": []
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_free_bike_status()
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    // Test 6: Trailing slash on the feed root is tolerated
    #[tokio::test]
    async fn test_feed_root_trailing_slash() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vehicle_types.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"vehicle_types": []}})),
            )
            .mount(&server)
            .await;

        let client = GbfsFeedClient::new(GbfsClientConfig::new(format!("{}/", server.uri())));
        assert!(client.fetch_vehicle_types().await.is_ok());
    }
}
