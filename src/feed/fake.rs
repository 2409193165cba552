//! In-memory fixture feed client
//!
//! Returns injected documents instead of touching the network. Fetching a
//! page that has no fixture fails like a malformed feed.

use async_trait::async_trait;

use crate::error::FeedError;
use crate::feed::gbfs::{FreeBikeStatusDoc, GeofencingZonesDoc, VehicleTypesDoc};
use crate::feed::FeedClient;

/// Feed client backed by injected fixtures
#[derive(Debug, Default)]
pub struct FakeFeedClient {
    geofencing_zones: Option<GeofencingZonesDoc>,
    free_bike_status: Option<FreeBikeStatusDoc>,
    vehicle_types: Option<VehicleTypesDoc>,
}

impl FakeFeedClient {
    /// Create a client with no fixtures
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject the geofencing zones fixture
    pub fn with_geofencing_zones(mut self, doc: GeofencingZonesDoc) -> Self {
        self.geofencing_zones = Some(doc);
        self
    }

    /// Inject the free bike status fixture
    pub fn with_free_bike_status(mut self, doc: FreeBikeStatusDoc) -> Self {
        self.free_bike_status = Some(doc);
        self
    }

    /// Inject the vehicle types fixture
    pub fn with_vehicle_types(mut self, doc: VehicleTypesDoc) -> Self {
        self.vehicle_types = Some(doc);
        self
    }
}

#[async_trait]
impl FeedClient for FakeFeedClient {
    async fn fetch_geofencing_zones(&self) -> Result<GeofencingZonesDoc, FeedError> {
        self.geofencing_zones
            .clone()
            .ok_or_else(|| FeedError::Malformed("no geofencing zones fixture".to_string()))
    }

    async fn fetch_free_bike_status(&self) -> Result<FreeBikeStatusDoc, FeedError> {
        self.free_bike_status
            .clone()
            .ok_or_else(|| FeedError::Malformed("no free bike status fixture".to_string()))
    }

    async fn fetch_vehicle_types(&self) -> Result<VehicleTypesDoc, FeedError> {
        self.vehicle_types
            .clone()
            .ok_or_else(|| FeedError::Malformed("no vehicle types fixture".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: Injected fixtures are returned as-is
    #[tokio::test]
    async fn test_returns_injected_fixture() {
        let doc: FreeBikeStatusDoc = serde_json::from_value(serde_json::json!({
            "data": {"bikes": [{"bike_id": "b1", "lat": 1.0, "lon": 2.0}]}
        }))
        .unwrap();

        let client = FakeFeedClient::new().with_free_bike_status(doc.clone());
        assert_eq!(client.fetch_free_bike_status().await.unwrap(), doc);
    }

    // Test 2: Missing fixtures fail like a malformed feed
    #[tokio::test]
    async fn test_missing_fixture_errors() {
        let client = FakeFeedClient::new();
        assert!(matches!(
            client.fetch_vehicle_types().await.unwrap_err(),
            FeedError::Malformed(_)
        ));
        assert!(matches!(
            client.fetch_geofencing_zones().await.unwrap_err(),
            FeedError::Malformed(_)
        ));
    }
}
