//! Model availability sync component
//!
//! Consumes the synthesized documents of a proprietary availability-API
//! client. Records are bookable station/model slots rather than positioned
//! individual vehicles: reserved or disabled records are dropped and battery
//! is never reported.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::error::SyncError;
use crate::feed::gbfs::{GbfsBike, VehicleTypeEntry};
use crate::feed::FeedClient;
use crate::models::{VehicleType, VendorService};
use crate::sync::component::{
    require_service_id, ComponentKind, MergeSpec, SyncComponent, SyncRow,
};
use crate::sync::free_bike_status::{vehicle_row, VEHICLE_MERGE_SPEC};

#[derive(Debug, Default)]
struct FeedState {
    catalog: Vec<VehicleTypeEntry>,
    slots: Vec<GbfsBike>,
}

/// Sync component for proprietary availability slots
#[derive(Debug, Default)]
pub struct ModelAvailabilitySync {
    state: RwLock<Option<FeedState>>,
}

impl ModelAvailabilitySync {
    /// Create a new component with empty prefetch state
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncComponent for ModelAvailabilitySync {
    fn kind(&self) -> ComponentKind {
        ComponentKind::ModelAvailability
    }

    fn merge_spec(&self) -> &'static MergeSpec {
        &VEHICLE_MERGE_SPEC
    }

    /// Fetch the model catalog and the availability page together, once per
    /// run; both are shared across every service processed in this run.
    async fn before_sync(&self, client: &dyn FeedClient) -> Result<(), SyncError> {
        let catalog = client.fetch_vehicle_types().await?.data.vehicle_types;
        let slots = client.fetch_free_bike_status().await?.data.bikes;

        debug!(
            catalog_entries = catalog.len(),
            slots = slots.len(),
            "Prefetched availability feed"
        );

        let mut state = self.state.write().expect("feed state lock poisoned");
        *state = Some(FeedState { catalog, slots });
        Ok(())
    }

    fn produce_rows(&self, service: &VendorService) -> Result<Vec<SyncRow>, SyncError> {
        let guard = self.state.read().expect("feed state lock poisoned");
        let state = guard
            .as_ref()
            .ok_or_else(|| SyncError::Internal("produce_rows called before before_sync".to_string()))?;
        let service_id = require_service_id(service)?;

        let accepted: HashMap<&str, &VehicleTypeEntry> = state
            .catalog
            .iter()
            .filter(|entry| service.satisfies_constraints(entry))
            .map(|entry| (entry.vehicle_type_id.as_str(), entry))
            .collect();

        let mut rows = Vec::new();
        for slot in &state.slots {
            // A reserved or disabled slot is not bookable
            if slot.is_reserved || slot.is_disabled {
                continue;
            }
            let Some(type_id) = &slot.vehicle_type_id else {
                continue;
            };
            let Some(entry) = accepted.get(type_id.as_str()) else {
                continue;
            };

            let vehicle_type = VehicleType::classify(&entry.form_factor, &entry.propulsion_type)?;

            // Availability slots carry no battery information
            rows.push(vehicle_row(
                service_id,
                &slot.bike_id,
                slot.lat,
                slot.lon,
                vehicle_type,
                None,
                slot.rental_uris.clone(),
            ));
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FakeFeedClient;
    use rusqlite::types::Value;
    use serde_json::json;

    fn fixture_client() -> FakeFeedClient {
        let vehicle_types = serde_json::from_value(json!({
            "data": {"vehicle_types": [{
                "vehicle_type_id": "gts-scooter",
                "form_factor": "scooter",
                "propulsion_type": "electric"
            }]}
        }))
        .unwrap();
        let slots = serde_json::from_value(json!({
            "data": {"bikes": [
                {"bike_id": "gts-2-11-7", "lat": 45.52, "lon": -122.68,
                 "vehicle_type_id": "gts-scooter", "current_range_meters": 9000.0},
                {"bike_id": "gts-2-12-7", "lat": 45.53, "lon": -122.66,
                 "vehicle_type_id": "gts-scooter", "is_reserved": true},
                {"bike_id": "gts-2-13-7", "lat": 45.54, "lon": -122.65,
                 "vehicle_type_id": "gts-scooter", "is_disabled": true}
            ]}
        }))
        .unwrap();

        FakeFeedClient::new()
            .with_vehicle_types(vehicle_types)
            .with_free_bike_status(slots)
    }

    fn service(id: i64) -> VendorService {
        let mut svc = VendorService::new("gts", "GTS Scooters");
        svc.id = Some(id);
        svc
    }

    // Test 1: Only bookable slots produce rows
    #[tokio::test]
    async fn test_reserved_and_disabled_slots_skipped() {
        let component = ModelAvailabilitySync::new();
        component.before_sync(&fixture_client()).await.unwrap();

        let rows = component.produce_rows(&service(9)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].external_id, "gts-2-11-7");
        assert_eq!(rows[0].values[4], Value::Text("escooter".to_string()));
    }

    // Test 2: Battery is always null even when the record carries a range
    #[tokio::test]
    async fn test_battery_always_null() {
        let component = ModelAvailabilitySync::new();
        component.before_sync(&fixture_client()).await.unwrap();

        let rows = component.produce_rows(&service(9)).unwrap();
        assert_eq!(rows[0].values[5], Value::Null);
    }

    // Test 3: Targets the live vehicles table
    #[test]
    fn test_targets_vehicle_table() {
        let component = ModelAvailabilitySync::new();
        assert_eq!(component.merge_spec().table, "mobility_vehicles");
        assert_eq!(component.kind(), ComponentKind::ModelAvailability);
    }
}
