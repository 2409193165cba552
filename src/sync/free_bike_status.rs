//! Free bike status sync component
//!
//! Transforms a vendor's `free_bike_status.json` page into normalized live
//! vehicle rows: catalog filtering per vendor service, canonical type
//! classification, and battery derivation.

use async_trait::async_trait;
use rusqlite::types::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::error::SyncError;
use crate::feed::gbfs::{GbfsBike, VehicleTypeEntry};
use crate::feed::FeedClient;
use crate::models::{battery_percent, coord_to_int, VehicleType, VendorService};
use crate::sync::component::{
    require_service_id, ComponentKind, MergeSpec, SyncComponent, SyncRow,
};

/// Merge metadata for the live vehicles table.
///
/// Shared by every component that targets vehicles.
pub(crate) static VEHICLE_MERGE_SPEC: MergeSpec = MergeSpec {
    table: "mobility_vehicles",
    external_id_column: "vehicle_id",
    insert_columns: &[
        "lat",
        "lng",
        "lat_int",
        "lng_int",
        "vehicle_type",
        "battery_level",
        "rental_uris",
    ],
    update_columns: &[
        "lat",
        "lng",
        "lat_int",
        "lng_int",
        "vehicle_type",
        "battery_level",
        "rental_uris",
    ],
};

/// Build a normalized vehicle row.
pub(crate) fn vehicle_row(
    vendor_service_id: i64,
    vehicle_id: &str,
    lat: f64,
    lng: f64,
    vehicle_type: VehicleType,
    battery_level: Option<u8>,
    rental_uris: Option<serde_json::Value>,
) -> SyncRow {
    let uris = rental_uris.unwrap_or_else(|| serde_json::json!({}));
    SyncRow {
        vendor_service_id,
        external_id: vehicle_id.to_string(),
        values: vec![
            Value::Real(lat),
            Value::Real(lng),
            Value::Integer(coord_to_int(lat)),
            Value::Integer(coord_to_int(lng)),
            Value::Text(vehicle_type.as_str().to_string()),
            battery_level
                .map(|b| Value::Integer(i64::from(b)))
                .unwrap_or(Value::Null),
            Value::Text(uris.to_string()),
        ],
    }
}

#[derive(Debug, Default)]
struct FeedState {
    catalog: Vec<VehicleTypeEntry>,
    bikes: Vec<GbfsBike>,
}

/// Sync component for live vehicle positions
#[derive(Debug, Default)]
pub struct FreeBikeStatusSync {
    state: RwLock<Option<FeedState>>,
}

impl FreeBikeStatusSync {
    /// Create a new component with empty prefetch state
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncComponent for FreeBikeStatusSync {
    fn kind(&self) -> ComponentKind {
        ComponentKind::FreeBikeStatus
    }

    fn merge_spec(&self) -> &'static MergeSpec {
        &VEHICLE_MERGE_SPEC
    }

    /// Fetch the vehicle-type catalog and the bike list together; both pages
    /// are shared across every service processed in this run.
    async fn before_sync(&self, client: &dyn FeedClient) -> Result<(), SyncError> {
        let catalog = client.fetch_vehicle_types().await?.data.vehicle_types;
        let bikes = client.fetch_free_bike_status().await?.data.bikes;

        debug!(
            catalog_entries = catalog.len(),
            bikes = bikes.len(),
            "Prefetched free bike status feed"
        );

        let mut state = self.state.write().expect("feed state lock poisoned");
        *state = Some(FeedState { catalog, bikes });
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
        for bike in &state.bikes {
            let Some(type_id) = &bike.vehicle_type_id else {
                continue;
            };
            let Some(entry) = accepted.get(type_id.as_str()) else {
                continue;
            };

            let vehicle_type = VehicleType::classify(&entry.form_factor, &entry.propulsion_type)?;
            let battery = battery_percent(bike.current_range_meters, entry.max_range_meters);

            rows.push(vehicle_row(
                service_id,
                &bike.bike_id,
                bike.lat,
                bike.lon,
                vehicle_type,
                battery,
                bike.rental_uris.clone(),
            ));
        }

        Ok(rows)
    }
}
