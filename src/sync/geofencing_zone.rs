//! Geofencing zone sync component
//!
//! Transforms a vendor's `geofencing_zones.json` page into restricted area
//! rows: single-rule semantics, restriction derivation, and the coordinate
//! convention fix-up from GBFS `[lng, lat]` to internal `[lat, lng]`.

use async_trait::async_trait;
use rusqlite::types::Value;
use std::collections::HashSet;
use std::sync::RwLock;
use tracing::debug;

use crate::error::SyncError;
use crate::feed::gbfs::{VehicleTypeEntry, ZoneFeature};
use crate::feed::FeedClient;
use crate::models::{MultiPolygon, Restriction, VendorService};
use crate::sync::component::{
    require_service_id, ComponentKind, MergeSpec, SyncComponent, SyncRow,
};

/// Merge metadata for the restricted areas table
pub(crate) static AREA_MERGE_SPEC: MergeSpec = MergeSpec {
    table: "restricted_areas",
    external_id_column: "unique_id",
    insert_columns: &["title", "restriction", "multipolygon"],
    update_columns: &["title", "restriction", "multipolygon"],
};

#[derive(Debug, Default)]
struct FeedState {
    catalog: Vec<VehicleTypeEntry>,
    features: Vec<ZoneFeature>,
}

/// Sync component for geofenced restriction zones
#[derive(Debug, Default)]
pub struct GeofencingZoneSync {
    state: RwLock<Option<FeedState>>,
}

impl GeofencingZoneSync {
    /// Create a new component with empty prefetch state
    pub fn new() -> Self {
        Self::default()
    }
}

/// Swap every `[lng, lat]` pair in every ring of every polygon.
fn swap_coordinates(raw: &[Vec<Vec<[f64; 2]>>]) -> MultiPolygon {
    raw.iter()
        .map(|polygon| {
            polygon
                .iter()
                .map(|ring| ring.iter().map(|pair| [pair[1], pair[0]]).collect())
                .collect()
        })
        .collect()
}

/// Merge key for a zone feature: the vendor's name when present, otherwise
/// the first raw coordinate pair as `"{lng}/{lat}"`.
///
/// The fallback is not guaranteed stable if the vendor perturbs coordinates
/// between refreshes; it is logged so the resulting churn is observable.
fn zone_unique_id(feature: &ZoneFeature) -> Option<String> {
    if let Some(name) = &feature.properties.name {
        return Some(name.clone());
    }
    let pair = feature
        .geometry
        .coordinates
        .first()
        .and_then(|polygon| polygon.first())
        .and_then(|ring| ring.first())?;
    let id = format!("{}/{}", pair[0], pair[1]);
    debug!(unique_id = id, "Zone has no name, synthesized id from first coordinate");
    Some(id)
}

#[async_trait]
impl SyncComponent for GeofencingZoneSync {
    fn kind(&self) -> ComponentKind {
        ComponentKind::GeofencingZone
    }

    fn merge_spec(&self) -> &'static MergeSpec {
        &AREA_MERGE_SPEC
    }

    async fn before_sync(&self, client: &dyn FeedClient) -> Result<(), SyncError> {
        let catalog = client.fetch_vehicle_types().await?.data.vehicle_types;
        let features = client
            .fetch_geofencing_zones()
            .await?
            .data
            .geofencing_zones
            .features;

        debug!(
            catalog_entries = catalog.len(),
            features = features.len(),
            "Prefetched geofencing feed"
        );

        let mut state = self.state.write().expect("feed state lock poisoned");
        *state = Some(FeedState { catalog, features });
        Ok(())
    }

    fn produce_rows(&self, service: &VendorService) -> Result<Vec<SyncRow>, SyncError> {
        let guard = self.state.read().expect("feed state lock poisoned");
        let state = guard
            .as_ref()
            .ok_or_else(|| SyncError::Internal("produce_rows called before before_sync".to_string()))?;
        let service_id = require_service_id(service)?;

        let accepted: HashSet<&str> = state
            .catalog
            .iter()
            .filter(|entry| service.satisfies_constraints(entry))
            .map(|entry| entry.vehicle_type_id.as_str())
            .collect();

        let mut rows = Vec::new();
        for feature in &state.features {
            // Single-rule semantics: only the first rule counts
            let Some(rule) = feature.properties.rules.first() else {
                continue;
            };

            if !rule.vehicle_type_id.is_empty()
                && !rule
                    .vehicle_type_id
                    .iter()
                    .any(|id| accepted.contains(id.as_str()))
            {
                continue;
            }

            // Zones without a usable restriction are dropped, not stored
            let Some(restriction) =
                Restriction::from_rule_flags(rule.ride_allowed, rule.ride_through_allowed)
            else {
                continue;
            };

            let Some(unique_id) = zone_unique_id(feature) else {
                continue;
            };
            let title = feature
                .properties
                .name
                .clone()
                .unwrap_or_else(|| unique_id.clone());

            let multipolygon = swap_coordinates(&feature.geometry.coordinates);
            let polygon_json = serde_json::to_string(&multipolygon)
                .map_err(|e| SyncError::Internal(format!("polygon serialization failed: {e}")))?;

            rows.push(SyncRow {
                vendor_service_id: service_id,
                external_id: unique_id,
                values: vec![
                    Value::Text(title),
                    Value::Text(restriction.as_str().to_string()),
                    Value::Text(polygon_json),
                ],
            });
        }

        Ok(rows)
    }
}
