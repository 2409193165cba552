//! Sync component trait definition
//!
//! A sync component is a vendor-agnostic transformation: given raw feed
//! state (memoized in `before_sync`) and one vendor service's constraints,
//! it produces normalized rows plus the merge metadata the orchestrator
//! needs to reconcile them into storage.

use async_trait::async_trait;
use rusqlite::types::Value;

use crate::error::SyncError;
use crate::feed::FeedClient;
use crate::models::VendorService;

/// The closed set of sync component types.
///
/// The registry uses this as the capability filter: a vendor factory answers
/// the kinds its integration supports and ignores the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Live vehicle positions from `free_bike_status.json`
    FreeBikeStatus,
    /// Restricted areas from `geofencing_zones.json`
    GeofencingZone,
    /// Bookable station/model slots from a proprietary availability API
    ModelAvailability,
}

impl ComponentKind {
    /// All component kinds, in batch execution order
    pub const ALL: [ComponentKind; 3] = [
        ComponentKind::FreeBikeStatus,
        ComponentKind::GeofencingZone,
        ComponentKind::ModelAvailability,
    ];

    /// Stable name used in logs and CLI arguments
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::FreeBikeStatus => "free-bike-status",
            ComponentKind::GeofencingZone => "geofencing-zone",
            ComponentKind::ModelAvailability => "model-availability",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free-bike-status" => Ok(ComponentKind::FreeBikeStatus),
            "geofencing-zone" => Ok(ComponentKind::GeofencingZone),
            "model-availability" => Ok(ComponentKind::ModelAvailability),
            other => Err(format!("unknown sync component: {other}")),
        }
    }
}

/// Merge metadata for one target table.
///
/// The orchestrator builds its reconciliation statements from this; rows
/// never carry SQL themselves. The conflict target is always
/// `(vendor_service_id, external_id_column)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSpec {
    /// Target table name
    pub table: &'static str,
    /// Column holding the vendor-external unique id
    pub external_id_column: &'static str,
    /// Value columns inserted alongside the scope and id columns
    pub insert_columns: &'static [&'static str],
    /// Subset of `insert_columns` overwritten when a row already exists
    pub update_columns: &'static [&'static str],
}

/// One normalized row ready for storage.
///
/// `values` is aligned with the component's [`MergeSpec::insert_columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRow {
    /// Owning vendor service
    pub vendor_service_id: i64,
    /// Vendor-external unique id, the merge key within the service
    pub external_id: String,
    /// Values for the merge spec's insert columns, in order
    pub values: Vec<Value>,
}

/// Trait for sync components
///
/// `before_sync` runs once per run and memoizes whatever feed pages the
/// transformation needs, since one page's content is shared across every
/// vendor service processed in the same run. `produce_rows` is then a pure
/// function of that state plus one service's constraints; calling it before
/// `before_sync` is an internal error.
#[async_trait]
pub trait SyncComponent: Send + Sync {
    /// Which component this is
    fn kind(&self) -> ComponentKind;

    /// Merge metadata for the target table
    fn merge_spec(&self) -> &'static MergeSpec;

    /// One-time prefetch for this run
    async fn before_sync(&self, client: &dyn FeedClient) -> Result<(), SyncError>;

    /// Transform the memoized feed state into rows for one vendor service
    fn produce_rows(&self, service: &VendorService) -> Result<Vec<SyncRow>, SyncError>;
}

/// Row id of a service loaded from storage.
///
/// Services reach components through `Database::list_vendor_services`, so a
/// missing id is an engine bug, not a data condition.
pub(crate) fn require_service_id(service: &VendorService) -> Result<i64, SyncError> {
    service
        .id
        .ok_or_else(|| SyncError::Internal("vendor service has no row id".to_string()))
}
