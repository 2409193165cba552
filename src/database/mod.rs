//! Database layer for mobility-sync
//!
//! This module defines the database trait and SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{LiveVehicle, RestrictedArea, VendorService};
use crate::sync::component::{MergeSpec, SyncRow};

/// Geographic bounds for vehicle search, in raw degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchBounds {
    /// Minimum latitude
    pub min_lat: f64,
    /// Maximum latitude
    pub max_lat: f64,
    /// Minimum longitude
    pub min_lng: f64,
    /// Maximum longitude
    pub max_lng: f64,
}

/// Database trait for data persistence
///
/// This trait defines all database operations needed by the sync engine.
/// It uses `async_trait` for async methods and `mockall::automock` for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    // =========================================================================
    // Vendor service operations
    // =========================================================================

    /// Insert a vendor service record
    ///
    /// Vendor services are owned by admin configuration; this seam exists for
    /// bootstrap and tests. Returns the new row id.
    async fn insert_vendor_service(&self, service: &VendorService) -> Result<i64, DbError>;

    /// List a vendor's mobility-category services
    async fn list_vendor_services(&self, vendor_slug: &str) -> Result<Vec<VendorService>, DbError>;

    // =========================================================================
    // Merge-upsert
    // =========================================================================

    /// Atomically reconcile a table's scoped subset to exactly the given rows.
    ///
    /// Within one transaction: rows belonging to the scoped services but
    /// absent from `rows` are deleted; present rows are inserted or, on
    /// conflict with the `(vendor_service_id, external id)` key, updated in
    /// exactly the merge spec's update columns. An empty `rows` clears every scoped
    /// row. Returns the incoming row count.
    async fn merge_rows(
        &self,
        spec: &MergeSpec,
        scope: &[i64],
        rows: Vec<SyncRow>,
    ) -> Result<u64, DbError>;

    // =========================================================================
    // Read models
    // =========================================================================

    /// List the live vehicles of one vendor service
    async fn list_vehicles(&self, vendor_service_id: i64) -> Result<Vec<LiveVehicle>, DbError>;

    /// Find all vehicles within the given bounds, via the fixed-point index
    async fn search_vehicles(&self, bounds: SearchBounds) -> Result<Vec<LiveVehicle>, DbError>;

    /// List the restricted areas of one vendor service
    async fn list_restricted_areas(
        &self,
        vendor_service_id: i64,
    ) -> Result<Vec<RestrictedArea>, DbError>;
}
