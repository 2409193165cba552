//! Feed client trait definition
//!
//! This module defines the `FeedClient` trait implemented by every feed
//! transport: the standard GBFS HTTP client, proprietary vendor clients that
//! synthesize GBFS-shaped documents, and the in-memory fixture client used by
//! tests.

use async_trait::async_trait;

use crate::error::FeedError;
use crate::feed::gbfs::{FreeBikeStatusDoc, GeofencingZonesDoc, VehicleTypesDoc};

/// Trait for vendor feed clients
///
/// Each retrieval operation performs a fresh request and returns the parsed
/// document; there is no caching across calls and no internal retry. Any
/// transport failure or undecodable payload is fatal for the run that issued
/// the call; retry policy belongs to the scheduler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch the geofencing zones page
    async fn fetch_geofencing_zones(&self) -> Result<GeofencingZonesDoc, FeedError>;

    /// Fetch the free bike status page
    async fn fetch_free_bike_status(&self) -> Result<FreeBikeStatusDoc, FeedError>;

    /// Fetch the vehicle types page
    async fn fetch_vehicle_types(&self) -> Result<VehicleTypesDoc, FeedError>;
}
