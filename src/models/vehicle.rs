//! Live vehicle domain models
//!
//! This module defines the internal vehicle-type taxonomy, the classification
//! rule applied to vendor catalogs, and the `LiveVehicle` record kept in sync
//! with vendor feeds.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ClassificationError;

/// Fixed-point scale applied to coordinates for indexed spatial queries.
///
/// Seven decimal places of a WGS84 degree, stored as an i64. Treat the
/// encoding as opaque; only `coord_to_int` and the search bounds conversion
/// may assume the factor.
pub const COORD_SCALE: f64 = 10_000_000.0;

/// Encode a raw coordinate into its fixed-point integer form.
pub fn coord_to_int(coord: f64) -> i64 {
    (coord * COORD_SCALE).round() as i64
}

/// Canonical internal vehicle type
///
/// A small closed enumeration; every stored vehicle carries exactly one of
/// these. Vendor catalogs are mapped in via [`VehicleType::classify`], which
/// refuses unknown combinations instead of guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    /// Human-powered bicycle
    Bike,
    /// Electric-assist bicycle
    Ebike,
    /// Electric standing scooter
    Escooter,
}

impl VehicleType {
    /// Classify a vendor catalog entry's `(form_factor, propulsion_type)`
    /// pair into the internal taxonomy.
    ///
    /// `bicycle+human` => `Bike`, `bicycle+electric_assist` => `Ebike`,
    /// `scooter+electric` => `Escooter`. Any other combination is a
    /// [`ClassificationError`]; the caller is expected to abort its run.
    pub fn classify(
        form_factor: &str,
        propulsion_type: &str,
    ) -> Result<Self, ClassificationError> {
        match (form_factor, propulsion_type) {
            ("bicycle", "human") => Ok(VehicleType::Bike),
            ("bicycle", "electric_assist") => Ok(VehicleType::Ebike),
            ("scooter", "electric") => Ok(VehicleType::Escooter),
            _ => Err(ClassificationError {
                form_factor: form_factor.to_string(),
                propulsion_type: propulsion_type.to_string(),
            }),
        }
    }

    /// Database/text representation
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Bike => "bike",
            VehicleType::Ebike => "ebike",
            VehicleType::Escooter => "escooter",
        }
    }
}

impl FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bike" => Ok(VehicleType::Bike),
            "ebike" => Ok(VehicleType::Ebike),
            "escooter" => Ok(VehicleType::Escooter),
            other => Err(format!("unknown vehicle type: {other}")),
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positioned, typed vehicle belonging to one vendor service
///
/// Rows are fully replaced every sync cycle for their service; there is no
/// mutation path outside the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveVehicle {
    /// Database row id (None before insert)
    pub id: Option<i64>,

    /// Owning vendor service
    pub vendor_service_id: i64,

    /// Vendor-external vehicle id, unique per service
    pub vehicle_id: String,

    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lng: f64,

    /// Fixed-point latitude for indexed spatial queries
    pub lat_int: i64,

    /// Fixed-point longitude for indexed spatial queries
    pub lng_int: i64,

    /// Canonical internal vehicle type
    pub vehicle_type: VehicleType,

    /// Battery percent in 0..=100, None when the feed gives no usable range
    pub battery_level: Option<u8>,

    /// Vendor deep-link metadata, `{}` when the feed omits it
    pub rental_uris: serde_json::Value,
}

impl LiveVehicle {
    /// Build a vehicle from raw coordinates, deriving the fixed-point forms.
    pub fn new(
        vendor_service_id: i64,
        vehicle_id: impl Into<String>,
        lat: f64,
        lng: f64,
        vehicle_type: VehicleType,
    ) -> Self {
        Self {
            id: None,
            vendor_service_id,
            vehicle_id: vehicle_id.into(),
            lat,
            lng,
            lat_int: coord_to_int(lat),
            lng_int: coord_to_int(lng),
            vehicle_type,
            battery_level: None,
            rental_uris: serde_json::json!({}),
        }
    }

    /// Set the battery level
    pub fn with_battery_level(mut self, level: Option<u8>) -> Self {
        self.battery_level = level;
        self
    }

    /// Set the deep-link metadata
    pub fn with_rental_uris(mut self, uris: serde_json::Value) -> Self {
        self.rental_uris = uris;
        self
    }
}

/// Compute a battery percentage from a vehicle's current range and its
/// catalog entry's maximum range.
///
/// Returns None when either value is absent or the maximum is not a positive
/// number; a zero max range must not divide.
pub fn battery_percent(current_range_meters: Option<f64>, max_range_meters: Option<f64>) -> Option<u8> {
    let current = current_range_meters?;
    let max = max_range_meters?;
    if max <= 0.0 {
        return None;
    }
    let pct = (current / max * 100.0).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}
