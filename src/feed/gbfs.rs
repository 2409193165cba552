//! GBFS wire types
//!
//! Typed representations of the three feed pages the sync engine consumes:
//! `free_bike_status.json`, `vehicle_types.json`, and
//! `geofencing_zones.json`. Unknown fields are ignored; fields vendors
//! routinely omit are optional.

use serde::Deserialize;

/// `vehicle_types.json` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VehicleTypesDoc {
    /// Payload wrapper
    pub data: VehicleTypesData,
}

/// `data` object of a vehicle-types document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VehicleTypesData {
    /// Vendor-supplied fleet vehicle classes
    #[serde(default)]
    pub vehicle_types: Vec<VehicleTypeEntry>,
}

/// One vendor-supplied fleet vehicle class.
///
/// Transient: fetched fresh each run, never persisted directly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleTypeEntry {
    /// Catalog id referenced by bikes and zone rules
    pub vehicle_type_id: String,

    /// Physical form factor (e.g. "bicycle", "scooter")
    pub form_factor: String,

    /// Propulsion type (e.g. "human", "electric_assist", "electric")
    pub propulsion_type: String,

    /// Maximum range in meters, absent for unbounded/human-powered types
    #[serde(default)]
    pub max_range_meters: Option<f64>,
}

/// `free_bike_status.json` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FreeBikeStatusDoc {
    /// Payload wrapper
    pub data: FreeBikeStatusData,
}

/// `data` object of a free-bike-status document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FreeBikeStatusData {
    /// Currently available vehicles
    #[serde(default)]
    pub bikes: Vec<GbfsBike>,
}

/// One raw vehicle record
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GbfsBike {
    /// Vendor-external vehicle id
    pub bike_id: String,

    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lon: f64,

    /// Catalog id; vehicles without one are not typed and are skipped
    #[serde(default)]
    pub vehicle_type_id: Option<String>,

    /// Remaining range in meters
    #[serde(default)]
    pub current_range_meters: Option<f64>,

    /// Deep-link metadata (android/ios/web URIs)
    #[serde(default)]
    pub rental_uris: Option<serde_json::Value>,

    /// Whether the vehicle is currently reserved
    #[serde(default)]
    pub is_reserved: bool,

    /// Whether the vehicle is currently disabled
    #[serde(default)]
    pub is_disabled: bool,
}

/// `geofencing_zones.json` document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeofencingZonesDoc {
    /// Payload wrapper
    pub data: GeofencingZonesData,
}

/// `data` object of a geofencing document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeofencingZonesData {
    /// GeoJSON feature collection of zones
    #[serde(default)]
    pub geofencing_zones: ZoneFeatureCollection,
}

/// GeoJSON feature collection wrapper
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ZoneFeatureCollection {
    /// Zone features
    #[serde(default)]
    pub features: Vec<ZoneFeature>,
}

/// One geofencing zone feature
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ZoneFeature {
    /// Zone geometry; GBFS emits multipolygons in `[lng, lat]` order
    pub geometry: ZoneGeometry,

    /// Zone properties
    #[serde(default)]
    pub properties: ZoneProperties,
}

/// Geometry of a zone feature
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ZoneGeometry {
    /// Multipolygon rings of raw `[lng, lat]` pairs
    #[serde(default)]
    pub coordinates: Vec<Vec<Vec<[f64; 2]>>>,
}

/// Properties of a zone feature
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ZoneProperties {
    /// Zone name; absent names force a synthesized merge key
    #[serde(default)]
    pub name: Option<String>,

    /// Ride/park rules; only the first rule is consulted
    #[serde(default)]
    pub rules: Vec<ZoneRule>,
}

/// One ride/park rule
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ZoneRule {
    /// Catalog ids the rule applies to; empty applies to the whole fleet
    #[serde(default)]
    pub vehicle_type_id: Vec<String>,

    /// Whether ending a trip in the zone is allowed
    #[serde(default = "rule_flag_default")]
    pub ride_allowed: bool,

    /// Whether riding through the zone is allowed
    #[serde(default = "rule_flag_default")]
    pub ride_through_allowed: bool,
}

fn rule_flag_default() -> bool {
    true
}
