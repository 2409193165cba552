//! Restricted area domain models
//!
//! Geofenced polygons with a ride/park restriction classification, derived
//! from vendor rule sets and kept in sync with vendor feeds.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A multipolygon as nested coordinate rings.
///
/// Stored in `[lat, lng]` order; feed ingestion is responsible for swapping
/// the GBFS `[lng, lat]` convention before rows reach this type.
pub type MultiPolygon = Vec<Vec<Vec<[f64; 2]>>>;

/// Restriction classification of a geofenced area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Restriction {
    /// Vehicles may ride through but not end a trip here
    NoPark,
    /// Vehicles may park but not ride through
    NoRide,
    /// Vehicles may neither ride through nor park
    NoParkOrRide,
}

impl Restriction {
    /// Derive the restriction from a zone rule's two booleans.
    ///
    /// Returns None when neither flag is false; such zones carry no usable
    /// restriction (e.g. pure speed-limit zones) and must be dropped, not
    /// stored as "unrestricted".
    pub fn from_rule_flags(ride_allowed: bool, ride_through_allowed: bool) -> Option<Self> {
        match (ride_allowed, ride_through_allowed) {
            (false, false) => Some(Restriction::NoParkOrRide),
            (false, true) => Some(Restriction::NoPark),
            (true, false) => Some(Restriction::NoRide),
            (true, true) => None,
        }
    }

    /// Database/text representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Restriction::NoPark => "no-park",
            Restriction::NoRide => "no-ride",
            Restriction::NoParkOrRide => "no-park-or-ride",
        }
    }
}

impl FromStr for Restriction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-park" => Ok(Restriction::NoPark),
            "no-ride" => Ok(Restriction::NoRide),
            "no-park-or-ride" => Ok(Restriction::NoParkOrRide),
            other => Err(format!("unknown restriction: {other}")),
        }
    }
}

impl std::fmt::Display for Restriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named geofenced polygon belonging to one vendor service
///
/// Same full-replacement lifecycle as live vehicles, keyed by `unique_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictedArea {
    /// Database row id (None before insert)
    pub id: Option<i64>,

    /// Owning vendor service
    pub vendor_service_id: i64,

    /// Merge key: the vendor's zone name, or a synthesized fallback
    pub unique_id: String,

    /// Display title
    pub title: String,

    /// Restriction classification
    pub restriction: Restriction,

    /// Polygon rings in `[lat, lng]` order
    pub multipolygon: MultiPolygon,
}

impl RestrictedArea {
    /// Create a new restricted area; the title defaults to the unique id.
    pub fn new(
        vendor_service_id: i64,
        unique_id: impl Into<String>,
        restriction: Restriction,
        multipolygon: MultiPolygon,
    ) -> Self {
        let unique_id = unique_id.into();
        Self {
            id: None,
            vendor_service_id,
            title: unique_id.clone(),
            unique_id,
            restriction,
            multipolygon,
        }
    }

    /// Set the display title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}
