//! Vendor service domain models
//!
//! A vendor service is an internal offering scoped to one vendor and a
//! market/category. It owns the live vehicles and restricted areas written by
//! the sync engine and exposes the type-constraint predicate used to filter
//! vendor catalogs. Vendor services are created by admin configuration and
//! are read-only to this subsystem.

use serde::{Deserialize, Serialize};

use crate::feed::gbfs::VehicleTypeEntry;

/// Service category processed by the sync engine
pub const MOBILITY_CATEGORY: &str = "mobility";

/// One acceptable shape of catalog entry.
///
/// A constraint matches an entry when every populated field equals the
/// entry's field. An empty constraint matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeConstraint {
    /// Required form factor, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_factor: Option<String>,

    /// Required propulsion type, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propulsion_type: Option<String>,
}

impl TypeConstraint {
    /// Require a form factor
    pub fn form_factor(value: impl Into<String>) -> Self {
        Self {
            form_factor: Some(value.into()),
            propulsion_type: None,
        }
    }

    /// Require a propulsion type
    pub fn propulsion_type(value: impl Into<String>) -> Self {
        Self {
            form_factor: None,
            propulsion_type: Some(value.into()),
        }
    }

    fn matches(&self, entry: &VehicleTypeEntry) -> bool {
        if let Some(ff) = &self.form_factor {
            if *ff != entry.form_factor {
                return false;
            }
        }
        if let Some(pt) = &self.propulsion_type {
            if *pt != entry.propulsion_type {
                return false;
            }
        }
        true
    }
}

/// An internal offering scoped to one vendor and market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorService {
    /// Database row id (None before insert)
    pub id: Option<i64>,

    /// Key of the owning vendor (e.g. "lime", "lyft")
    pub vendor_slug: String,

    /// Display name
    pub name: String,

    /// Service category; the sync engine only processes "mobility"
    pub category: String,

    /// Catalog filter; empty accepts every catalog entry
    pub constraints: Vec<TypeConstraint>,
}

impl VendorService {
    /// Create a new mobility service with no constraints
    pub fn new(vendor_slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            vendor_slug: vendor_slug.into(),
            name: name.into(),
            category: MOBILITY_CATEGORY.to_string(),
            constraints: Vec::new(),
        }
    }

    /// Set the constraint list
    pub fn with_constraints(mut self, constraints: Vec<TypeConstraint>) -> Self {
        self.constraints = constraints;
        self
    }

    /// Whether this service offers vehicles of the given catalog entry's type.
    ///
    /// True when the constraint list is empty or ANY constraint matches.
    pub fn satisfies_constraints(&self, entry: &VehicleTypeEntry) -> bool {
        self.constraints.is_empty() || self.constraints.iter().any(|c| c.matches(entry))
    }
}
