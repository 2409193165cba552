//! Database migrations for mobility-sync
//!
//! This module contains SQL migrations for the SQLite database schema.

/// SQL statement to create the initial database schema
pub const CREATE_SCHEMA: &str = r#"
-- Vendor services: internal offerings scoped to one vendor and market.
-- Owned by admin configuration; the sync engine only reads them.
CREATE TABLE IF NOT EXISTS vendor_services (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vendor_slug TEXT NOT NULL,
    name TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT 'mobility',
    constraints TEXT NOT NULL DEFAULT '[]',
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_vendor_services_slug ON vendor_services(vendor_slug, category);

-- Live vehicles: fully replaced per vendor service on every sync cycle.
CREATE TABLE IF NOT EXISTS mobility_vehicles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vendor_service_id INTEGER NOT NULL REFERENCES vendor_services(id),
    vehicle_id TEXT NOT NULL,
    lat REAL NOT NULL,
    lng REAL NOT NULL,
    lat_int INTEGER NOT NULL,
    lng_int INTEGER NOT NULL,
    vehicle_type TEXT NOT NULL,
    battery_level INTEGER,
    rental_uris TEXT NOT NULL DEFAULT '{}',
    UNIQUE(vendor_service_id, vehicle_id)
);

CREATE INDEX IF NOT EXISTS idx_vehicles_coords ON mobility_vehicles(lat_int, lng_int);

-- Restricted areas: geofenced polygons, same replacement lifecycle.
CREATE TABLE IF NOT EXISTS restricted_areas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vendor_service_id INTEGER NOT NULL REFERENCES vendor_services(id),
    unique_id TEXT NOT NULL,
    title TEXT NOT NULL,
    restriction TEXT NOT NULL,
    multipolygon TEXT NOT NULL DEFAULT '[]',
    UNIQUE(vendor_service_id, unique_id)
);
"#;
