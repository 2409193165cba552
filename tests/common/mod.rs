//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use mobility_sync::database::{Database, SqliteDatabase};
use mobility_sync::feed::gbfs::{FreeBikeStatusDoc, GeofencingZonesDoc, VehicleTypesDoc};
use mobility_sync::feed::FakeFeedClient;
use mobility_sync::models::VendorService;
use serde_json::json;

/// Create an in-memory database for testing
pub async fn create_test_database() -> Arc<SqliteDatabase> {
    Arc::new(
        SqliteDatabase::in_memory()
            .await
            .expect("Failed to create test database"),
    )
}

/// Seed a mobility vendor service and return its row id
pub async fn seed_service(db: &Arc<SqliteDatabase>, vendor_slug: &str) -> i64 {
    db.insert_vendor_service(&VendorService::new(
        vendor_slug,
        format!("{vendor_slug} mobility"),
    ))
    .await
    .expect("Failed to seed vendor service")
}

/// A one-entry escooter catalog (`abc123`, max range 12km)
pub fn vehicle_types_fixture() -> VehicleTypesDoc {
    serde_json::from_value(json!({
        "last_updated": 1_609_866_247,
        "ttl": 0,
        "version": "2.2",
        "data": {
            "vehicle_types": [{
                "vehicle_type_id": "abc123",
                "form_factor": "scooter",
                "propulsion_type": "electric",
                "name": "Example E-scooter V2",
                "max_range_meters": 12_000.0
            }]
        }
    }))
    .expect("vehicle types fixture")
}

/// Two escooters of type `abc123`, one with deep-link metadata
pub fn free_bike_status_fixture() -> FreeBikeStatusDoc {
    serde_json::from_value(json!({
        "last_updated": 1_640_887_163,
        "ttl": 0,
        "version": "2.2",
        "data": {
            "bikes": [
                {
                    "bike_id": "ghi799",
                    "last_reported": 1_609_866_204,
                    "lat": 12.11,
                    "lon": 56.81,
                    "is_reserved": false,
                    "is_disabled": false,
                    "vehicle_type_id": "abc123",
                    "current_range_meters": 5000.12,
                    "rental_uris": {"web": "https://foo.bar"}
                },
                {
                    "bike_id": "ghi700",
                    "last_reported": 1_609_866_100,
                    "lat": 12.38,
                    "lon": 56.80,
                    "is_reserved": false,
                    "is_disabled": false,
                    "vehicle_type_id": "abc123",
                    "current_range_meters": 6543.0
                }
            ]
        }
    }))
    .expect("free bike status fixture")
}

/// A bike list with the given ids, all of type `abc123`
pub fn bikes_with_ids(ids: &[&str]) -> FreeBikeStatusDoc {
    let bikes: Vec<_> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "bike_id": id,
                "lat": 45.5 + i as f64 * 0.01,
                "lon": -122.6 - i as f64 * 0.01,
                "vehicle_type_id": "abc123",
                "current_range_meters": 6000.0
            })
        })
        .collect();

    serde_json::from_value(json!({"data": {"bikes": bikes}})).expect("bikes fixture")
}

/// One multipolygon no-park zone scoped to vehicle type `abc123`
pub fn geofencing_fixture() -> GeofencingZonesDoc {
    serde_json::from_value(json!({
        "last_updated": 1_640_887_163,
        "ttl": 60,
        "version": "2.3-RC2",
        "data": {
            "geofencing_zones": {
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[-122.578067, 45.562982], [-122.661838, 45.562741],
                              [-122.661151, 45.504542], [-122.578926, 45.5046625],
                              [-122.578067, 45.562982]]],
                            [[[-122.650680, 45.548197], [-122.650852, 45.534731],
                              [-122.630939, 45.535212], [-122.630424, 45.548197],
                              [-122.650680, 45.548197]]]
                        ]
                    },
                    "properties": {
                        "name": "NE 24th/NE Knott",
                        "start": 1_593_878_400,
                        "end": 1_593_907_260,
                        "rules": [{
                            "vehicle_type_id": ["abc123"],
                            "ride_allowed": false,
                            "ride_through_allowed": true,
                            "maximum_speed_kph": 10,
                            "station_parking": true
                        }]
                    }
                }]
            }
        }
    }))
    .expect("geofencing fixture")
}

/// Fake client preloaded with the standard vehicle fixtures
pub fn vehicle_feed_client() -> Arc<FakeFeedClient> {
    Arc::new(
        FakeFeedClient::new()
            .with_vehicle_types(vehicle_types_fixture())
            .with_free_bike_status(free_bike_status_fixture()),
    )
}

/// Fake client preloaded with the standard geofencing fixtures
pub fn geofencing_feed_client() -> Arc<FakeFeedClient> {
    Arc::new(
        FakeFeedClient::new()
            .with_vehicle_types(vehicle_types_fixture())
            .with_geofencing_zones(geofencing_fixture()),
    )
}
