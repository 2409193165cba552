//! Proprietary GTS availability-API client
//!
//! The GTS integration speaks a slot-booking API rather than GBFS: stations,
//! models, and bookable slots live behind POST endpoints keyed by a scheme
//! key and community id. This client implements [`FeedClient`] by synthesis:
//! it maps the proprietary pages onto GBFS-shaped documents so the downstream
//! transforms run unmodified against it.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::FeedError;
use crate::feed::gbfs::{
    FreeBikeStatusDoc, FreeBikeStatusData, GbfsBike, GeofencingZonesDoc, VehicleTypeEntry,
    VehicleTypesData, VehicleTypesDoc,
};
use crate::feed::http::DEFAULT_TIMEOUT_SECS;
use crate::feed::FeedClient;

/// Slot granularity requested from the availability endpoint, in minutes
const SLOT_SIZE_MINUTES: u32 = 60;

/// GTS access configuration for one community
#[derive(Debug, Clone)]
pub struct GtsAccessConfig {
    /// API host, e.g. `https://gtsapi.example.com`
    pub api_host: String,
    /// Scheme key issued by the vendor
    pub scheme_key: String,
    /// Community (market) id
    pub community_id: i64,
    /// Vendor-service scope this access maps to
    pub vendor_slug: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl GtsAccessConfig {
    /// Create an access config with the default timeout
    pub fn new(
        api_host: impl Into<String>,
        scheme_key: impl Into<String>,
        community_id: i64,
        vendor_slug: impl Into<String>,
    ) -> Self {
        Self {
            api_host: api_host.into(),
            scheme_key: scheme_key.into(),
            community_id,
            vendor_slug: vendor_slug.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StationsPage {
    #[serde(rename = "_embedded")]
    embedded: StationsEmbedded,
}

#[derive(Debug, Deserialize)]
struct StationsEmbedded {
    stations: Vec<GtsStation>,
}

#[derive(Debug, Deserialize)]
struct GtsStation {
    id: i64,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ModelsPage {
    #[serde(rename = "_embedded")]
    embedded: ModelsEmbedded,
}

#[derive(Debug, Deserialize)]
struct ModelsEmbedded {
    models: Vec<GtsModel>,
}

#[derive(Debug, Deserialize)]
struct GtsModel {
    id: i64,
    #[serde(rename = "vehicleType")]
    vehicle_type: String,
}

#[derive(Debug, Deserialize)]
struct VehicleTypesPage {
    #[serde(rename = "_embedded")]
    embedded: VehicleTypesEmbedded,
}

#[derive(Debug, Deserialize)]
struct VehicleTypesEmbedded {
    #[serde(rename = "vehicleTypes")]
    vehicle_types: Vec<GtsVehicleType>,
}

#[derive(Debug, Deserialize)]
struct GtsVehicleType {
    key: String,
}

/// Feed client for the proprietary GTS availability API
#[derive(Debug)]
pub struct GtsFeedClient {
    client: Client,
    config: GtsAccessConfig,
}

impl GtsFeedClient {
    /// Create a new GTS client
    pub fn new(config: GtsAccessConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    /// Catalog id namespace for this integration
    fn vehicle_type_id(&self, key: &str) -> String {
        format!("gts-{key}")
    }

    async fn post_to<T: DeserializeOwned>(
        &self,
        tail: &str,
        body: serde_json::Value,
    ) -> Result<T, FeedError> {
        let url = format!("{}{}", self.config.api_host.trim_end_matches('/'), tail);

        let mut payload = json!({
            "schemeKey": self.config.scheme_key,
            "community": self.config.community_id,
        });
        if let (Some(base), Some(extra)) = (payload.as_object_mut(), body.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }

        debug!(url = url, "Posting to availability API");

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FeedError::Timeout
                } else if e.is_connect() {
                    FeedError::ConnectionRefused
                } else {
                    FeedError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FeedError::Malformed(e.to_string()))
    }

    /// Reservation window used when querying availability.
    ///
    /// The stations endpoint wants timestamps relative to the stations it
    /// returns, so the window is a day out with a day of slack.
    fn reservation_window(start_key: &str, end_key: &str) -> serde_json::Value {
        let fmt = "%Y-%m-%d %H:%M:%S";
        let start = Utc::now() + ChronoDuration::hours(24);
        let end = Utc::now() + ChronoDuration::hours(48);
        json!({
            start_key: start.format(fmt).to_string(),
            end_key: end.format(fmt).to_string(),
        })
    }

    async fn fetch_stations(&self) -> Result<Vec<GtsStation>, FeedError> {
        let page: StationsPage = self
            .post_to(
                "/v2/explore/stations/available",
                Self::reservation_window("pickUpDatetime", "dropOffDatetime"),
            )
            .await?;
        Ok(page.embedded.stations)
    }

    async fn fetch_models(&self) -> Result<Vec<GtsModel>, FeedError> {
        let page: ModelsPage = self.post_to("/v2/explore/models", json!({})).await?;
        Ok(page.embedded.models)
    }
}

#[async_trait]
impl FeedClient for GtsFeedClient {
    /// The availability API has no geofencing concept; the synthesized
    /// document is always empty.
    async fn fetch_geofencing_zones(&self) -> Result<GeofencingZonesDoc, FeedError> {
        Ok(GeofencingZonesDoc::default())
    }

    /// Synthesize one record per station/model pairing with at least one
    /// bookable slot in the reservation window.
    async fn fetch_free_bike_status(&self) -> Result<FreeBikeStatusDoc, FeedError> {
        let stations = self.fetch_stations().await?;
        let models = self.fetch_models().await?;

        let mut bikes = Vec::new();
        for station in &stations {
            for model in &models {
                let mut body = json!({
                    "slotSize": SLOT_SIZE_MINUTES,
                    "model": model.id,
                    "station": station.id,
                });
                if let (Some(base), Some(window)) = (
                    body.as_object_mut(),
                    Self::reservation_window("startTime", "endTime").as_object(),
                ) {
                    for (k, v) in window {
                        base.insert(k.clone(), v.clone());
                    }
                }

                let slots: Vec<serde_json::Value> =
                    self.post_to("/v2/explore/available-slots", body).await?;
                // No slot array means nothing bookable for this pairing
                if slots.is_empty() {
                    continue;
                }

                bikes.push(GbfsBike {
                    bike_id: format!(
                        "gts-{}-{}-{}",
                        self.config.community_id, station.id, model.id
                    ),
                    lat: station.latitude,
                    lon: station.longitude,
                    vehicle_type_id: Some(self.vehicle_type_id(&model.vehicle_type)),
                    current_range_meters: None,
                    rental_uris: None,
                    is_reserved: false,
                    is_disabled: false,
                });
            }
        }

        Ok(FreeBikeStatusDoc {
            data: FreeBikeStatusData { bikes },
        })
    }

    /// Map the proprietary model catalog onto GBFS vehicle-type entries.
    ///
    /// The GTS fleet is electric standing scooters; every entry classifies
    /// as an escooter downstream.
    async fn fetch_vehicle_types(&self) -> Result<VehicleTypesDoc, FeedError> {
        let page: VehicleTypesPage = self.post_to("/v2/explore/vehicle-types", json!({})).await?;

        let vehicle_types = page
            .embedded
            .vehicle_types
            .iter()
            .map(|vt| VehicleTypeEntry {
                vehicle_type_id: self.vehicle_type_id(&vt.key),
                form_factor: "scooter".to_string(),
                propulsion_type: "electric".to_string(),
                max_range_meters: None,
            })
            .collect();

        Ok(VehicleTypesDoc {
            data: VehicleTypesData { vehicle_types },
        })
    }
}
