//! Syncable registry
//!
//! Maps vendor keys to factories that wire ready-to-run [`VendorSyncRun`]
//! instances for a requested component kind. The registry decouples what to
//! sync (the component) from who to sync for (vendor credentials, markets,
//! capabilities): adding a vendor never touches transformation logic.
//!
//! The registry is an explicit value built once at startup and passed by
//! reference; there is no process-global mutable state.

use std::sync::Arc;
use tracing::debug;

use crate::config::{Config, GbfsVendorConfig, GtsVendorConfig};
use crate::database::Database;
use crate::feed::{GbfsClientConfig, GbfsFeedClient, GtsAccessConfig, GtsFeedClient};
use crate::sync::component::{ComponentKind, SyncComponent};
use crate::sync::free_bike_status::FreeBikeStatusSync;
use crate::sync::geofencing_zone::GeofencingZoneSync;
use crate::sync::model_availability::ModelAvailabilitySync;
use crate::sync::run::VendorSyncRun;

/// Construct a fresh component instance.
///
/// Each run gets its own component so memoized prefetch state is never
/// shared between runs.
fn build_component(kind: ComponentKind) -> Box<dyn SyncComponent> {
    match kind {
        ComponentKind::FreeBikeStatus => Box::new(FreeBikeStatusSync::new()),
        ComponentKind::GeofencingZone => Box::new(GeofencingZoneSync::new()),
        ComponentKind::ModelAvailability => Box::new(ModelAvailabilitySync::new()),
    }
}

/// Trait for vendor sync factories
///
/// A factory owns every vendor-specific concern: whether the integration is
/// configured at all (an unconfigured vendor yields an empty list, not an
/// error), which component kinds it supports, and how many markets it spans
/// (N markets yield N runs, each with its own feed client and service scope).
pub trait VendorSyncFactory: Send + Sync {
    /// The vendor key (e.g. "lime", "lyft")
    fn vendor(&self) -> &str;

    /// Build the runs this vendor contributes for one component kind
    fn runs_for(&self, kind: ComponentKind) -> Vec<VendorSyncRun>;
}

/// Factory for standard GBFS vendors
pub struct GbfsVendorFactory {
    vendor: String,
    config: Option<GbfsVendorConfig>,
    db: Arc<dyn Database>,
}

impl GbfsVendorFactory {
    /// Component kinds a standard GBFS feed can serve
    const CAPABILITIES: &'static [ComponentKind] = &[
        ComponentKind::FreeBikeStatus,
        ComponentKind::GeofencingZone,
    ];

    /// Create a factory; `config` is None when the vendor is unconfigured
    pub fn new(
        vendor: impl Into<String>,
        config: Option<GbfsVendorConfig>,
        db: Arc<dyn Database>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            config,
            db,
        }
    }
}

impl VendorSyncFactory for GbfsVendorFactory {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn runs_for(&self, kind: ComponentKind) -> Vec<VendorSyncRun> {
        if !Self::CAPABILITIES.contains(&kind) {
            return Vec::new();
        }
        let Some(config) = &self.config else {
            return Vec::new();
        };
        if !config.enabled {
            return Vec::new();
        }

        config
            .markets
            .iter()
            .map(|market| {
                let mut client_config = GbfsClientConfig::new(market.feed_root.clone());
                client_config.timeout_secs = config.timeout_secs;
                if let Some(token) = &config.auth_token {
                    client_config = client_config.with_auth_token(token.clone());
                }

                let slug = market
                    .vendor_slug
                    .clone()
                    .unwrap_or_else(|| self.vendor.clone());

                VendorSyncRun::new(
                    slug,
                    Arc::new(GbfsFeedClient::new(client_config)),
                    build_component(kind),
                    Arc::clone(&self.db),
                )
            })
            .collect()
    }
}

/// Factory for the proprietary GTS integration
pub struct GtsVendorFactory {
    vendor: String,
    config: Option<GtsVendorConfig>,
    db: Arc<dyn Database>,
}

impl GtsVendorFactory {
    /// Create a factory; `config` is None when the vendor is unconfigured
    pub fn new(
        vendor: impl Into<String>,
        config: Option<GtsVendorConfig>,
        db: Arc<dyn Database>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            config,
            db,
        }
    }
}

impl VendorSyncFactory for GtsVendorFactory {
    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn runs_for(&self, kind: ComponentKind) -> Vec<VendorSyncRun> {
        // The availability API serves slot data only
        if kind != ComponentKind::ModelAvailability {
            return Vec::new();
        }
        let Some(config) = &self.config else {
            return Vec::new();
        };
        if !config.enabled {
            return Vec::new();
        }

        config
            .access
            .iter()
            .map(|access| {
                let slug = access
                    .vendor_slug
                    .clone()
                    .unwrap_or_else(|| self.vendor.clone());

                let mut access_config = GtsAccessConfig::new(
                    config.api_host.clone(),
                    access.scheme_key.clone(),
                    access.community_id,
                    slug.clone(),
                );
                access_config.timeout_secs = config.timeout_secs;

                VendorSyncRun::new(
                    slug,
                    Arc::new(GtsFeedClient::new(access_config)),
                    build_component(kind),
                    Arc::clone(&self.db),
                )
            })
            .collect()
    }
}

/// Append-only mapping from vendor key to run factory
#[derive(Default)]
pub struct SyncableRegistry {
    factories: Vec<Arc<dyn VendorSyncFactory>>,
}

impl SyncableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from application configuration.
    ///
    /// Every known vendor is registered unconditionally; factories for
    /// unconfigured or disabled vendors simply yield no runs.
    pub fn from_config(config: &Config, db: Arc<dyn Database>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GbfsVendorFactory::new(
            "lime",
            config.vendors.lime.clone(),
            Arc::clone(&db),
        )));
        registry.register(Arc::new(GbfsVendorFactory::new(
            "lyft",
            config.vendors.lyft.clone(),
            Arc::clone(&db),
        )));
        registry.register(Arc::new(GtsVendorFactory::new(
            "gts",
            config.vendors.gts.clone(),
            Arc::clone(&db),
        )));
        registry
    }

    /// Append a factory
    pub fn register(&mut self, factory: Arc<dyn VendorSyncFactory>) {
        debug!(vendor = factory.vendor(), "Registered vendor sync factory");
        self.factories.push(factory);
    }

    /// Registered vendor keys, in registration order
    pub fn vendors(&self) -> Vec<&str> {
        self.factories.iter().map(|f| f.vendor()).collect()
    }

    /// Collect every run the registered vendors contribute for a component
    pub fn runs_for(&self, kind: ComponentKind) -> Vec<VendorSyncRun> {
        self.factories
            .iter()
            .flat_map(|factory| factory.runs_for(kind))
            .collect()
    }
}
