//! One vendor sync run
//!
//! A run wires a feed client, one vendor's service scope, and a sync
//! component together, and performs the transactional merge against the
//! component's target table.

use std::sync::Arc;
use tracing::{debug, info};

use crate::database::Database;
use crate::error::SyncError;
use crate::feed::FeedClient;
use crate::sync::component::{ComponentKind, SyncComponent, SyncRow};

/// Orchestrates one (feed client, vendor, component) triple
pub struct VendorSyncRun {
    vendor: String,
    client: Arc<dyn FeedClient>,
    component: Box<dyn SyncComponent>,
    db: Arc<dyn Database>,
}

impl VendorSyncRun {
    /// Create a new run
    pub fn new(
        vendor: impl Into<String>,
        client: Arc<dyn FeedClient>,
        component: Box<dyn SyncComponent>,
        db: Arc<dyn Database>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            client,
            component,
            db,
        }
    }

    /// The vendor key this run is scoped to
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// The component kind this run executes
    pub fn kind(&self) -> ComponentKind {
        self.component.kind()
    }

    /// Run the full fetch → transform → merge sequence.
    ///
    /// Collects rows across every mobility service owned by this vendor
    /// scope, then reconciles the target table in a single transaction: an
    /// empty collection clears the scoped rows, anything else replaces them
    /// as an atomic diff. Returns the incoming row count. Any error aborts
    /// this run with prior state untouched.
    pub async fn sync_all(&self) -> Result<u64, SyncError> {
        self.component.before_sync(self.client.as_ref()).await?;

        let services = self.db.list_vendor_services(&self.vendor).await?;
        let mut scope = Vec::with_capacity(services.len());
        let mut rows: Vec<SyncRow> = Vec::new();
        for service in &services {
            rows.extend(self.component.produce_rows(service)?);
            scope.extend(service.id);
        }

        debug!(
            vendor = self.vendor,
            component = %self.component.kind(),
            services = services.len(),
            rows = rows.len(),
            "Collected sync rows"
        );

        let written = self
            .db
            .merge_rows(self.component.merge_spec(), &scope, rows)
            .await?;

        info!(
            vendor = self.vendor,
            component = %self.component.kind(),
            rows = written,
            "Vendor sync completed"
        );

        Ok(written)
    }
}

impl std::fmt::Debug for VendorSyncRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorSyncRun")
            .field("vendor", &self.vendor)
            .field("component", &self.component.kind())
            .finish_non_exhaustive()
    }
}
