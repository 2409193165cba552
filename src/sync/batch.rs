//! Batch execution of vendor sync runs
//!
//! Executes every registered run of one component kind: worker tasks bounded
//! by a concurrency limit, runs of the same vendor and component serialized
//! so their diffs never race, and per-run outcomes reported without letting
//! one vendor's failure touch its siblings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::sync::component::ComponentKind;
use crate::sync::registry::SyncableRegistry;

/// Result of one vendor sync run within a batch
#[derive(Debug)]
pub struct BatchOutcome {
    /// Vendor-service scope the run was bound to
    pub vendor: String,
    /// Component kind executed
    pub kind: ComponentKind,
    /// Rows written, or why the run aborted
    pub result: Result<u64, SyncError>,
}

/// Executes batches of vendor sync runs
pub struct BatchRunner {
    semaphore: Arc<Semaphore>,
    run_timeout: Duration,
    run_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl BatchRunner {
    /// Create a runner from batch configuration
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_runs.max(1))),
            run_timeout: Duration::from_secs(config.run_timeout_secs),
            run_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Execute every registered run of one component kind.
    ///
    /// Failures are reported per run; a failed vendor never aborts the batch.
    pub async fn run_batch(
        &self,
        registry: &SyncableRegistry,
        kind: ComponentKind,
    ) -> Vec<BatchOutcome> {
        let runs = registry.runs_for(kind);
        info!(component = %kind, runs = runs.len(), "Starting sync batch");

        let mut handles = Vec::with_capacity(runs.len());
        for run in runs {
            let vendor = run.vendor().to_string();
            let run_kind = run.kind();
            let semaphore = Arc::clone(&self.semaphore);
            let run_locks = Arc::clone(&self.run_locks);
            let run_timeout = self.run_timeout;

            handles.push((
                vendor.clone(),
                run_kind,
                tokio::spawn(async move {
                    // Serialization lock first: a run waiting on its
                    // vendor+component key must not hold a worker permit.
                    let lock = {
                        let mut locks = run_locks.lock().await;
                        Arc::clone(
                            locks
                                .entry(format!("{vendor}/{run_kind}"))
                                .or_insert_with(|| Arc::new(Mutex::new(()))),
                        )
                    };
                    let _run_guard = lock.lock().await;
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("Semaphore closed unexpectedly");

                    let result = match tokio::time::timeout(run_timeout, run.sync_all()).await {
                        Ok(result) => result,
                        Err(_) => Err(SyncError::Timeout),
                    };

                    match &result {
                        Ok(rows) => info!(
                            vendor = vendor,
                            component = %run_kind,
                            rows = rows,
                            "Sync run succeeded"
                        ),
                        Err(err) => warn!(
                            vendor = vendor,
                            component = %run_kind,
                            error = %err,
                            "Sync run failed"
                        ),
                    }

                    BatchOutcome {
                        vendor,
                        kind: run_kind,
                        result,
                    }
                }),
            ));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (vendor, run_kind, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => outcomes.push(BatchOutcome {
                    vendor,
                    kind: run_kind,
                    result: Err(SyncError::Internal(format!("sync task panicked: {err}"))),
                }),
            }
        }

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            component = %kind,
            succeeded = outcomes.len() - failed,
            failed = failed,
            "Sync batch finished"
        );

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Database, SqliteDatabase};
    use crate::feed::FakeFeedClient;
    use crate::models::VendorService;
    use crate::sync::component::{MergeSpec, SyncComponent, SyncRow};
    use crate::sync::free_bike_status::{FreeBikeStatusSync, VEHICLE_MERGE_SPEC};
    use crate::sync::registry::VendorSyncFactory;
    use crate::sync::run::VendorSyncRun;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn working_client() -> Arc<FakeFeedClient> {
        let vehicle_types = serde_json::from_value(json!({
            "data": {"vehicle_types": [{
                "vehicle_type_id": "abc123",
                "form_factor": "scooter",
                "propulsion_type": "electric",
                "max_range_meters": 12_000.0
            }]}
        }))
        .unwrap();
        let bikes = serde_json::from_value(json!({
            "data": {"bikes": [
                {"bike_id": "b1", "lat": 1.0, "lon": 2.0,
                 "vehicle_type_id": "abc123", "current_range_meters": 6000.0}
            ]}
        }))
        .unwrap();

        Arc::new(
            FakeFeedClient::new()
                .with_vehicle_types(vehicle_types)
                .with_free_bike_status(bikes),
        )
    }

    /// Factory producing one run per prepared (vendor, client) pair
    struct TestFactory {
        vendor: String,
        clients: Vec<(String, Arc<FakeFeedClient>)>,
        db: Arc<dyn Database>,
    }

    impl VendorSyncFactory for TestFactory {
        fn vendor(&self) -> &str {
            &self.vendor
        }

        fn runs_for(&self, kind: ComponentKind) -> Vec<VendorSyncRun> {
            if kind != ComponentKind::FreeBikeStatus {
                return Vec::new();
            }
            self.clients
                .iter()
                .map(|(slug, client)| {
                    VendorSyncRun::new(
                        slug.clone(),
                        Arc::clone(client) as Arc<dyn crate::feed::FeedClient>,
                        Box::new(FreeBikeStatusSync::new()),
                        Arc::clone(&self.db),
                    )
                })
                .collect()
        }
    }

    // Test 1: A transport failure for one vendor never affects its siblings
    #[tokio::test]
    async fn test_vendor_isolation() {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let lime_sid = db
            .insert_vendor_service(&VendorService::new("lime", "Lime"))
            .await
            .unwrap();
        db.insert_vendor_service(&VendorService::new("lyft", "Biketown"))
            .await
            .unwrap();

        let mut registry = SyncableRegistry::new();
        registry.register(Arc::new(TestFactory {
            vendor: "lime".to_string(),
            clients: vec![("lime".to_string(), working_client())],
            db: Arc::clone(&db),
        }));
        // Lyft's client has no fixtures and fails every fetch
        registry.register(Arc::new(TestFactory {
            vendor: "lyft".to_string(),
            clients: vec![("lyft".to_string(), Arc::new(FakeFeedClient::new()))],
            db: Arc::clone(&db),
        }));

        let runner = BatchRunner::new(&SyncConfig::default());
        let outcomes = runner
            .run_batch(&registry, ComponentKind::FreeBikeStatus)
            .await;

        assert_eq!(outcomes.len(), 2);
        let lime = outcomes.iter().find(|o| o.vendor == "lime").unwrap();
        let lyft = outcomes.iter().find(|o| o.vendor == "lyft").unwrap();
        assert!(matches!(lime.result, Ok(1)));
        assert!(lyft.result.is_err());

        // The healthy vendor's rows landed despite the sibling failure
        assert_eq!(db.list_vehicles(lime_sid).await.unwrap().len(), 1);
    }

    /// Component that records how many runs of it execute concurrently
    struct OverlapProbe {
        current: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SyncComponent for OverlapProbe {
        fn kind(&self) -> ComponentKind {
            ComponentKind::FreeBikeStatus
        }

        fn merge_spec(&self) -> &'static MergeSpec {
            &VEHICLE_MERGE_SPEC
        }

        async fn before_sync(&self, _client: &dyn crate::feed::FeedClient) -> Result<(), SyncError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        fn produce_rows(&self, _service: &VendorService) -> Result<Vec<SyncRow>, SyncError> {
            Ok(Vec::new())
        }
    }

    struct ProbeFactory {
        vendor: String,
        runs: usize,
        current: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
        db: Arc<dyn Database>,
    }

    impl VendorSyncFactory for ProbeFactory {
        fn vendor(&self) -> &str {
            &self.vendor
        }

        fn runs_for(&self, _kind: ComponentKind) -> Vec<VendorSyncRun> {
            (0..self.runs)
                .map(|_| {
                    VendorSyncRun::new(
                        self.vendor.clone(),
                        Arc::new(FakeFeedClient::new()) as Arc<dyn crate::feed::FeedClient>,
                        Box::new(OverlapProbe {
                            current: Arc::clone(&self.current),
                            max_seen: Arc::clone(&self.max_seen),
                        }),
                        Arc::clone(&self.db),
                    )
                })
                .collect()
        }
    }

    // Test 2: Runs of the same vendor are serialized
    #[tokio::test]
    async fn test_same_vendor_runs_serialized() {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::in_memory().await.unwrap());
        let current = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut registry = SyncableRegistry::new();
        registry.register(Arc::new(ProbeFactory {
            vendor: "lime".to_string(),
            runs: 3,
            current: Arc::clone(&current),
            max_seen: Arc::clone(&max_seen),
            db,
        }));

        let runner = BatchRunner::new(&SyncConfig {
            max_concurrent_runs: 8,
            run_timeout_secs: 10,
        });
        let outcomes = runner
            .run_batch(&registry, ComponentKind::FreeBikeStatus)
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    // Test 3: A run exceeding the watchdog fails with a timeout
    #[tokio::test]
    async fn test_run_timeout() {
        let db: Arc<dyn Database> = Arc::new(SqliteDatabase::in_memory().await.unwrap());

        struct SlowProbe;

        #[async_trait]
        impl SyncComponent for SlowProbe {
            fn kind(&self) -> ComponentKind {
                ComponentKind::FreeBikeStatus
            }

            fn merge_spec(&self) -> &'static MergeSpec {
                &VEHICLE_MERGE_SPEC
            }

            async fn before_sync(
                &self,
                _client: &dyn crate::feed::FeedClient,
            ) -> Result<(), SyncError> {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            }

            fn produce_rows(&self, _service: &VendorService) -> Result<Vec<SyncRow>, SyncError> {
                Ok(Vec::new())
            }
        }

        struct SlowFactory {
            db: Arc<dyn Database>,
        }

        impl VendorSyncFactory for SlowFactory {
            fn vendor(&self) -> &str {
                "slow"
            }

            fn runs_for(&self, _kind: ComponentKind) -> Vec<VendorSyncRun> {
                vec![VendorSyncRun::new(
                    "slow",
                    Arc::new(FakeFeedClient::new()) as Arc<dyn crate::feed::FeedClient>,
                    Box::new(SlowProbe),
                    Arc::clone(&self.db),
                )]
            }
        }

        let mut registry = SyncableRegistry::new();
        registry.register(Arc::new(SlowFactory { db }));

        let runner = BatchRunner::new(&SyncConfig {
            max_concurrent_runs: 1,
            run_timeout_secs: 1,
        });
        let outcomes = runner
            .run_batch(&registry, ComponentKind::FreeBikeStatus)
            .await;

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0].result, Err(SyncError::Timeout)));
    }
}
