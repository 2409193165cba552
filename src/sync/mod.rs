//! Sync orchestration
//!
//! The vendor-agnostic half of the engine: the [`SyncComponent`]
//! transformations, the per-vendor [`VendorSyncRun`] orchestrator, the
//! [`SyncableRegistry`] that wires vendors to runs, and the batch executor.

pub mod batch;
pub mod component;
pub mod free_bike_status;
pub mod geofencing_zone;
pub mod model_availability;
pub mod registry;
pub mod run;

// Re-export main types for convenience
pub use batch::{BatchOutcome, BatchRunner};
pub use component::{ComponentKind, MergeSpec, SyncComponent, SyncRow};
pub use free_bike_status::FreeBikeStatusSync;
pub use geofencing_zone::GeofencingZoneSync;
pub use model_availability::ModelAvailabilitySync;
pub use registry::{GbfsVendorFactory, GtsVendorFactory, SyncableRegistry, VendorSyncFactory};
pub use run::VendorSyncRun;
