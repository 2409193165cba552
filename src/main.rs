//! mobility-sync - Vendor fleet feed synchronization engine
//!
//! This binary runs one sync batch per invocation; an external scheduler
//! provides periodicity. Each batch executes every registered vendor run for
//! one component kind (or all kinds) and reports per-run outcomes.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mobility_sync::config::Config;
use mobility_sync::database::{Database, SqliteDatabase};
use mobility_sync::sync::{BatchOutcome, BatchRunner, ComponentKind, SyncableRegistry};

/// mobility-sync - Vendor fleet feed synchronization engine
#[derive(Parser, Debug)]
#[command(name = "mobility-sync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "MOBILITY_SYNC_CONFIG")]
    config: Option<String>,

    /// Sync only one component (free-bike-status, geofencing-zone,
    /// model-availability); all components when omitted
    #[arg(long)]
    component: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting mobility-sync batch"
    );

    let kinds: Vec<ComponentKind> = match &args.component {
        Some(name) => vec![name
            .parse()
            .map_err(|e: String| anyhow::anyhow!("Invalid --component: {e}"))?],
        None => ComponentKind::ALL.to_vec(),
    };

    // Initialize database
    let database = SqliteDatabase::new(&config.database.path).await?;
    let database: Arc<dyn Database> = Arc::new(database);
    info!(path = %config.database.path, "Database initialized");

    // Build the registry and run the requested batches
    let registry = SyncableRegistry::from_config(&config, Arc::clone(&database));
    info!(vendors = ?registry.vendors(), "Vendor registry initialized");

    let runner = BatchRunner::new(&config.sync);
    let mut outcomes: Vec<BatchOutcome> = Vec::new();
    for kind in kinds {
        outcomes.extend(runner.run_batch(&registry, kind).await);
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(
        runs = outcomes.len(),
        failed = failed,
        "mobility-sync batch complete"
    );

    // Partial failure is an expected steady state; the next scheduled tick
    // retries. A batch where nothing succeeded signals an operator problem.
    if !outcomes.is_empty() && failed == outcomes.len() {
        anyhow::bail!("every sync run failed ({failed} of {failed})");
    }

    Ok(())
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}
