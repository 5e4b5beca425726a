// pollnode - development node
// Runs the lifecycle monitor and identity registry against the
// in-memory ledger, with a sled-backed mapping store. Useful for
// watching the protocol drive a seeded election end to end.

use civicpoll::clock::SystemClock;
use civicpoll::election::{ElectionSpec, LifecycleMonitor, MonitorConfig};
use civicpoll::ledger::{InMemoryLedger, Uint256};
use civicpoll::registry::{IdentityRegistry, RegistryConfig, SledMappingStore};
use civicpoll::submitter::{SubmitterConfig, TxSubmitter};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pollnode", about = "Civic voting development node")]
struct Args {
    /// Path for the identity mapping store
    #[arg(long, default_value = "./pollnode-db")]
    db_path: PathBuf,

    /// Salt for hashed identifier keys
    #[arg(long, env = "POLLNODE_SALT", default_value = "pollnode-dev-salt")]
    salt: String,

    /// Lifecycle monitor polling period in seconds
    #[arg(long, default_value_t = 10)]
    poll_interval_secs: u64,

    /// Seconds from now until the seeded demo election opens
    #[arg(long, default_value_t = 15)]
    demo_start_in_secs: u64,

    /// Length of the seeded demo election's voting window in seconds
    #[arg(long, default_value_t = 60)]
    demo_window_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let registry_config = RegistryConfig::new().with_salt(&args.salt);
    registry_config.validate()?;
    let monitor_config = MonitorConfig::new().with_poll_interval_secs(args.poll_interval_secs);
    monitor_config.validate()?;

    let ledger = Arc::new(InMemoryLedger::new());
    let submitter = Arc::new(TxSubmitter::new(ledger.clone(), SubmitterConfig::default()));
    let store = Arc::new(SledMappingStore::open(&args.db_path)?);
    let registry = IdentityRegistry::new(
        ledger.clone(),
        submitter.clone(),
        store,
        registry_config,
    );

    // Demo registration; idempotent across restarts with the same store
    let outcome = registry
        .register("demo-resident-0001", Uint256::from_u64(42))
        .await?;
    info!(
        registered = outcome.registered,
        group_id = outcome.group_id,
        "demo identity registered"
    );

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let spec = ElectionSpec::new(
        "Demo election",
        "City center",
        now + args.demo_start_in_secs,
        now + args.demo_start_in_secs + args.demo_window_secs,
    )
    .with_proposal("demo-data-cid-a", "demo-image-cid-a")
    .with_proposal("demo-data-cid-b", "demo-image-cid-b");
    let election_id = ledger.seed_election(&spec);
    info!(
        election_id,
        starts_in_secs = args.demo_start_in_secs,
        window_secs = args.demo_window_secs,
        "seeded demo election"
    );

    let monitor = LifecycleMonitor::new(
        ledger,
        submitter,
        Arc::new(SystemClock::new()),
        monitor_config,
    );
    monitor.run().await;

    Ok(())
}
