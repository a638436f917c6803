//! cashnode-daemon binary.

use std::fs::OpenOptions;
use std::sync::Arc;

use cashnode_daemon::cleanup::spawn_cleanup;
use cashnode_daemon::config::AdvancedConfig;
use cashnode_daemon::{DaemonConfig, Node, PeerRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    init_tracing(&config.advanced)?;
    info!(data_dir = ?config.data_dir(), "cashnode daemon starting");

    // 3. Build node state
    let peers = Arc::new(PeerRegistry::new(config.network.max_connections as usize));
    let node = Arc::new(Node::new(config, peers));

    // 4. Orphan proof expiry
    let cleanup = node
        .config()
        .dsproof
        .enabled
        .then(|| spawn_cleanup(Arc::clone(&node)));
    if cleanup.is_none() {
        info!("double-spend proofs disabled");
    }

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");

    if let Some(task) = cleanup {
        task.abort();
    }
    info!("Daemon stopped");
    Ok(())
}

/// `RUST_LOG` wins; otherwise every cashnode target logs at the configured
/// level.
fn init_tracing(advanced: &AdvancedConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = &advanced.log_level;
            EnvFilter::try_new(format!("cashnode={level},dsproof={level},respend={level}"))?
        }
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if advanced.log_file.is_empty() {
        builder.init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&advanced.log_file)?;
        builder
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }
    Ok(())
}
