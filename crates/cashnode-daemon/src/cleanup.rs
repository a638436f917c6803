//! Periodic expiry of orphan double-spend proofs.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::node::Node;

/// Run [`Node::periodic_cleanup`] after the configured initial delay and then
/// on every cleanup interval, until the task is aborted.
pub fn spawn_cleanup(node: Arc<Node>) -> JoinHandle<()> {
    let config = &node.config().dsproof;
    let delay = Duration::from_secs(config.initial_cleanup_delay_secs);
    let period = Duration::from_secs(config.cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + delay, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let expired = node.periodic_cleanup();
            if expired > 0 {
                info!(target: "dsproof", expired, "expired orphan dsproofs");
            } else {
                debug!(target: "dsproof", "dsproof cleanup found nothing to expire");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaemonConfig;
    use crate::peers::PeerRegistry;
    use cashnode_dsproof::testutil::{Scenario, SigKind};
    use cashnode_dsproof::DoubleSpendProof;
    use cashnode_script::sighash::{SIGHASH_ALL, SIGHASH_FORKID};

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_runs_after_initial_delay() {
        let peers = Arc::new(PeerRegistry::new(8));
        let (peer, _inbox) = peers.connect(true).expect("connect");
        let node = Arc::new(Node::new(DaemonConfig::default(), Arc::clone(&peers)));

        let s = Scenario::new(SigKind::Ecdsa, SIGHASH_ALL | SIGHASH_FORKID);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let storage = node.pool().double_spend_proof_storage();
        storage.add_orphan_at(proof, peer, 0).expect("orphan");

        let task = spawn_cleanup(Arc::clone(&node));

        tokio::time::sleep(Duration::from_secs(119)).await;
        assert_eq!(storage.orphans_len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(storage.orphans_len(), 0);
        assert!(storage.is_empty());
        assert_eq!(peers.misbehavior(peer), Some(1));

        task.abort();
    }
}
