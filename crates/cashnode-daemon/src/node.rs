//! Message handling: transaction admission with respend detection, and the
//! double-spend proof protocol messages.

use std::sync::Arc;

use cashnode_dsproof::{broadcast_dsp_inv, DoubleSpendProof, ProofContext, Validity};
use cashnode_mempool::{MempoolError, TxMempool};
use cashnode_respend::{
    create_default_actions, OrphanRescue, ProofAction, RelayLimiter, RespendActionPtr,
    RespendDetector, RespentFilter,
};
use cashnode_types::network::{relays_transactions, MSG_DOUBLESPENDPROOF, MSG_TX};
use cashnode_types::{Hash256, Inventory, InventorySink, MisbehaviorSink, PeerId, Transaction};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::message::{NetMessage, Reject, DSPROOF_COMMAND, REJECT_INVALID};
use crate::peers::PeerRegistry;
use crate::validation::{verify_inputs, ValidationError};

/// Why a transaction was not admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("transaction {0} already known")]
    AlreadyKnown(Hash256),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Mempool(#[from] MempoolError),
}

/// The node's mempool, peers and respend state.
pub struct Node {
    config: DaemonConfig,
    pool: Arc<TxMempool>,
    peers: Arc<PeerRegistry>,
    respent: RespentFilter,
    limiter: Arc<RelayLimiter>,
    // Serializes admissions so detection and insertion see the same pool.
    admission: Mutex<()>,
}

impl Node {
    pub fn new(config: DaemonConfig, peers: Arc<PeerRegistry>) -> Self {
        let pool = Arc::new(TxMempool::new(config.dsproof.storage_params()));
        let respent = RespentFilter::new(
            config.respend.respent_filter_capacity,
            config.respend.respent_filter_fp_rate,
        );
        let limiter = Arc::new(RelayLimiter::new(config.respend.relay_limits()));
        Self {
            config,
            pool,
            peers,
            respent,
            limiter,
            admission: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<TxMempool> {
        &self.pool
    }

    pub fn peers(&self) -> &Arc<PeerRegistry> {
        &self.peers
    }

    pub fn handle_message(&self, peer: PeerId, msg: NetMessage) {
        debug!(peer, command = msg.command(), "received message");
        match msg {
            NetMessage::Tx(tx) => {
                let txid = tx.txid();
                if let Err(e) = self.accept_transaction(tx) {
                    debug!(peer, %txid, error = %e, "transaction not accepted");
                }
            }
            NetMessage::DsProof(bytes) => self.on_dsproof(peer, &bytes),
            NetMessage::Inv(items) => self.on_inv(peer, &items),
            NetMessage::GetData(items) => self.on_getdata(peer, &items),
            NetMessage::Reject(reject) => {
                debug!(peer, message = %reject.message, reason = %reject.reason, "peer rejected");
            }
        }
    }

    fn respend_actions(&self) -> Vec<RespendActionPtr> {
        let sink: Arc<dyn InventorySink> = self.peers.clone();
        let mut actions = create_default_actions(
            Arc::clone(&sink),
            Arc::clone(&self.limiter),
            self.config.respend.log_respends,
        );
        if self.config.dsproof.enabled {
            actions.push(Arc::new(Mutex::new(ProofAction::new(
                Arc::clone(&self.pool),
                sink,
            ))));
        }
        actions
    }

    /// Admit `tx` to the mempool.
    ///
    /// Respends are never admitted; an interesting one is fully validated so
    /// the respend actions can relay it or turn it into a proof.
    pub fn accept_transaction(
        &self,
        tx: Arc<Transaction>,
    ) -> Result<Arc<Transaction>, AdmissionError> {
        let _admission = self.admission.lock();
        let txid = tx.txid();
        if self.pool.read().contains(&txid) {
            return Err(AdmissionError::AlreadyKnown(txid));
        }

        let rescue = OrphanRescue {
            misbehavior: self.peers.as_ref(),
            invalid_orphan_penalty: self.config.dsproof.invalid_orphan_penalty,
        };
        let detector = RespendDetector::with_orphan_rescue(
            &self.pool,
            &tx,
            self.respend_actions(),
            &self.respent,
            self.config.dsproof.enabled.then_some(&rescue),
        );

        let verified = verify_inputs(&*self.pool.read(), &tx);
        if detector.is_respend() && detector.is_interesting() {
            detector.set_valid(verified.is_ok());
        }
        verified?;

        // A rescued orphan is only claimed once its spender is in the pool.
        let added = self.pool.add_unchecked(Transaction::clone(&tx))?;
        let rescued = detector
            .dsproof_id()
            .and_then(|id| self.pool.attach_rescued_proof(&txid, id));
        detector.set_valid(true);
        info!(%txid, "accepted to mempool");

        if self.config.network.relay_txes {
            self.peers
                .broadcast_inventory(Inventory::tx(txid), &relays_transactions);
        }
        if let Some(proof) = rescued {
            broadcast_dsp_inv(self.peers.as_ref(), &txid, &proof.hash());
        }
        Ok(added)
    }

    fn on_dsproof(&self, peer: PeerId, bytes: &[u8]) {
        if !self.config.dsproof.enabled {
            return;
        }
        debug!(target: "dsproof", peer, "received a double spend proof");

        let proof = match DoubleSpendProof::from_bytes(bytes) {
            Ok(proof) if !proof.is_empty() => proof,
            Ok(_) => return self.reject_proof(peer, None, "double spend proof is empty"),
            Err(e) => return self.reject_proof(peer, None, &e.to_string()),
        };
        let hash = proof.hash();
        let storage = self.pool.double_spend_proof_storage();
        if storage.is_recently_rejected_proof(&hash) || storage.exists(&hash) {
            debug!(target: "dsproof", peer, proof = %hash, "ignoring known dsproof");
            return;
        }

        let validity = proof.validate(&*self.pool.read(), None);
        match validity {
            Validity::Valid => {
                debug!(target: "dsproof", peer, proof = %hash, "double spend proof is valid");
                match self.pool.add_double_spend_proof(proof) {
                    Ok(Some(tx)) => broadcast_dsp_inv(self.peers.as_ref(), &tx.txid(), &hash),
                    Ok(None) => {
                        debug!(target: "dsproof", proof = %hash, "spent transaction already has a dsproof");
                    }
                    Err(e) => warn!(target: "dsproof", proof = %hash, error = %e, "storing dsproof failed"),
                }
            }
            Validity::MissingTransaction | Validity::MissingUtxo => {
                debug!(target: "dsproof", peer, proof = %hash, %validity, "double spend proof is orphan: postponed");
                if let Err(e) = storage.add_orphan(proof, peer) {
                    warn!(target: "dsproof", proof = %hash, error = %e, "storing orphan dsproof failed");
                }
            }
            Validity::Invalid => {
                let reason = format!("double spend proof didn't validate ({hash})");
                self.reject_proof(peer, Some(&hash), &reason);
            }
        }
    }

    fn reject_proof(&self, peer: PeerId, hash: Option<&Hash256>, reason: &str) {
        debug!(target: "dsproof", peer, reason, "failure handling double spend proof");
        if let Some(hash) = hash {
            self.pool
                .double_spend_proof_storage()
                .mark_proof_rejected(hash);
        }
        self.peers
            .misbehaving(peer, self.config.dsproof.invalid_proof_penalty, reason);
    }

    fn on_inv(&self, peer: PeerId, items: &[Inventory]) {
        let storage = self.pool.double_spend_proof_storage();
        let wanted: Vec<Inventory> = items
            .iter()
            .filter(|inv| match inv.kind {
                MSG_TX => !self.pool.read().contains(&inv.hash),
                MSG_DOUBLESPENDPROOF => {
                    self.config.dsproof.enabled
                        && !storage.exists(&inv.hash)
                        && !storage.is_recently_rejected_proof(&inv.hash)
                }
                _ => false,
            })
            .copied()
            .collect();
        if !wanted.is_empty() {
            self.peers.send(peer, NetMessage::GetData(wanted));
        }
    }

    fn on_getdata(&self, peer: PeerId, items: &[Inventory]) {
        for inv in items {
            match inv.kind {
                MSG_TX => {
                    if let Some(tx) = self.pool.read().mempool_tx(&inv.hash) {
                        self.peers.send(peer, NetMessage::Tx(tx));
                    }
                }
                MSG_DOUBLESPENDPROOF if self.config.dsproof.enabled => {
                    let reply = match self.pool.double_spend_proof_storage().lookup(&inv.hash) {
                        Some(proof) => NetMessage::DsProof(proof.to_bytes()),
                        None => NetMessage::Reject(Reject {
                            message: DSPROOF_COMMAND.to_string(),
                            code: REJECT_INVALID,
                            reason: "dsproof requested was not found".to_string(),
                        }),
                    };
                    self.peers.send(peer, reply);
                }
                _ => {}
            }
        }
    }

    /// A new tip invalidates cached proof rejections.
    pub fn new_block_found(&self) {
        self.pool.double_spend_proof_storage().new_block_found();
    }

    /// Expire stale orphan proofs. Returns the number expired.
    pub fn periodic_cleanup(&self) -> usize {
        self.pool
            .double_spend_proof_storage()
            .periodic_cleanup(self.peers.as_ref())
    }
}
