//! Respend detection for one incoming transaction.

use std::sync::Arc;

use cashnode_dsproof::{ProofId, Validity};
use cashnode_mempool::{PoolState, TxMempool};
use cashnode_types::{MisbehaviorSink, OutPoint, Transaction};
use tracing::{debug, error};

use crate::action::RespendActionPtr;
use crate::filter::RespentFilter;

/// What the detector needs to resolve orphan proofs waiting on the
/// transaction's inputs.
pub struct OrphanRescue<'a> {
    pub misbehavior: &'a dyn MisbehaviorSink,
    /// Charged to the sender of an orphan that turns out invalid.
    pub invalid_orphan_penalty: u32,
}

/// Scans a transaction's inputs for outpoints already spent by mempool
/// transactions and drives the actions through the conflict, validity and
/// trigger steps. Actions are triggered when the detector is dropped.
pub struct RespendDetector<'a> {
    conflicting_outpoints: Vec<OutPoint>,
    actions: Vec<RespendActionPtr>,
    respent_before: &'a RespentFilter,
    dsproof: Option<ProofId>,
}

impl<'a> RespendDetector<'a> {
    pub fn new(
        pool: &TxMempool,
        tx: &Arc<Transaction>,
        actions: Vec<RespendActionPtr>,
        respent_before: &'a RespentFilter,
    ) -> Self {
        Self::with_orphan_rescue(pool, tx, actions, respent_before, None)
    }

    /// Like [`new`](Self::new), additionally validating orphan proofs that
    /// contest one of `tx`'s inputs.
    pub fn with_orphan_rescue(
        pool: &TxMempool,
        tx: &Arc<Transaction>,
        actions: Vec<RespendActionPtr>,
        respent_before: &'a RespentFilter,
        rescue: Option<&OrphanRescue<'_>>,
    ) -> Self {
        let mut detector = Self {
            conflicting_outpoints: Vec::new(),
            actions,
            respent_before,
            dsproof: None,
        };
        detector.check_for_respend(pool, tx, rescue);
        detector
    }

    fn check_for_respend(
        &mut self,
        pool: &TxMempool,
        tx: &Arc<Transaction>,
        rescue: Option<&OrphanRescue<'_>>,
    ) {
        let state = pool.read();

        for input in &tx.inputs {
            let outpoint = input.prevout;

            if let Some(rescue) = rescue {
                self.rescue_orphans(pool, &state, tx, &outpoint, rescue);
            }

            let Some(spent_txid) = state.next_spender(&outpoint).copied() else {
                continue;
            };
            self.conflicting_outpoints.push(outpoint);

            let Some(entry) = state.entry(&spent_txid) else {
                continue;
            };
            let seen_before = self.respent_before.contains(&outpoint);
            let is_equivalent = tx.is_equivalent_to(entry.tx());

            let mut collect_more = false;
            for action in &self.actions {
                let more = action.lock().add_outpoint_conflict(
                    &outpoint,
                    &spent_txid,
                    tx,
                    seen_before,
                    is_equivalent,
                );
                collect_more = collect_more || more;
            }
            if !collect_more {
                return;
            }
        }
    }

    /// Validate the orphans contesting `outpoint` against `tx`. The first
    /// valid one is remembered, the rest are dropped.
    ///
    /// The remembered proof stays an orphan: the caller claims it with
    /// [`TxMempool::attach_rescued_proof`] once `tx` is in the pool.
    fn rescue_orphans(
        &mut self,
        pool: &TxMempool,
        state: &PoolState,
        tx: &Arc<Transaction>,
        outpoint: &OutPoint,
        rescue: &OrphanRescue<'_>,
    ) {
        let storage = pool.double_spend_proof_storage();
        let mut orphans = storage.find_orphans(outpoint).into_iter();

        while let Some((id, peer)) = orphans.next() {
            let Some(proof) = storage.proof(id) else {
                continue;
            };
            debug!(target: "dsproof", proof_id = id, "rescued a dsproof orphan");

            match proof.validate(state, Some(tx.as_ref())) {
                Validity::Valid => {
                    debug!(target: "dsproof", proof_id = id, "orphan dsproof validated");
                    self.dsproof = Some(id);
                    for (other, _) in orphans.by_ref() {
                        storage.remove(other);
                        debug!(target: "dsproof", proof_id = other, "removing orphan dsproof, one is enough");
                    }
                    break;
                }
                Validity::Invalid => {
                    debug!(target: "dsproof", proof = %proof.hash(), "orphan dsproof did not validate");
                    storage.remove(id);
                    rescue
                        .misbehavior
                        .misbehaving(peer, rescue.invalid_orphan_penalty, "invalid orphan dsproof");
                }
                outcome => {
                    debug!(target: "dsproof", proof_id = id, %outcome, "orphan dsproof still unresolved");
                }
            }
        }
    }

    /// Record the validity of the transaction. Valid respends mark their
    /// conflicting outpoints as respent for later detectors.
    pub fn set_valid(&self, valid: bool) {
        if valid {
            self.respent_before.insert_all(&self.conflicting_outpoints);
        }
        for action in &self.actions {
            action.lock().set_valid(valid);
        }
    }

    pub fn is_respend(&self) -> bool {
        !self.conflicting_outpoints.is_empty()
    }

    pub fn is_interesting(&self) -> bool {
        self.actions.iter().any(|action| action.lock().is_interesting())
    }

    /// The orphan proof validated against this transaction, if any. It is
    /// still an orphan until attached.
    pub fn dsproof_id(&self) -> Option<ProofId> {
        self.dsproof
    }

    pub fn conflicting_outpoints(&self) -> &[OutPoint] {
        &self.conflicting_outpoints
    }
}

impl Drop for RespendDetector<'_> {
    fn drop(&mut self) {
        for action in &self.actions {
            if let Err(e) = action.lock().trigger() {
                error!(target: "respend", error = %e, "respend action failed");
            }
        }
    }
}
