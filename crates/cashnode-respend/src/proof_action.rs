//! Turning an observed respend into a double-spend proof.

use std::sync::Arc;

use cashnode_dsproof::{broadcast_dsp_inv, DoubleSpendProof, ProofContext};
use cashnode_mempool::TxMempool;
use cashnode_types::{Hash256, InventorySink, OutPoint, Transaction};
use tracing::debug;

use crate::action::RespendAction;
use crate::{RespendError, Result};

/// Builds a proof from the mempool transaction and its respend, stores it,
/// attaches it to the mempool entry and announces it.
///
/// Only the first conflicting outpoint is used, and only when the respend is
/// new and changes more than the unlocking scripts.
pub struct ProofAction {
    pool: Arc<TxMempool>,
    sink: Arc<dyn InventorySink>,
    conflict: Option<(OutPoint, Hash256, Arc<Transaction>)>,
    valid: bool,
}

impl ProofAction {
    pub fn new(pool: Arc<TxMempool>, sink: Arc<dyn InventorySink>) -> Self {
        Self {
            pool,
            sink,
            conflict: None,
            valid: false,
        }
    }
}

impl RespendAction for ProofAction {
    fn add_outpoint_conflict(
        &mut self,
        outpoint: &OutPoint,
        spent_txid: &Hash256,
        respend: &Arc<Transaction>,
        seen_before: bool,
        is_equivalent: bool,
    ) -> bool {
        if seen_before || is_equivalent {
            return true;
        }
        self.conflict = Some((*outpoint, *spent_txid, Arc::clone(respend)));
        false
    }

    fn is_interesting(&self) -> bool {
        self.conflict.is_some()
    }

    fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    fn trigger(&mut self) -> Result<()> {
        if !self.valid {
            return Ok(());
        }
        let Some((outpoint, spent_txid, respend)) = &self.conflict else {
            return Ok(());
        };

        let original = {
            let state = self.pool.read();
            let Some(entry) = state.entry(spent_txid) else {
                // The spent transaction left the mempool.
                return Ok(());
            };
            if entry.dsproof().is_some() {
                return Ok(());
            }
            let coin = state.prev_out(outpoint).ok_or(RespendError::CoinNotFound)?;
            if !coin.script_pubkey.is_pay_to_pubkey_hash() {
                return Err(RespendError::NotP2pkh);
            }
            Arc::clone(entry.tx())
        };

        let proof = DoubleSpendProof::create(&original, respend)?;
        let hash = proof.hash();
        if let Some(tx) = self.pool.add_double_spend_proof(proof)? {
            debug!(target: "dsproof", proof = %hash, txid = %spent_txid, "double spend found, created dsproof");
            broadcast_dsp_inv(self.sink.as_ref(), &tx.txid(), &hash);
        }
        Ok(())
    }
}
