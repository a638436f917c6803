//! # cashnode-mempool
//!
//! Unconfirmed transaction pool with the indexes the double-spend proof
//! protocol reads from: transactions by id, the next-spender of every
//! outpoint, a coin view of confirmed outputs, and the proof attached to each
//! entry. The pool owns the [`DoubleSpendProofStorage`].
//!
//! Readers take [`TxMempool::read`] and hold the guard for the duration of a
//! proof validation; the guard implements [`ProofContext`].

use std::collections::HashMap;
use std::sync::Arc;

use cashnode_dsproof::{
    DoubleSpendProof, DoubleSpendProofStorage, DspError, ProofContext, ProofId, StorageParams,
};
use cashnode_types::{unix_time, Hash256, OutPoint, Transaction, TxOut};
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

/// Error types for mempool admission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MempoolError {
    #[error("transaction {0} already in mempool")]
    AlreadyInPool(Hash256),

    /// An input is already spent by a pool transaction.
    #[error("txn-mempool-conflict: {outpoint} already spent by {spender}")]
    Conflict { outpoint: OutPoint, spender: Hash256 },

    #[error("dsproof: {0}")]
    Dsproof(#[from] DspError),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// A transaction held in the pool.
#[derive(Debug, Clone)]
pub struct MempoolEntry {
    tx: Arc<Transaction>,
    time: u64,
    dsproof: Option<ProofId>,
}

impl MempoolEntry {
    pub fn tx(&self) -> &Arc<Transaction> {
        &self.tx
    }

    /// Admission time, unix seconds.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// The proof showing this entry was double-spent, if one is known.
    pub fn dsproof(&self) -> Option<ProofId> {
        self.dsproof
    }
}

/// Pool contents. Obtained through [`TxMempool::read`].
#[derive(Default)]
pub struct PoolState {
    map_tx: HashMap<Hash256, MempoolEntry>,
    map_next_tx: HashMap<OutPoint, Hash256>,
    coins: HashMap<OutPoint, TxOut>,
}

impl PoolState {
    pub fn entry(&self, txid: &Hash256) -> Option<&MempoolEntry> {
        self.map_tx.get(txid)
    }

    pub fn contains(&self, txid: &Hash256) -> bool {
        self.map_tx.contains_key(txid)
    }

    /// Id of the pool transaction spending `outpoint`.
    pub fn next_spender(&self, outpoint: &OutPoint) -> Option<&Hash256> {
        self.map_next_tx.get(outpoint)
    }

    pub fn len(&self) -> usize {
        self.map_tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map_tx.is_empty()
    }
}

impl ProofContext for PoolState {
    fn mempool_tx(&self, txid: &Hash256) -> Option<Arc<Transaction>> {
        self.map_tx.get(txid).map(|entry| Arc::clone(&entry.tx))
    }

    fn utxo(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.coins.get(outpoint).cloned()
    }

    fn spender_of(&self, outpoint: &OutPoint) -> Option<Arc<Transaction>> {
        let txid = self.map_next_tx.get(outpoint)?;
        self.mempool_tx(txid)
    }
}

/// The transaction memory pool.
pub struct TxMempool {
    state: RwLock<PoolState>,
    dsp_storage: DoubleSpendProofStorage,
}

impl TxMempool {
    pub fn new(params: StorageParams) -> Self {
        Self {
            state: RwLock::new(PoolState::default()),
            dsp_storage: DoubleSpendProofStorage::new(params),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, PoolState> {
        self.state.read()
    }

    pub fn double_spend_proof_storage(&self) -> &DoubleSpendProofStorage {
        &self.dsp_storage
    }

    /// Register a confirmed, unspent output.
    pub fn add_coin(&self, outpoint: OutPoint, output: TxOut) {
        self.state.write().coins.insert(outpoint, output);
    }

    /// Forget a confirmed output, e.g. once a block spends it.
    pub fn spend_coin(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.state.write().coins.remove(outpoint)
    }

    /// Admit a transaction without script checks.
    ///
    /// Rejects duplicates and transactions spending an outpoint another pool
    /// transaction already spends.
    pub fn add_unchecked(&self, tx: Transaction) -> Result<Arc<Transaction>> {
        let txid = tx.txid();
        let mut state = self.state.write();
        if state.map_tx.contains_key(&txid) {
            return Err(MempoolError::AlreadyInPool(txid));
        }
        if let Some((outpoint, spender)) = tx
            .inputs
            .iter()
            .find_map(|input| state.map_next_tx.get(&input.prevout).map(|s| (input.prevout, *s)))
        {
            return Err(MempoolError::Conflict { outpoint, spender });
        }

        let tx = Arc::new(tx);
        for input in &tx.inputs {
            state.map_next_tx.insert(input.prevout, txid);
        }
        state.map_tx.insert(
            txid,
            MempoolEntry {
                tx: Arc::clone(&tx),
                time: unix_time(),
                dsproof: None,
            },
        );
        debug!(%txid, "added to mempool");
        Ok(tx)
    }

    /// Drop a transaction and its next-spender links. A proof attached to the
    /// entry is removed from storage as well.
    pub fn remove(&self, txid: &Hash256) -> Option<Arc<Transaction>> {
        let entry = {
            let mut state = self.state.write();
            let entry = state.map_tx.remove(txid)?;
            for input in &entry.tx.inputs {
                if state.map_next_tx.get(&input.prevout) == Some(txid) {
                    state.map_next_tx.remove(&input.prevout);
                }
            }
            entry
        };
        if let Some(id) = entry.dsproof {
            self.dsp_storage.remove(id);
        }
        debug!(%txid, "removed from mempool");
        Some(entry.tx)
    }

    /// Store `proof` and attach it to the pool transaction spending the
    /// proof's contested outpoint.
    ///
    /// Returns that transaction when the proof was attached. Nothing is
    /// stored when no pool transaction spends the outpoint or the entry
    /// already carries a proof.
    pub fn add_double_spend_proof(
        &self,
        proof: DoubleSpendProof,
    ) -> Result<Option<Arc<Transaction>>> {
        let Some(outpoint) = proof.prev_outpoint() else {
            return Ok(None);
        };
        let mut state = self.state.write();
        let Some(txid) = state.map_next_tx.get(&outpoint).copied() else {
            return Ok(None);
        };
        let Some(entry) = state.map_tx.get_mut(&txid) else {
            return Ok(None);
        };
        if entry.dsproof.is_some() {
            return Ok(None);
        }
        let (_, id) = self.dsp_storage.add(proof)?;
        entry.dsproof = Some(id);
        debug!(target: "dsproof", proof_id = id, %txid, "attached dsproof to mempool entry");
        Ok(Some(Arc::clone(&entry.tx)))
    }

    /// Claim the orphan proof `id` for the pool transaction `txid`.
    ///
    /// Returns the proof when it was attached. The proof is left an orphan
    /// when `txid` is not in the pool or already carries a proof, so it can
    /// still be rescued by another spender or expire.
    pub fn attach_rescued_proof(
        &self,
        txid: &Hash256,
        id: ProofId,
    ) -> Option<Arc<DoubleSpendProof>> {
        let mut state = self.state.write();
        let entry = state.map_tx.get_mut(txid)?;
        if entry.dsproof.is_some() {
            return None;
        }
        let proof = self.dsp_storage.proof(id)?;
        self.dsp_storage.claim_orphan(id);
        entry.dsproof = Some(id);
        debug!(target: "dsproof", proof_id = id, %txid, "attached rescued dsproof to mempool entry");
        Some(proof)
    }
}

impl Default for TxMempool {
    fn default() -> Self {
        Self::new(StorageParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashnode_dsproof::testutil::{Scenario, SigKind};
    use cashnode_dsproof::Validity;
    use cashnode_script::sighash::{SIGHASH_ALL, SIGHASH_FORKID};

    const HT: u8 = SIGHASH_ALL | SIGHASH_FORKID;

    #[test]
    fn test_add_and_lookup() {
        let s = Scenario::new(SigKind::Ecdsa, HT);
        let pool = TxMempool::default();
        let tx = pool.add_unchecked(s.first.clone()).expect("add");

        let state = pool.read();
        assert_eq!(state.len(), 1);
        assert_eq!(state.next_spender(&s.outpoint), Some(&tx.txid()));
        assert_eq!(
            state.spender_of(&s.outpoint).map(|t| t.txid()),
            Some(s.first.txid())
        );
        assert!(state.entry(&tx.txid()).expect("entry").dsproof().is_none());
    }

    #[test]
    fn test_rejects_duplicates_and_conflicts() {
        let s = Scenario::new(SigKind::Ecdsa, HT);
        let pool = TxMempool::default();
        pool.add_unchecked(s.first.clone()).expect("add");

        assert_eq!(
            pool.add_unchecked(s.first.clone()),
            Err(MempoolError::AlreadyInPool(s.first.txid()))
        );
        assert_eq!(
            pool.add_unchecked(s.second.clone()),
            Err(MempoolError::Conflict {
                outpoint: s.outpoint,
                spender: s.first.txid(),
            })
        );
    }

    #[test]
    fn test_remove_clears_links() {
        let s = Scenario::new(SigKind::Ecdsa, HT);
        let pool = TxMempool::default();
        pool.add_unchecked(s.first.clone()).expect("add");

        assert!(pool.remove(&s.first.txid()).is_some());
        assert!(pool.read().next_spender(&s.outpoint).is_none());
        assert!(pool.remove(&s.first.txid()).is_none());
        pool.add_unchecked(s.second.clone()).expect("conflict gone");
    }

    #[test]
    fn test_prev_out_prefers_mempool() {
        let s = Scenario::new(SigKind::Ecdsa, HT);
        let pool = TxMempool::default();
        assert!(pool.read().prev_out(&s.outpoint).is_none());

        pool.add_coin(s.outpoint, s.prev_out.clone());
        assert_eq!(pool.read().prev_out(&s.outpoint), Some(s.prev_out.clone()));

        pool.spend_coin(&s.outpoint);
        pool.add_unchecked(s.funding.clone()).expect("add funding");
        assert_eq!(pool.read().prev_out(&s.outpoint), Some(s.prev_out.clone()));
    }

    #[test]
    fn test_attach_one_proof_per_entry() {
        let s = Scenario::new(SigKind::Schnorr, HT);
        let pool = TxMempool::default();
        pool.add_coin(s.outpoint, s.prev_out.clone());
        pool.add_unchecked(s.first.clone()).expect("add");

        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        assert_eq!(proof.validate(&*pool.read(), None), Validity::Valid);

        let attached = pool
            .add_double_spend_proof(proof.clone())
            .expect("store")
            .expect("attached");
        assert_eq!(attached.txid(), s.first.txid());
        let storage = pool.double_spend_proof_storage();
        let id = storage.lookup_id(&proof.hash()).expect("stored");
        assert_eq!(
            pool.read().entry(&s.first.txid()).and_then(MempoolEntry::dsproof),
            Some(id)
        );

        // A second proof for the same entry is neither attached nor stored.
        let mut respend = s.second.clone();
        respend.outputs[0].value -= 1;
        let second = DoubleSpendProof::create(&s.first, &respend).expect("create");
        assert!(pool.add_double_spend_proof(second.clone()).expect("ok").is_none());
        assert!(!storage.exists(&second.hash()));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_attach_rescued_proof() {
        let s = Scenario::new(SigKind::Ecdsa, HT);
        let pool = TxMempool::default();
        let storage = pool.double_spend_proof_storage();
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let id = storage.add_orphan(proof.clone(), 5).expect("orphan");

        // Not in the pool: stays an orphan.
        assert!(pool.attach_rescued_proof(&s.first.txid(), id).is_none());
        assert_eq!(storage.orphans_len(), 1);

        pool.add_unchecked(s.first.clone()).expect("add");
        assert!(pool.attach_rescued_proof(&s.first.txid(), id + 1).is_none());
        let attached = pool
            .attach_rescued_proof(&s.first.txid(), id)
            .expect("attached");
        assert_eq!(attached.hash(), proof.hash());
        assert_eq!(storage.orphans_len(), 0);
        assert_eq!(
            pool.read().entry(&s.first.txid()).and_then(MempoolEntry::dsproof),
            Some(id)
        );

        // One proof per entry.
        assert!(pool.attach_rescued_proof(&s.first.txid(), id).is_none());
    }

    #[test]
    fn test_attach_without_spender() {
        let s = Scenario::new(SigKind::Ecdsa, HT);
        let pool = TxMempool::default();
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        assert!(pool.add_double_spend_proof(proof).expect("ok").is_none());
        assert!(pool.double_spend_proof_storage().is_empty());
    }

    #[test]
    fn test_remove_drops_attached_proof() {
        let s = Scenario::new(SigKind::Ecdsa, HT);
        let pool = TxMempool::default();
        pool.add_unchecked(s.first.clone()).expect("add");
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        pool.add_double_spend_proof(proof.clone())
            .expect("store")
            .expect("attached");
        let id = pool
            .double_spend_proof_storage()
            .lookup_id(&proof.hash())
            .expect("stored");

        pool.remove(&s.first.txid());
        assert!(pool.double_spend_proof_storage().proof(id).is_none());
        assert!(!pool.double_spend_proof_storage().exists(&proof.hash()));
    }
}
