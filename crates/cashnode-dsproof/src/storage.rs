//! Registry of known double-spend proofs.
//!
//! Proofs are keyed by a small integer id and deduplicated by content hash.
//! A proof whose contested output cannot be resolved yet is an *orphan*: it is
//! remembered together with the peer that sent it and indexed by the cheap hash
//! of the contested txid, so that the arrival of a spending transaction can
//! find it again. Orphans that stay unresolved past the expiry window are
//! dropped and their sender is penalised.
//!
//! All operations take one internal lock for their whole duration; none of
//! them block on I/O.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use cashnode_types::{unix_time, Hash256, MisbehaviorSink, OutPoint, PeerId};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::bloom::RollingBloomFilter;
use crate::proof::DoubleSpendProof;
use crate::{DspError, Result};

/// Identifier of a stored proof. Always positive.
pub type ProofId = i32;

/// Tunables for [`DoubleSpendProofStorage`].
#[derive(Debug, Clone)]
pub struct StorageParams {
    /// Orphans at least this old are expired by [`DoubleSpendProofStorage::periodic_cleanup`].
    pub orphan_expiry_secs: u64,
    /// Misbehavior points charged to the sender of an expired orphan.
    pub orphan_penalty: u32,
    pub recent_rejects_capacity: u32,
    pub recent_rejects_fp_rate: f64,
}

impl Default for StorageParams {
    fn default() -> Self {
        Self {
            orphan_expiry_secs: 90,
            orphan_penalty: 1,
            recent_rejects_capacity: 120_000,
            recent_rejects_fp_rate: 0.000001,
        }
    }
}

struct OrphanInfo {
    peer: PeerId,
    added_at: u64,
}

struct Inner {
    proofs: HashMap<ProofId, Arc<DoubleSpendProof>>,
    id_lookup: HashMap<Hash256, ProofId>,
    orphans: BTreeMap<ProofId, OrphanInfo>,
    prev_txid_lookup: HashMap<u64, VecDeque<ProofId>>,
    recent_rejects: RollingBloomFilter,
    next_id: ProofId,
}

/// Concurrent store of double-spend proofs.
pub struct DoubleSpendProofStorage {
    inner: Mutex<Inner>,
    params: StorageParams,
}

impl DoubleSpendProofStorage {
    pub fn new(params: StorageParams) -> Self {
        let recent_rejects = RollingBloomFilter::new(
            params.recent_rejects_capacity,
            params.recent_rejects_fp_rate,
        );
        Self {
            inner: Mutex::new(Inner {
                proofs: HashMap::new(),
                id_lookup: HashMap::new(),
                orphans: BTreeMap::new(),
                prev_txid_lookup: HashMap::new(),
                recent_rejects,
                next_id: 1,
            }),
            params,
        }
    }

    pub fn params(&self) -> &StorageParams {
        &self.params
    }

    /// Store a proof. Returns whether it was newly added, and its id.
    ///
    /// Adding a proof that is already stored returns the existing id and
    /// clears its orphan status.
    pub fn add(&self, proof: DoubleSpendProof) -> Result<(bool, ProofId)> {
        self.inner.lock().add(proof)
    }

    /// Store a proof whose contested output is not yet resolvable.
    ///
    /// Orphan bookkeeping is only recorded when the proof was not known
    /// before; a known proof is never re-marked as orphan.
    pub fn add_orphan(&self, proof: DoubleSpendProof, peer: PeerId) -> Result<ProofId> {
        self.add_orphan_at(proof, peer, unix_time())
    }

    /// [`add_orphan`](Self::add_orphan) with an explicit arrival time.
    pub fn add_orphan_at(&self, proof: DoubleSpendProof, peer: PeerId, now: u64) -> Result<ProofId> {
        let mut inner = self.inner.lock();
        let cheap_hash = proof.prev_tx_id().cheap_hash();
        let (added, id) = inner.insert(proof)?;
        if added {
            inner.orphans.insert(id, OrphanInfo { peer, added_at: now });
            inner.prev_txid_lookup.entry(cheap_hash).or_default().push_back(id);
            debug!(target: "dsproof", proof_id = id, peer, "stored orphan dsproof");
        }
        Ok(id)
    }

    /// Orphans contesting exactly `outpoint`, as `(proof id, origin peer)`.
    pub fn find_orphans(&self, outpoint: &OutPoint) -> Vec<(ProofId, PeerId)> {
        let inner = self.inner.lock();
        let Some(candidates) = inner.prev_txid_lookup.get(&outpoint.txid.cheap_hash()) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for id in candidates {
            let Some(proof) = inner.proofs.get(id) else {
                error!(target: "dsproof", proof_id = *id, "orphan index refers to a missing proof");
                continue;
            };
            if proof.prev_out_index() != outpoint.index as i32 || *proof.prev_tx_id() != outpoint.txid {
                continue;
            }
            if let Some(orphan) = inner.orphans.get(id) {
                found.push((*id, orphan.peer));
            }
        }
        found
    }

    /// Drop orphan bookkeeping for `id`, keeping the proof itself.
    pub fn claim_orphan(&self, id: ProofId) {
        self.inner.lock().claim_orphan(id);
    }

    /// Remove a proof and everything that refers to it.
    pub fn remove(&self, id: ProofId) {
        self.inner.lock().remove(id);
    }

    pub fn proof(&self, id: ProofId) -> Option<Arc<DoubleSpendProof>> {
        self.inner.lock().proofs.get(&id).cloned()
    }

    /// A proof by content hash.
    pub fn lookup(&self, hash: &Hash256) -> Option<Arc<DoubleSpendProof>> {
        let inner = self.inner.lock();
        let id = inner.id_lookup.get(hash)?;
        inner.proofs.get(id).cloned()
    }

    /// The id of a proof by content hash.
    pub fn lookup_id(&self, hash: &Hash256) -> Option<ProofId> {
        self.inner.lock().id_lookup.get(hash).copied()
    }

    pub fn exists(&self, hash: &Hash256) -> bool {
        self.inner.lock().id_lookup.contains_key(hash)
    }

    /// 1 if `id` is an orphan, else 0.
    pub fn orphan_count(&self, id: ProofId) -> usize {
        usize::from(self.inner.lock().orphans.contains_key(&id))
    }

    /// Number of stored proofs, orphans included.
    pub fn len(&self) -> usize {
        self.inner.lock().proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().proofs.is_empty()
    }

    pub fn orphans_len(&self) -> usize {
        self.inner.lock().orphans.len()
    }

    /// Expire stale orphans, penalising their senders.
    pub fn periodic_cleanup(&self, sink: &dyn MisbehaviorSink) -> usize {
        self.periodic_cleanup_at(unix_time(), sink)
    }

    /// [`periodic_cleanup`](Self::periodic_cleanup) as of `now`. Returns the
    /// number of orphans expired.
    pub fn periodic_cleanup_at(&self, now: u64, sink: &dyn MisbehaviorSink) -> usize {
        let mut inner = self.inner.lock();
        let expire = now.saturating_sub(self.params.orphan_expiry_secs);
        let expired: Vec<(ProofId, PeerId)> = inner
            .orphans
            .iter()
            .filter(|(_, orphan)| orphan.added_at <= expire)
            .map(|(id, orphan)| (*id, orphan.peer))
            .collect();

        for (id, peer) in &expired {
            inner.remove(*id);
            sink.misbehaving(*peer, self.params.orphan_penalty, "expired orphan dsproof");
        }
        debug!(
            target: "dsproof",
            orphans = inner.orphans.len(),
            proofs = inner.proofs.len(),
            expired = expired.len(),
            "dsproof cleanup"
        );
        expired.len()
    }

    pub fn is_recently_rejected_proof(&self, hash: &Hash256) -> bool {
        self.inner.lock().recent_rejects.contains(hash.as_bytes())
    }

    pub fn mark_proof_rejected(&self, hash: &Hash256) {
        self.inner.lock().recent_rejects.insert(hash.as_bytes());
    }

    /// Proof validity depends on chain state, so forget past rejections.
    pub fn new_block_found(&self) {
        self.inner.lock().recent_rejects.reset();
    }
}

impl Default for DoubleSpendProofStorage {
    fn default() -> Self {
        Self::new(StorageParams::default())
    }
}

impl Inner {
    fn add(&mut self, proof: DoubleSpendProof) -> Result<(bool, ProofId)> {
        let (added, id) = self.insert(proof)?;
        if !added {
            self.claim_orphan(id);
        }
        Ok((added, id))
    }

    /// Store without touching orphan state.
    fn insert(&mut self, proof: DoubleSpendProof) -> Result<(bool, ProofId)> {
        let hash = proof.hash();
        if let Some(&id) = self.id_lookup.get(&hash) {
            return Ok((false, id));
        }

        let id = self.allocate_id()?;
        self.proofs.insert(id, Arc::new(proof));
        self.id_lookup.insert(hash, id);
        debug!(target: "dsproof", proof_id = id, %hash, "stored dsproof");
        Ok((true, id))
    }

    /// Next free id at or after the counter, wrapping past `i32::MAX` to 1.
    ///
    /// At most `proofs.len() + 1` candidates are probed: at least one of them
    /// must be free.
    fn allocate_id(&mut self) -> Result<ProofId> {
        for _ in 0..=self.proofs.len() {
            let candidate = self.next_id;
            self.next_id = candidate.checked_add(1).unwrap_or(1);
            if !self.proofs.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        error!(target: "dsproof", proofs = self.proofs.len(), "proof id space exhausted");
        Err(DspError::IdSpaceExhausted)
    }

    fn claim_orphan(&mut self, id: ProofId) {
        if self.orphans.remove(&id).is_none() {
            return;
        }
        let bucket = self
            .prev_txid_lookup
            .iter()
            .find(|(_, ids)| ids.contains(&id))
            .map(|(key, _)| *key);
        if let Some(key) = bucket {
            self.unindex_orphan(key, id);
        }
    }

    fn remove(&mut self, id: ProofId) {
        let Some(proof) = self.proofs.remove(&id) else {
            return;
        };
        if self.orphans.remove(&id).is_some() {
            self.unindex_orphan(proof.prev_tx_id().cheap_hash(), id);
        }
        self.id_lookup.remove(&proof.hash());
    }

    fn unindex_orphan(&mut self, key: u64, id: ProofId) {
        let Some(ids) = self.prev_txid_lookup.get_mut(&key) else {
            error!(target: "dsproof", proof_id = id, "orphan missing from txid index");
            return;
        };
        ids.retain(|candidate| *candidate != id);
        if ids.is_empty() {
            self.prev_txid_lookup.remove(&key);
        }
    }
}
