//! The double-spend proof object.
//!
//! A proof names the contested previous output and carries, for each of the
//! two conflicting spends, exactly what is needed to rebuild that spend's
//! signature digest: version, input sequence, lock time, the three rolling
//! sighash components and the signature itself.
//!
//! ## Canonical order
//!
//! The two sides are ordered by `hash_outputs`, then `hash_prev_outputs`
//! (bytewise); the smaller side is `spender1`. Two nodes that saw the
//! conflicting transactions in opposite order therefore build byte-identical
//! proofs with the same hash. Validation rejects proofs that are not in this
//! order instead of reordering them.
//!
//! ## Wire format
//!
//! ```text
//! prev_txid[32] prev_index:i32
//! (version:u32 sequence:u32 lock_time:u32
//!  hash_prev_outputs[32] hash_sequence[32] hash_outputs[32]
//!  push_data: compact_size count, then compact_size-prefixed items) x2
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use cashnode_script::sighash::has_fork_id;
use cashnode_script::{Instruction, Interpreter, Script, ScriptVerifier, MAX_SCRIPT_ELEMENT_SIZE};
use cashnode_types::encode::{self, write_compact_size, write_var_bytes, Decodable, Encodable, Reader};
use cashnode_types::{Hash256, OutPoint, Transaction};
use tracing::debug;

use crate::checker::DspSignatureChecker;
use crate::context::ProofContext;
use crate::sighash::components;
use crate::{DspError, Result};

/// Maximum size of the signature carried by a spender.
pub const MAX_PUSH_DATA_SIZE: usize = MAX_SCRIPT_ELEMENT_SIZE;

/// One side of a double spend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spender {
    pub tx_version: u32,
    pub out_sequence: u32,
    pub lock_time: u32,
    pub hash_prev_outputs: Hash256,
    pub hash_sequence: Hash256,
    pub hash_outputs: Hash256,
    /// Data pushed by the unlocking script. For the supported pay-to-pubkey-hash
    /// pattern this is a single item: the signature with its sighash byte.
    pub push_data: Vec<Vec<u8>>,
}

impl Spender {
    /// The sighash type: the last byte of the first push item.
    pub fn hash_type(&self) -> Option<u8> {
        self.push_data.first()?.last().copied()
    }

    fn check_limits(&self) -> Result<()> {
        if self.push_data.len() > 1 {
            return Err(DspError::TooManyPushData);
        }
        if self.push_data.iter().any(|item| item.len() > MAX_PUSH_DATA_SIZE) {
            return Err(DspError::PushDataTooLarge);
        }
        Ok(())
    }

    fn encode(&self, out: &mut Vec<u8>) {
        self.tx_version.encode(out);
        self.out_sequence.encode(out);
        self.lock_time.encode(out);
        self.hash_prev_outputs.encode(out);
        self.hash_sequence.encode(out);
        self.hash_outputs.encode(out);
        write_compact_size(out, self.push_data.len() as u64);
        for item in &self.push_data {
            write_var_bytes(out, item);
        }
    }

    /// Read one side, keeping only the first push item.
    fn decode(reader: &mut Reader<'_>) -> encode::Result<Self> {
        let tx_version = reader.read_u32()?;
        let out_sequence = reader.read_u32()?;
        let lock_time = reader.read_u32()?;
        let hash_prev_outputs = Hash256::decode(reader)?;
        let hash_sequence = Hash256::decode(reader)?;
        let hash_outputs = Hash256::decode(reader)?;

        let count = reader.read_compact_size()?;
        let mut push_data = Vec::with_capacity(1);
        for _ in 0..count {
            let item = reader.read_var_bytes()?;
            if push_data.is_empty() {
                push_data.push(item);
            }
        }
        if push_data.iter().any(|item| item.len() > MAX_PUSH_DATA_SIZE) {
            return Err(encode::EncodeError::Invalid(
                DspError::PushDataTooLarge.to_string(),
            ));
        }

        Ok(Self {
            tx_version,
            out_sequence,
            lock_time,
            hash_prev_outputs,
            hash_sequence,
            hash_outputs,
            push_data,
        })
    }
}

/// Outcome of [`DoubleSpendProof::validate`].
///
/// The two `Missing*` outcomes mean the proof cannot be judged yet; they are
/// not rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    /// No transaction spending the contested output is known.
    MissingTransaction,
    /// The contested output is in neither the mempool nor the UTXO set.
    MissingUtxo,
    Invalid,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Validity::Valid => "valid",
            Validity::MissingTransaction => "missing transaction",
            Validity::MissingUtxo => "missing utxo",
            Validity::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// Proof that two transactions spend the same previous output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleSpendProof {
    prev_tx_id: Hash256,
    prev_out_index: i32,
    spender1: Spender,
    spender2: Spender,
}

impl Default for DoubleSpendProof {
    /// An empty proof: null txid, index `-1`.
    fn default() -> Self {
        Self {
            prev_tx_id: Hash256::ZERO,
            prev_out_index: -1,
            spender1: Spender::default(),
            spender2: Spender::default(),
        }
    }
}

impl DoubleSpendProof {
    /// Build a proof from two transactions that spend a common output.
    ///
    /// The first shared previous output (in input order of `tx1`, then `tx2`)
    /// is the contested one. Both spends must carry a non-empty fork-id
    /// signature as the first push of their unlocking script.
    pub fn create(tx1: &Transaction, tx2: &Transaction) -> Result<Self> {
        if tx1.txid() == tx2.txid() {
            return Err(DspError::IdenticalTransactions);
        }

        let (index1, index2) = tx1
            .inputs
            .iter()
            .enumerate()
            .find_map(|(i, in1)| {
                tx2.inputs
                    .iter()
                    .position(|in2| in2.prevout == in1.prevout)
                    .map(|j| (i, j))
            })
            .ok_or(DspError::NotDoubleSpend)?;

        let in1 = &tx1.inputs[index1];
        let in2 = &tx2.inputs[index2];

        let sig1 = signature_push(&in1.script_sig)?;
        let sig2 = signature_push(&in2.script_sig)?;
        for (side, sig) in [(1u8, &sig1), (2u8, &sig2)] {
            let hash_type = sig.last().copied().unwrap_or_default();
            if !has_fork_id(hash_type) {
                return Err(DspError::NotForkCompatible(side));
            }
        }

        let mut spender1 = build_spender(tx1, index1, sig1);
        let mut spender2 = build_spender(tx2, index2, sig2);
        if canonical_order(&spender1, &spender2) == Ordering::Greater {
            std::mem::swap(&mut spender1, &mut spender2);
        }

        let proof = Self {
            prev_tx_id: in1.prevout.txid,
            prev_out_index: in1.prevout.index as i32,
            spender1,
            spender2,
        };
        debug!(
            target: "dsproof",
            outpoint = %in1.prevout,
            tx1 = %tx1.txid(),
            tx2 = %tx2.txid(),
            "created dsproof"
        );
        Ok(proof)
    }

    /// Assemble a proof from already-computed sides, as given.
    ///
    /// No reordering happens here; a non-canonical proof built this way fails
    /// [`validate`](Self::validate).
    pub fn from_parts(
        prev_tx_id: Hash256,
        prev_out_index: i32,
        spender1: Spender,
        spender2: Spender,
    ) -> Result<Self> {
        spender1.check_limits()?;
        spender2.check_limits()?;
        Ok(Self {
            prev_tx_id,
            prev_out_index,
            spender1,
            spender2,
        })
    }

    /// True if this does not describe a double spend at all.
    pub fn is_empty(&self) -> bool {
        self.prev_out_index < 0 || self.prev_tx_id.is_null()
    }

    pub fn prev_tx_id(&self) -> &Hash256 {
        &self.prev_tx_id
    }

    pub fn prev_out_index(&self) -> i32 {
        self.prev_out_index
    }

    /// The contested output, if the proof is not empty.
    pub fn prev_outpoint(&self) -> Option<OutPoint> {
        if self.is_empty() {
            return None;
        }
        Some(OutPoint::new(self.prev_tx_id, self.prev_out_index as u32))
    }

    pub fn spender1(&self) -> &Spender {
        &self.spender1
    }

    pub fn spender2(&self) -> &Spender {
        &self.spender2
    }

    /// Content hash: double SHA-256 of the wire encoding.
    pub fn hash(&self) -> Hash256 {
        Hash256::of(self)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode::serialize(self)
    }

    /// Decode a proof received from the network.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(encode::deserialize(bytes)?)
    }

    /// Validate using the node's script interpreter.
    ///
    /// `candidate` is a transaction known to spend the contested output; when
    /// absent one is looked up through `ctx`.
    pub fn validate(&self, ctx: &dyn ProofContext, candidate: Option<&Transaction>) -> Validity {
        self.validate_with(ctx, candidate, &Interpreter::new())
    }

    /// Validate with an explicit script verifier.
    pub fn validate_with(
        &self,
        ctx: &dyn ProofContext,
        candidate: Option<&Transaction>,
        verifier: &dyn ScriptVerifier,
    ) -> Validity {
        let Some(outpoint) = self.prev_outpoint() else {
            debug!(target: "dsproof", "previous txid or output index is null or invalid");
            return Validity::Invalid;
        };
        let (Some(sig1), Some(sig2)) = (
            first_non_empty(&self.spender1),
            first_non_empty(&self.spender2),
        ) else {
            debug!(target: "dsproof", %outpoint, "one or both signatures are empty");
            return Validity::Invalid;
        };
        if self.spender1 == self.spender2 {
            debug!(target: "dsproof", %outpoint, "spenders must not be the same");
            return Validity::Invalid;
        }
        if canonical_order(&self.spender1, &self.spender2) == Ordering::Greater {
            debug!(target: "dsproof", %outpoint, "spender ordering is incorrect");
            return Validity::Invalid;
        }

        let prev_out = match ctx.mempool_tx(&outpoint.txid) {
            Some(prev_tx) => match prev_tx.outputs.get(outpoint.index as usize) {
                Some(output) => output.clone(),
                None => {
                    debug!(target: "dsproof", %outpoint, "output index out of range");
                    return Validity::Invalid;
                }
            },
            None => match ctx.utxo(&outpoint) {
                Some(output) => output,
                None => return Validity::MissingUtxo,
            },
        };

        let looked_up: Option<Arc<Transaction>> = match candidate {
            Some(_) => None,
            None => ctx.spender_of(&outpoint),
        };
        let Some(spending_tx) = candidate.or(looked_up.as_deref()) else {
            return Validity::MissingTransaction;
        };

        if prev_out.script_pubkey.is_pay_to_script_hash() {
            debug!(target: "dsproof", %outpoint, "pay-to-script-hash outputs are not supported");
            return Validity::Invalid;
        }
        let pubkey = match extract_pubkey(spending_tx, &outpoint) {
            Some(pubkey) if !pubkey.is_empty() => pubkey,
            _ => {
                debug!(target: "dsproof", %outpoint, "no public key in spending input");
                return Validity::Invalid;
            }
        };

        for (side, spender, sig) in [(1u8, &self.spender1, sig1), (2u8, &self.spender2, sig2)] {
            let mut script_sig = Script::new();
            script_sig.push_slice(sig).push_slice(&pubkey);
            let checker = DspSignatureChecker::new(spender, outpoint, prev_out.value);
            if let Err(reason) =
                verifier.verify_script(&script_sig, &prev_out.script_pubkey, &checker)
            {
                debug!(target: "dsproof", %outpoint, side, %reason, "dsproof failed validating");
                return Validity::Invalid;
            }
        }
        Validity::Valid
    }
}

impl Encodable for DoubleSpendProof {
    fn encode(&self, out: &mut Vec<u8>) {
        self.prev_tx_id.encode(out);
        self.prev_out_index.encode(out);
        self.spender1.encode(out);
        self.spender2.encode(out);
    }
}

impl Decodable for DoubleSpendProof {
    fn decode(reader: &mut Reader<'_>) -> encode::Result<Self> {
        Ok(Self {
            prev_tx_id: Hash256::decode(reader)?,
            prev_out_index: reader.read_i32()?,
            spender1: Spender::decode(reader)?,
            spender2: Spender::decode(reader)?,
        })
    }
}

/// Order by `hash_outputs`, then `hash_prev_outputs`.
fn canonical_order(a: &Spender, b: &Spender) -> Ordering {
    a.hash_outputs
        .cmp(&b.hash_outputs)
        .then_with(|| a.hash_prev_outputs.cmp(&b.hash_prev_outputs))
}

fn first_non_empty(spender: &Spender) -> Option<&[u8]> {
    spender
        .push_data
        .first()
        .map(Vec::as_slice)
        .filter(|item| !item.is_empty())
}

/// The signature of a pay-to-pubkey-hash unlocking script: its first push.
fn signature_push(script_sig: &Script) -> Result<Vec<u8>> {
    let sig = script_sig
        .first_push()
        .filter(|data| !data.is_empty())
        .ok_or(DspError::MissingSignature)?;
    if sig.len() > MAX_PUSH_DATA_SIZE {
        return Err(DspError::PushDataTooLarge);
    }
    Ok(sig.to_vec())
}

fn build_spender(tx: &Transaction, input_index: usize, sig: Vec<u8>) -> Spender {
    let hash_type = sig.last().copied().unwrap_or_default();
    let parts = components(tx, input_index, hash_type);
    Spender {
        tx_version: tx.version as u32,
        out_sequence: tx.inputs[input_index].sequence,
        lock_time: tx.lock_time,
        hash_prev_outputs: parts.hash_prev_outputs,
        hash_sequence: parts.hash_sequence,
        hash_outputs: parts.hash_outputs,
        push_data: vec![sig],
    }
}

/// The second push of the input spending `outpoint`: `<sig> <pubkey>`.
///
/// `None` if the input is missing or its script is malformed; an empty
/// vector if the second operation is not a push.
fn extract_pubkey(tx: &Transaction, outpoint: &OutPoint) -> Option<Vec<u8>> {
    let input = tx.inputs.iter().find(|input| input.prevout == *outpoint)?;
    let mut ops = input.script_sig.instructions();
    ops.next()?.ok()?;
    match ops.next()?.ok()? {
        Instruction::Push(data) => Some(data.to_vec()),
        Instruction::Op(_) => Some(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryContext, Scenario, SigKind, Wallet};
    use cashnode_script::sighash::{
        SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_FORKID, SIGHASH_NONE, SIGHASH_SINGLE,
    };
    use cashnode_script::ScriptError;
    use cashnode_types::{Amount, TxIn, TxOut};

    const FORKID_ALL: u8 = SIGHASH_ALL | SIGHASH_FORKID;

    /// Two spends of output 0 of one funding transaction. Each first spends
    /// `leading` coins of its own, so the contested input sits at index
    /// `leading`. The spends differ in output values and lock time.
    struct Conflict {
        outpoint: OutPoint,
        prev_out: TxOut,
        first: Transaction,
        second: Transaction,
    }

    impl Conflict {
        fn new(kind: SigKind, hash_type: u8, leading: u32, outputs: usize) -> Self {
            let owner = Wallet::new(60);
            let payee = Wallet::new(61);
            let mut funding = owner.funding_tx(100_000, 60);
            for _ in 0..2 * leading {
                funding.outputs.push(owner.output(10_000));
            }
            let txid = funding.txid();
            let coin = |index: u32| {
                (
                    OutPoint::new(txid, index),
                    funding.outputs[index as usize].clone(),
                )
            };
            let spend = |own: std::ops::Range<u32>, value: Amount, lock_time: u32| {
                let mut prevouts: Vec<(OutPoint, TxOut)> = own.map(&coin).collect();
                prevouts.push(coin(0));
                let payouts = (0..outputs)
                    .map(|i| payee.output(value - i as Amount))
                    .collect();
                let mut tx =
                    owner.spend(&prevouts, payouts, TxIn::SEQUENCE_FINAL, kind, hash_type);
                tx.lock_time = lock_time;
                for (index, (_, prev_out)) in prevouts.iter().enumerate() {
                    owner.sign_input(&mut tx, index, prev_out, kind, hash_type);
                }
                tx
            };

            Self {
                outpoint: OutPoint::new(txid, 0),
                prev_out: funding.outputs[0].clone(),
                first: spend(1..leading + 1, 90_000, 0),
                second: spend(leading + 1..2 * leading + 1, 80_000, 1),
            }
        }

        fn proof(&self) -> DoubleSpendProof {
            DoubleSpendProof::create(&self.first, &self.second).expect("create")
        }

        fn validate(&self, proof: &DoubleSpendProof) -> Validity {
            let mut ctx = MemoryContext::default();
            ctx.add_utxo(self.outpoint, self.prev_out.clone());
            proof.validate(&ctx, Some(&self.first))
        }
    }

    fn context_for(scenario: &Scenario) -> MemoryContext {
        let mut ctx = MemoryContext::default();
        ctx.add_utxo(scenario.outpoint, scenario.prev_out.clone());
        ctx.add_mempool_tx(scenario.first.clone());
        ctx
    }

    #[test]
    fn test_create_is_order_independent() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let a = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let b = DoubleSpendProof::create(&s.second, &s.first).expect("create");
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.prev_outpoint(), Some(s.outpoint));
    }

    #[test]
    fn test_create_identical_fails() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let err = DoubleSpendProof::create(&s.first, &s.first).expect_err("identical");
        assert_eq!(err, DspError::IdenticalTransactions);
        assert_eq!(
            err.to_string(),
            "Can not create dsproof from identical transactions"
        );
    }

    #[test]
    fn test_create_unrelated_fails() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let other = Scenario::with_seed(SigKind::Ecdsa, FORKID_ALL, 40);
        let err = DoubleSpendProof::create(&s.first, &other.second).expect_err("unrelated");
        assert_eq!(err, DspError::NotDoubleSpend);
    }

    #[test]
    fn test_create_requires_signature() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let mut unsigned = s.second.clone();
        unsigned.inputs[0].script_sig = Script::new();
        let err = DoubleSpendProof::create(&s.first, &unsigned).expect_err("unsigned");
        assert_eq!(err, DspError::MissingSignature);
    }

    #[test]
    fn test_create_requires_fork_id() {
        let s = Scenario::new(SigKind::Ecdsa, SIGHASH_ALL);
        let err = DoubleSpendProof::create(&s.first, &s.second).expect_err("no fork id");
        assert_eq!(err, DspError::NotForkCompatible(1));
        assert_eq!(err.to_string(), "Tx1 is not a fork-compatible transaction");
    }

    #[test]
    fn test_roundtrip() {
        let s = Scenario::new(SigKind::Schnorr, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let decoded = DoubleSpendProof::from_bytes(&proof.to_bytes()).expect("decode");
        assert_eq!(decoded, proof);
        assert_eq!(decoded.hash(), proof.hash());
    }

    #[test]
    fn test_decode_truncates_extra_push_data() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let mut side = proof.spender1().clone();
        let mut raw = Vec::new();
        proof.prev_tx_id().encode(&mut raw);
        proof.prev_out_index().encode(&mut raw);
        side.push_data.push(b"extra".to_vec());
        side.encode(&mut raw);
        proof.spender2().encode(&mut raw);

        let decoded = DoubleSpendProof::from_bytes(&raw).expect("decode");
        assert_eq!(decoded, proof);
    }

    #[test]
    fn test_decode_rejects_oversized_push() {
        let side = Spender {
            push_data: vec![vec![0x41; MAX_PUSH_DATA_SIZE + 1]],
            ..Spender::default()
        };
        let mut raw = Vec::new();
        Hash256::hash(b"prev").encode(&mut raw);
        0i32.encode(&mut raw);
        side.encode(&mut raw);
        side.encode(&mut raw);
        assert!(DoubleSpendProof::from_bytes(&raw).is_err());
        assert_eq!(
            DoubleSpendProof::from_parts(Hash256::ZERO, 0, side.clone(), side),
            Err(DspError::PushDataTooLarge)
        );
    }

    #[test]
    fn test_from_parts_rejects_multiple_push_items() {
        let side = Spender {
            push_data: vec![vec![1], vec![2]],
            ..Spender::default()
        };
        assert_eq!(
            DoubleSpendProof::from_parts(Hash256::ZERO, 0, side, Spender::default()),
            Err(DspError::TooManyPushData)
        );
    }

    #[test]
    fn test_empty_proof() {
        let proof = DoubleSpendProof::default();
        assert!(proof.is_empty());
        assert_eq!(proof.prev_outpoint(), None);
        let ctx = MemoryContext::default();
        assert_eq!(proof.validate(&ctx, None), Validity::Invalid);
    }

    #[test]
    fn test_validate_valid_ecdsa() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        assert_eq!(proof.validate(&context_for(&s), None), Validity::Valid);
    }

    #[test]
    fn test_validate_valid_schnorr_anyone_can_pay() {
        let s = Scenario::new(SigKind::Schnorr, FORKID_ALL | SIGHASH_ANYONECANPAY);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        assert_eq!(proof.validate(&context_for(&s), None), Validity::Valid);
    }

    #[test]
    fn test_validate_with_candidate() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let mut ctx = MemoryContext::default();
        ctx.add_utxo(s.outpoint, s.prev_out.clone());
        assert_eq!(proof.validate(&ctx, None), Validity::MissingTransaction);
        assert_eq!(proof.validate(&ctx, Some(&s.second)), Validity::Valid);
    }

    #[test]
    fn test_validate_missing_utxo() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let mut ctx = MemoryContext::default();
        ctx.add_mempool_tx(s.first.clone());
        assert_eq!(proof.validate(&ctx, None), Validity::MissingUtxo);
    }

    #[test]
    fn test_validate_prev_tx_in_mempool() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let mut ctx = MemoryContext::default();
        ctx.add_mempool_tx(s.funding.clone());
        ctx.add_mempool_tx(s.first.clone());
        assert_eq!(proof.validate(&ctx, None), Validity::Valid);
    }

    #[test]
    fn test_validate_out_of_range_mempool_output() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let mut short = s.funding.clone();
        short.outputs.clear();
        let mut ctx = MemoryContext::default();
        ctx.add_mempool_tx_as(s.outpoint.txid, short);
        assert_eq!(proof.validate(&ctx, Some(&s.first)), Validity::Invalid);
    }

    #[test]
    fn test_validate_rejects_non_canonical() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let swapped = DoubleSpendProof::from_parts(
            *proof.prev_tx_id(),
            proof.prev_out_index(),
            proof.spender2().clone(),
            proof.spender1().clone(),
        )
        .expect("parts");
        assert_eq!(swapped.validate(&context_for(&s), None), Validity::Invalid);
    }

    #[test]
    fn test_validate_rejects_identical_spenders() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let same = DoubleSpendProof::from_parts(
            *proof.prev_tx_id(),
            proof.prev_out_index(),
            proof.spender1().clone(),
            proof.spender1().clone(),
        )
        .expect("parts");
        assert_eq!(same.validate(&context_for(&s), None), Validity::Invalid);
    }

    #[test]
    fn test_validate_rejects_forged_signature() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let mut forged = proof.spender2().clone();
        forged.out_sequence ^= 1;
        let (first, second) = if canonical_order(proof.spender1(), &forged) == Ordering::Greater {
            (forged, proof.spender1().clone())
        } else {
            (proof.spender1().clone(), forged)
        };
        let tampered =
            DoubleSpendProof::from_parts(*proof.prev_tx_id(), proof.prev_out_index(), first, second)
                .expect("parts");
        assert_eq!(tampered.validate(&context_for(&s), None), Validity::Invalid);
    }

    #[test]
    fn test_validate_rejects_p2sh() {
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        let mut ctx = MemoryContext::default();
        let mut p2sh_out = s.prev_out.clone();
        p2sh_out.script_pubkey = Script::p2sh(&[1u8; 20]);
        ctx.add_utxo(s.outpoint, p2sh_out);
        ctx.add_mempool_tx(s.first.clone());
        assert_eq!(proof.validate(&ctx, None), Validity::Invalid);
    }

    #[test]
    fn test_validate_uses_supplied_verifier() {
        struct Reject;
        impl ScriptVerifier for Reject {
            fn verify_script(
                &self,
                _sig: &Script,
                _pubkey: &Script,
                _checker: &dyn cashnode_script::SignatureChecker,
            ) -> cashnode_script::Result<()> {
                Err(ScriptError::EvalFalse)
            }
        }
        let s = Scenario::new(SigKind::Ecdsa, FORKID_ALL);
        let proof = DoubleSpendProof::create(&s.first, &s.second).expect("create");
        assert_eq!(
            proof.validate_with(&context_for(&s), None, &Reject),
            Validity::Invalid
        );
    }

    #[test]
    fn test_validate_every_hash_type() {
        for base in [SIGHASH_ALL, SIGHASH_NONE, SIGHASH_SINGLE] {
            for modifier in [0, SIGHASH_ANYONECANPAY] {
                let hash_type = base | modifier | SIGHASH_FORKID;
                for kind in [SigKind::Ecdsa, SigKind::Schnorr] {
                    let c = Conflict::new(kind, hash_type, 0, 1);
                    let proof = c.proof();
                    assert_eq!(proof.prev_outpoint(), Some(c.outpoint));
                    assert_eq!(proof.spender1().hash_type(), Some(hash_type));
                    assert_eq!(
                        c.validate(&proof),
                        Validity::Valid,
                        "hash type {hash_type:#04x}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_hash_type_selects_committed_components() {
        let acp_all = Conflict::new(
            SigKind::Ecdsa,
            SIGHASH_ALL | SIGHASH_ANYONECANPAY | SIGHASH_FORKID,
            0,
            1,
        )
        .proof();
        for side in [acp_all.spender1(), acp_all.spender2()] {
            assert_eq!(side.hash_prev_outputs, Hash256::ZERO);
            assert_eq!(side.hash_sequence, Hash256::ZERO);
            assert_ne!(side.hash_outputs, Hash256::ZERO);
        }

        let none = Conflict::new(SigKind::Ecdsa, SIGHASH_NONE | SIGHASH_FORKID, 0, 1).proof();
        for side in [none.spender1(), none.spender2()] {
            assert_ne!(side.hash_prev_outputs, Hash256::ZERO);
            assert_eq!(side.hash_sequence, Hash256::ZERO);
            assert_eq!(side.hash_outputs, Hash256::ZERO);
        }
    }

    #[test]
    fn test_validate_single_uses_input_index() {
        for modifier in [0, SIGHASH_ANYONECANPAY] {
            let hash_type = SIGHASH_SINGLE | modifier | SIGHASH_FORKID;

            // Contested input 1 commits to output 1.
            let c = Conflict::new(SigKind::Ecdsa, hash_type, 1, 2);
            let proof = c.proof();
            let expected = components(&c.first, 1, hash_type).hash_outputs;
            assert_ne!(expected, Hash256::ZERO);
            assert_ne!(expected, components(&c.first, 0, hash_type).hash_outputs);
            assert!(
                proof.spender1().hash_outputs == expected
                    || proof.spender2().hash_outputs == expected
            );
            assert_eq!(c.validate(&proof), Validity::Valid);

            // Contested input past the last output commits to no output.
            let c = Conflict::new(SigKind::Schnorr, hash_type, 1, 1);
            let proof = c.proof();
            assert_eq!(proof.spender1().hash_outputs, Hash256::ZERO);
            assert_eq!(proof.spender2().hash_outputs, Hash256::ZERO);
            assert_eq!(c.validate(&proof), Validity::Valid);
        }
    }
}
