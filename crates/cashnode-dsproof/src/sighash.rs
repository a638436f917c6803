//! Signature digest construction.
//!
//! A fork-id signature commits to a transaction through three rolling hashes
//! plus the fields of the signing input. A proof stores the rolling hashes of
//! each side, which is enough to rebuild the digest without the transaction:
//!
//! ```text
//! digest = sha256d(version ‖ hashPrevOutputs ‖ hashSequence ‖ outpoint ‖
//!                  scriptCode ‖ amount ‖ sequence ‖ hashOutputs ‖ lockTime ‖
//!                  u32(hashType))
//! ```

use cashnode_crypto::hash::HashWriter;
use cashnode_script::sighash::{base_type, is_anyone_can_pay, SIGHASH_NONE, SIGHASH_SINGLE};
use cashnode_script::Script;
use cashnode_types::encode::Encodable;
use cashnode_types::{Amount, Hash256, OutPoint, Transaction};

use crate::proof::Spender;

/// The three rolling hashes committed to by a signature.
///
/// A component the hash type does not commit to is the null hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SighashComponents {
    pub hash_prev_outputs: Hash256,
    pub hash_sequence: Hash256,
    pub hash_outputs: Hash256,
}

/// Compute the rolling hashes of `tx` for a signature with `hash_type` on the
/// input at `input_index`.
pub fn components(tx: &Transaction, input_index: usize, hash_type: u8) -> SighashComponents {
    let anyone_can_pay = is_anyone_can_pay(hash_type);
    let base = base_type(hash_type);
    let all_outputs = base != SIGHASH_SINGLE && base != SIGHASH_NONE;

    let mut parts = SighashComponents::default();
    if !anyone_can_pay {
        parts.hash_prev_outputs = hash_all(tx.inputs.iter().map(|input| &input.prevout));
    }
    if !anyone_can_pay && all_outputs {
        parts.hash_sequence = hash_all(tx.inputs.iter().map(|input| &input.sequence));
    }
    if all_outputs {
        parts.hash_outputs = hash_all(tx.outputs.iter());
    } else if base == SIGHASH_SINGLE {
        if let Some(output) = tx.outputs.get(input_index) {
            parts.hash_outputs = hash_all(std::iter::once(output));
        }
    }
    parts
}

/// Rebuild the digest signed by one side of a proof.
pub fn signature_digest(
    spender: &Spender,
    outpoint: &OutPoint,
    script_code: &Script,
    amount: Amount,
    hash_type: u8,
) -> Hash256 {
    let mut preimage = Vec::with_capacity(4 + 32 * 3 + 36 + script_code.len() + 9 + 4 * 3);
    spender.tx_version.encode(&mut preimage);
    spender.hash_prev_outputs.encode(&mut preimage);
    spender.hash_sequence.encode(&mut preimage);
    outpoint.encode(&mut preimage);
    script_code.encode(&mut preimage);
    amount.encode(&mut preimage);
    spender.out_sequence.encode(&mut preimage);
    spender.hash_outputs.encode(&mut preimage);
    spender.lock_time.encode(&mut preimage);
    u32::from(hash_type).encode(&mut preimage);
    Hash256::hash(&preimage)
}

/// The digest a signer computes for input `input_index` of a live transaction.
pub fn transaction_digest(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    amount: Amount,
    hash_type: u8,
) -> Option<Hash256> {
    let input = tx.inputs.get(input_index)?;
    let parts = components(tx, input_index, hash_type);
    let side = Spender {
        tx_version: tx.version as u32,
        out_sequence: input.sequence,
        lock_time: tx.lock_time,
        hash_prev_outputs: parts.hash_prev_outputs,
        hash_sequence: parts.hash_sequence,
        hash_outputs: parts.hash_outputs,
        push_data: Vec::new(),
    };
    Some(signature_digest(
        &side,
        &input.prevout,
        script_code,
        amount,
        hash_type,
    ))
}

fn hash_all<'a, T, I>(items: I) -> Hash256
where
    T: Encodable + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut writer = HashWriter::new();
    let mut buf = Vec::new();
    for item in items {
        buf.clear();
        item.encode(&mut buf);
        writer.write(&buf);
    }
    Hash256::from_bytes(writer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashnode_script::sighash::{SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_FORKID};
    use cashnode_types::{TxIn, TxOut};

    fn tx(inputs: usize, outputs: usize) -> Transaction {
        Transaction {
            version: 1,
            inputs: (0..inputs)
                .map(|i| TxIn {
                    prevout: OutPoint::new(Hash256::hash(&[i as u8]), i as u32),
                    script_sig: Script::new(),
                    sequence: 100 + i as u32,
                })
                .collect(),
            outputs: (0..outputs)
                .map(|i| TxOut {
                    value: 1_000 * (i as i64 + 1),
                    script_pubkey: Script::p2pkh(&[i as u8; 20]),
                })
                .collect(),
            lock_time: 0,
        }
    }

    #[test]
    fn test_all_commits_to_everything() {
        let parts = components(&tx(2, 2), 0, SIGHASH_ALL | SIGHASH_FORKID);
        assert!(!parts.hash_prev_outputs.is_null());
        assert!(!parts.hash_sequence.is_null());
        assert!(!parts.hash_outputs.is_null());
    }

    #[test]
    fn test_anyone_can_pay_nulls_inputs() {
        let parts = components(
            &tx(2, 2),
            0,
            SIGHASH_ALL | SIGHASH_FORKID | SIGHASH_ANYONECANPAY,
        );
        assert!(parts.hash_prev_outputs.is_null());
        assert!(parts.hash_sequence.is_null());
        assert!(!parts.hash_outputs.is_null());
    }

    #[test]
    fn test_single_commits_to_matching_output() {
        let t = tx(2, 2);
        let ht = SIGHASH_SINGLE | SIGHASH_FORKID;
        let first = components(&t, 0, ht);
        let second = components(&t, 1, ht);
        assert!(first.hash_sequence.is_null());
        assert!(!first.hash_prev_outputs.is_null());
        assert_ne!(first.hash_outputs, second.hash_outputs);
        assert_eq!(first.hash_outputs, Hash256::of(&t.outputs[0]));
    }

    #[test]
    fn test_single_out_of_range_is_null() {
        let parts = components(&tx(3, 1), 2, SIGHASH_SINGLE | SIGHASH_FORKID);
        assert!(parts.hash_outputs.is_null());
    }

    #[test]
    fn test_none_nulls_outputs() {
        let parts = components(&tx(1, 1), 0, SIGHASH_NONE | SIGHASH_FORKID);
        assert!(parts.hash_outputs.is_null());
        assert!(parts.hash_sequence.is_null());
    }

    #[test]
    fn test_digest_depends_on_hash_type() {
        let t = tx(1, 1);
        let code = Script::p2pkh(&[0u8; 20]);
        let a = transaction_digest(&t, 0, &code, 5_000, SIGHASH_ALL | SIGHASH_FORKID);
        let b = transaction_digest(
            &t,
            0,
            &code,
            5_000,
            SIGHASH_ALL | SIGHASH_FORKID | SIGHASH_ANYONECANPAY,
        );
        assert!(a.is_some());
        assert_ne!(a, b);
        assert!(transaction_digest(&t, 1, &code, 5_000, SIGHASH_ALL).is_none());
    }
}
