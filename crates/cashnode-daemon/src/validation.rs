//! Script validation of incoming transactions.

use cashnode_crypto::secp256k1::{is_valid_public_key, verify_ecdsa, verify_schnorr, SCHNORR_SIG_LEN};
use cashnode_dsproof::sighash::transaction_digest;
use cashnode_dsproof::ProofContext;
use cashnode_script::{Interpreter, Script, ScriptError, ScriptVerifier, SignatureChecker};
use cashnode_types::{Amount, Hash256, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("transaction {0} has no inputs")]
    NoInputs(Hash256),

    #[error("input {index} spends an unknown output")]
    MissingInputs { index: usize },

    #[error("input {index}: {source}")]
    Script { index: usize, source: ScriptError },
}

/// Checks signatures against the digest of a live transaction input.
///
/// Timelocks are accepted: the pool tracks no chain height.
pub struct TxSignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    amount: Amount,
}

impl<'a> TxSignatureChecker<'a> {
    pub fn new(tx: &'a Transaction, input_index: usize, amount: Amount) -> Self {
        Self {
            tx,
            input_index,
            amount,
        }
    }
}

impl SignatureChecker for TxSignatureChecker<'_> {
    fn check_sig(&self, sig: &[u8], pubkey: &[u8], script_code: &Script) -> bool {
        if !is_valid_public_key(pubkey) {
            return false;
        }
        let Some((&hash_type, sig)) = sig.split_last() else {
            return false;
        };
        let Some(digest) =
            transaction_digest(self.tx, self.input_index, script_code, self.amount, hash_type)
        else {
            return false;
        };
        if sig.len() == SCHNORR_SIG_LEN {
            verify_schnorr(pubkey, sig, digest.as_bytes())
        } else {
            verify_ecdsa(pubkey, sig, digest.as_bytes())
        }
    }

    fn check_lock_time(&self, _lock_time: i64) -> bool {
        true
    }

    fn check_sequence(&self, _sequence: i64) -> bool {
        true
    }
}

/// Verify every input of `tx` against the outputs it spends.
pub fn verify_inputs(view: &dyn ProofContext, tx: &Transaction) -> Result<(), ValidationError> {
    if tx.inputs.is_empty() {
        return Err(ValidationError::NoInputs(tx.txid()));
    }
    let interpreter = Interpreter::new();
    for (index, input) in tx.inputs.iter().enumerate() {
        let prev_out = view
            .prev_out(&input.prevout)
            .ok_or(ValidationError::MissingInputs { index })?;
        let checker = TxSignatureChecker::new(tx, index, prev_out.value);
        interpreter
            .verify_script(&input.script_sig, &prev_out.script_pubkey, &checker)
            .map_err(|source| ValidationError::Script { index, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashnode_dsproof::testutil::{MemoryContext, Scenario, SigKind};
    use cashnode_script::sighash::{SIGHASH_ALL, SIGHASH_FORKID};

    const HT: u8 = SIGHASH_ALL | SIGHASH_FORKID;

    fn context(s: &Scenario) -> MemoryContext {
        let mut ctx = MemoryContext::default();
        ctx.add_utxo(s.outpoint, s.prev_out.clone());
        ctx
    }

    #[test]
    fn test_signed_spends_verify() {
        for kind in [SigKind::Ecdsa, SigKind::Schnorr] {
            let s = Scenario::new(kind, HT);
            let ctx = context(&s);
            verify_inputs(&ctx, &s.first).expect("first verifies");
            verify_inputs(&ctx, &s.second).expect("second verifies");
        }
    }

    #[test]
    fn test_tampered_output_fails() {
        let s = Scenario::new(SigKind::Ecdsa, HT);
        let mut tx = s.first.clone();
        tx.outputs[0].value += 1;
        assert_eq!(
            verify_inputs(&context(&s), &tx),
            Err(ValidationError::Script {
                index: 0,
                source: ScriptError::EvalFalse,
            })
        );
    }

    #[test]
    fn test_unknown_input() {
        let s = Scenario::new(SigKind::Ecdsa, HT);
        assert_eq!(
            verify_inputs(&MemoryContext::default(), &s.first),
            Err(ValidationError::MissingInputs { index: 0 })
        );
    }
}
