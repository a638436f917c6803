//! Signature checker bound to one side of a proof.

use cashnode_crypto::secp256k1::{
    is_valid_public_key, verify_ecdsa, verify_schnorr, SCHNORR_SIG_LEN,
};
use cashnode_script::{Script, SignatureChecker};
use cashnode_types::{Amount, OutPoint};

use crate::proof::Spender;
use crate::sighash::signature_digest;

/// Verifies signatures against the digest rebuilt from a [`Spender`] rather
/// than from a live transaction.
///
/// Timelock checks always pass: a proof makes no claim about them.
pub struct DspSignatureChecker<'a> {
    spender: &'a Spender,
    outpoint: OutPoint,
    amount: Amount,
}

impl<'a> DspSignatureChecker<'a> {
    pub fn new(spender: &'a Spender, outpoint: OutPoint, amount: Amount) -> Self {
        Self {
            spender,
            outpoint,
            amount,
        }
    }
}

impl SignatureChecker for DspSignatureChecker<'_> {
    fn check_sig(&self, sig: &[u8], pubkey: &[u8], script_code: &Script) -> bool {
        if !is_valid_public_key(pubkey) {
            return false;
        }
        // Trailing byte is the sighash type.
        let Some((_, sig)) = sig.split_last() else {
            return false;
        };
        let Some(hash_type) = self.spender.hash_type() else {
            return false;
        };

        let digest = signature_digest(
            self.spender,
            &self.outpoint,
            script_code,
            self.amount,
            hash_type,
        );
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
