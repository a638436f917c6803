//! secp256k1 keys and signatures.
//!
//! Two signature schemes share one key type:
//!
//! - **ECDSA** with DER-encoded signatures. High-S signatures are normalised
//!   before verification.
//! - **Schnorr** in the fork-specific 64-byte form `r || s`, where
//!   `e = SHA256(r || compressed(P) || m)` and the nonce point `R = sG - eP`
//!   must have a quadratic-residue `y` coordinate and `x(R) == r`. This is not
//!   BIP-340: the public key is committed in compressed 33-byte form.
//!
//! Verification never errors; malformed input simply fails to verify.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, FieldElement, ProjectivePoint, Scalar, U256};

use crate::hash::sha256;
use crate::{CryptoError, Result};

/// Length of a compressed SEC1 public key.
pub const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Length of a Schnorr signature (without sighash byte).
pub const SCHNORR_SIG_LEN: usize = 64;

/// A secp256k1 key pair.
#[derive(Clone)]
pub struct KeyPair {
    secret: k256::SecretKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        Self {
            secret: k256::SecretKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Create a key pair from a 32-byte big-endian secret.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let secret =
            k256::SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Self { secret })
    }

    /// Compressed SEC1 encoding of the public key.
    pub fn public_key(&self) -> [u8; COMPRESSED_PUBKEY_LEN] {
        let point = self.secret.public_key().to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_PUBKEY_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Sign a 32-byte digest with ECDSA, returning the DER encoding (low-S).
    pub fn sign_ecdsa(&self, digest: &[u8; 32]) -> Result<Vec<u8>> {
        let signing_key = k256::ecdsa::SigningKey::from(&self.secret);
        let signature: k256::ecdsa::Signature = signing_key
            .sign_prehash(digest)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    /// Sign a 32-byte digest with fork-style Schnorr.
    ///
    /// The nonce is derived deterministically from the secret and the digest.
    pub fn sign_schnorr(&self, digest: &[u8; 32]) -> Result<[u8; SCHNORR_SIG_LEN]> {
        let x: Scalar = *self.secret.to_nonzero_scalar();
        let pubkey = self.public_key();

        let mut nonce_input = Vec::with_capacity(32 + 32 + 16);
        nonce_input.extend_from_slice(&self.secret.to_bytes());
        nonce_input.extend_from_slice(digest);
        nonce_input.extend_from_slice(b"schnorr-nonce-v1");
        let mut k = reduce(&sha256(&nonce_input));
        if bool::from(k.is_zero()) {
            return Err(CryptoError::Signing("zero nonce".to_string()));
        }

        let r_point = (ProjectivePoint::GENERATOR * k).to_affine();
        let encoded = r_point.to_encoded_point(false);
        let (Some(rx), Some(ry)) = (encoded.x(), encoded.y()) else {
            return Err(CryptoError::Signing("nonce point at infinity".to_string()));
        };
        if !is_quadratic_residue(ry) {
            k = -k;
        }

        let e = challenge(rx.as_slice(), &pubkey, digest);
        let s = k + e * x;

        let mut sig = [0u8; SCHNORR_SIG_LEN];
        sig[..32].copy_from_slice(rx);
        sig[32..].copy_from_slice(&s.to_bytes());
        Ok(sig)
    }
}

/// Verify a DER-encoded ECDSA signature over `digest`.
pub fn verify_ecdsa(pubkey: &[u8], der_sig: &[u8], digest: &[u8; 32]) -> bool {
    let Ok(key) = k256::ecdsa::VerifyingKey::from_sec1_bytes(pubkey) else {
        return false;
    };
    let Ok(sig) = k256::ecdsa::Signature::from_der(der_sig) else {
        return false;
    };
    let sig = sig.normalize_s().unwrap_or(sig);
    key.verify_prehash(digest, &sig).is_ok()
}

/// Verify a 64-byte fork-style Schnorr signature over `digest`.
pub fn verify_schnorr(pubkey: &[u8], sig: &[u8], digest: &[u8; 32]) -> bool {
    if sig.len() != SCHNORR_SIG_LEN {
        return false;
    }
    let Ok(public) = k256::PublicKey::from_sec1_bytes(pubkey) else {
        return false;
    };
    let (r_bytes, s_bytes) = sig.split_at(32);

    // r must be a field element, s must be a scalar; both checks reject >= modulus
    if Option::<FieldElement>::from(FieldElement::from_bytes(FieldBytes::from_slice(r_bytes)))
        .is_none()
    {
        return false;
    }
    let Some(s) = Option::<Scalar>::from(Scalar::from_repr(*FieldBytes::from_slice(s_bytes)))
    else {
        return false;
    };

    let compressed = public.to_encoded_point(true);
    let e = challenge(r_bytes, compressed.as_bytes(), digest);

    let r_point = ProjectivePoint::GENERATOR * s - public.to_projective() * e;
    if r_point == ProjectivePoint::IDENTITY {
        return false;
    }
    let encoded = r_point.to_affine().to_encoded_point(false);
    let (Some(rx), Some(ry)) = (encoded.x(), encoded.y()) else {
        return false;
    };
    rx.as_slice() == r_bytes && is_quadratic_residue(ry)
}

/// Parse a public key, returning whether it is a valid SEC1 encoding.
pub fn is_valid_public_key(pubkey: &[u8]) -> bool {
    k256::PublicKey::from_sec1_bytes(pubkey).is_ok()
}

fn challenge(r: &[u8], pubkey: &[u8], digest: &[u8; 32]) -> Scalar {
    let mut input = Vec::with_capacity(32 + COMPRESSED_PUBKEY_LEN + 32);
    input.extend_from_slice(r);
    input.extend_from_slice(pubkey);
    input.extend_from_slice(digest);
    reduce(&sha256(&input))
}

fn reduce(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(FieldBytes::from_slice(bytes))
}

fn is_quadratic_residue(y: &FieldBytes) -> bool {
    Option::<FieldElement>::from(FieldElement::from_bytes(y))
        .map(|fe| bool::from(fe.sqrt().is_some()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256d;

    #[test]
    fn test_ecdsa_sign_verify() {
        let kp = KeyPair::generate();
        let digest = sha256d(b"respend");
        let sig = kp.sign_ecdsa(&digest).expect("sign");
        assert!(verify_ecdsa(&kp.public_key(), &sig, &digest));
    }

    #[test]
    fn test_ecdsa_wrong_digest() {
        let kp = KeyPair::generate();
        let sig = kp.sign_ecdsa(&sha256d(b"a")).expect("sign");
        assert!(!verify_ecdsa(&kp.public_key(), &sig, &sha256d(b"b")));
    }

    #[test]
    fn test_ecdsa_wrong_key() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let digest = sha256d(b"a");
        let sig = kp.sign_ecdsa(&digest).expect("sign");
        assert!(!verify_ecdsa(&other.public_key(), &sig, &digest));
    }

    #[test]
    fn test_schnorr_sign_verify() {
        let kp = KeyPair::generate();
        let digest = sha256d(b"proof");
        let sig = kp.sign_schnorr(&digest).expect("sign");
        assert_eq!(sig.len(), SCHNORR_SIG_LEN);
        assert!(verify_schnorr(&kp.public_key(), &sig, &digest));
    }

    #[test]
    fn test_schnorr_rejects_tampered() {
        let kp = KeyPair::generate();
        let digest = sha256d(b"proof");
        let mut sig = kp.sign_schnorr(&digest).expect("sign");
        sig[63] ^= 0x01;
        assert!(!verify_schnorr(&kp.public_key(), &sig, &digest));
        assert!(!verify_schnorr(&kp.public_key(), &sig[..63], &digest));
    }

    #[test]
    fn test_schnorr_wrong_digest() {
        let kp = KeyPair::generate();
        let sig = kp.sign_schnorr(&sha256d(b"a")).expect("sign");
        assert!(!verify_schnorr(&kp.public_key(), &sig, &sha256d(b"b")));
    }

    #[test]
    fn test_invalid_pubkey() {
        assert!(is_valid_public_key(&KeyPair::generate().public_key()));
        assert!(!is_valid_public_key(&[0x05; 33]));
        assert!(!verify_ecdsa(&[], &[0x30], &[0u8; 32]));
    }

    #[test]
    fn test_from_bytes_zero_rejected() {
        assert!(KeyPair::from_bytes(&[0u8; 32]).is_err());
        assert!(KeyPair::from_bytes(&[1u8; 32]).is_ok());
    }
}
