//! # cashnode-crypto
//!
//! Cryptographic primitives used by the node core.
//!
//! ## Modules
//!
//! - [`hash`] — SHA-256, double SHA-256, HASH160 and the streaming transaction hasher
//! - [`keyed`] — BLAKE3 keyed hashing, used for probabilistic filters
//! - [`secp256k1`] — key pairs, ECDSA and fork-style Schnorr over secp256k1

pub mod hash;
pub mod keyed;
pub mod secp256k1;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The public key bytes are not a valid SEC1 encoding.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// The secret key bytes are zero or out of range.
    #[error("invalid secret key")]
    InvalidSecretKey,

    /// Signature creation failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, CryptoError>;
