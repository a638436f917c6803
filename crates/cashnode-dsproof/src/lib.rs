//! # cashnode-dsproof
//!
//! Double-spend proofs: compact, canonical evidence that two transactions
//! spend the same previous output, verifiable without either transaction.
//!
//! ## Modules
//!
//! - [`sighash`] — rolling sighash components and the per-side signature digest
//! - [`proof`] — [`DoubleSpendProof`]: construction, validation, wire encoding
//! - [`checker`] — signature checker bound to one proof side
//! - [`storage`] — [`DoubleSpendProofStorage`]: id allocation, orphans, expiry
//! - [`bloom`] — rolling bloom filter used for reject and respend caches
//! - [`context`] — the mempool/UTXO view validation reads from
//! - [`broadcast`] — proof inventory announcements

pub mod bloom;
pub mod broadcast;
pub mod checker;
pub mod context;
pub mod proof;
pub mod sighash;
pub mod storage;

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

pub use bloom::RollingBloomFilter;
pub use broadcast::broadcast_dsp_inv;
pub use context::ProofContext;
pub use proof::{DoubleSpendProof, Spender, Validity};
pub use storage::{DoubleSpendProofStorage, ProofId, StorageParams};

/// Error types for double-spend proof operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DspError {
    #[error("Can not create dsproof from identical transactions")]
    IdenticalTransactions,

    #[error("Transactions do not double spend each other")]
    NotDoubleSpend,

    #[error("scriptSig has no signature")]
    MissingSignature,

    /// The signature of the given side (1 or 2) lacks the fork-id sighash flag.
    #[error("Tx{0} is not a fork-compatible transaction")]
    NotForkCompatible(u8),

    #[error("DSProof contained more than 1 pushData")]
    TooManyPushData,

    #[error("DSProof script size limit exceeded")]
    PushDataTooLarge,

    /// Every candidate id is occupied.
    #[error("no free proof id")]
    IdSpaceExhausted,

    #[error("decode error: {0}")]
    Decode(#[from] cashnode_types::EncodeError),
}

pub type Result<T> = std::result::Result<T, DspError>;
