//! # cashnode-respend
//!
//! Detection of transactions that re-spend an input already spent by a
//! mempool transaction, and the pluggable reactions to such a respend.
//!
//! ## Modules
//!
//! - [`action`] — the [`RespendAction`] strategy trait and the default set
//! - [`logger`] — logs a summary of each respend
//! - [`relayer`] — relays interesting respends, behind a rate limiter
//! - [`proof_action`] — builds, stores and announces a double-spend proof
//! - [`filter`] — the process-wide "already respent" outpoint filter
//! - [`detector`] — [`RespendDetector`], driving the actions for one transaction

pub mod action;
pub mod detector;
pub mod filter;
pub mod logger;
pub mod proof_action;
pub mod relayer;

pub use action::{create_default_actions, RespendAction, RespendActionPtr};
pub use detector::{OrphanRescue, RespendDetector};
pub use filter::RespentFilter;
pub use logger::RespendLogger;
pub use proof_action::ProofAction;
pub use relayer::{RelayLimiter, RelayLimits, RespendRelayer};

/// Error types for respend actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RespendError {
    #[error("Coin was not found for double spend")]
    CoinNotFound,

    #[error("Can not create dsproof: Transaction was not P2PKH")]
    NotP2pkh,

    #[error("dsproof: {0}")]
    Dsproof(#[from] cashnode_dsproof::DspError),

    #[error("mempool: {0}")]
    Mempool(#[from] cashnode_mempool::MempoolError),
}

pub type Result<T> = std::result::Result<T, RespendError>;
