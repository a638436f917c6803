//! # cashnode-types
//!
//! Shared domain types used across the cashnode workspace.
//!
//! ## Modules
//!
//! - [`encode`] — consensus binary encoding (`Encodable`/`Decodable`, compact sizes)
//! - [`hash`] — the 256-bit [`Hash256`] identifier type
//! - [`transaction`] — outpoints, inputs, outputs and transactions
//! - [`network`] — peer ids, inventory items and the peer-facing sink traits

pub mod encode;
pub mod hash;
pub mod network;
pub mod transaction;

pub use encode::{Decodable, Encodable, EncodeError};
pub use hash::Hash256;
pub use network::{Inventory, InventorySink, MisbehaviorSink, PeerId, PeerInfo};
pub use transaction::{OutPoint, Transaction, TxIn, TxOut};

/// Monetary amount in satoshis.
pub type Amount = i64;

/// Current Unix timestamp in seconds.
pub fn unix_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
