//! Peer-facing types and the sinks the protocol core reports into.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encode::{self, Decodable, Encodable, Reader};
use crate::Hash256;

/// Locally assigned peer identifier.
pub type PeerId = i64;

/// Inventory type tag for a transaction.
pub const MSG_TX: u32 = 1;

/// Inventory type tag for a double-spend proof.
pub const MSG_DOUBLESPENDPROOF: u32 = 0x94a0;

/// An inventory announcement: a type tag plus the item's hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inventory {
    pub kind: u32,
    pub hash: Hash256,
}

impl Inventory {
    pub fn tx(txid: Hash256) -> Self {
        Self { kind: MSG_TX, hash: txid }
    }

    pub fn double_spend_proof(hash: Hash256) -> Self {
        Self {
            kind: MSG_DOUBLESPENDPROOF,
            hash,
        }
    }

    pub fn is_double_spend_proof(&self) -> bool {
        self.kind == MSG_DOUBLESPENDPROOF
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.kind {
            MSG_TX => "tx",
            MSG_DOUBLESPENDPROOF => "dsproof",
            _ => "unknown",
        };
        write!(f, "{name} {}", self.hash)
    }
}

impl Encodable for Inventory {
    fn encode(&self, out: &mut Vec<u8>) {
        self.kind.encode(out);
        self.hash.encode(out);
    }
}

impl Decodable for Inventory {
    fn decode(reader: &mut Reader<'_>) -> encode::Result<Self> {
        Ok(Self {
            kind: reader.read_u32()?,
            hash: Hash256::decode(reader)?,
        })
    }
}

/// What a broadcast predicate may inspect about a connected peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    /// Whether the peer asked to receive transaction announcements.
    pub relay_txes: bool,
}

/// Receives misbehavior penalties for peers.
pub trait MisbehaviorSink: Send + Sync {
    fn misbehaving(&self, peer: PeerId, points: u32, reason: &str);
}

/// Queues inventory announcements to connected peers.
pub trait InventorySink: Send + Sync {
    /// Push `inv` to every connected peer for which `filter` returns true.
    fn broadcast_inventory(&self, inv: Inventory, filter: &dyn Fn(&PeerInfo) -> bool);
}

/// Broadcast predicate selecting peers that relay transactions.
pub fn relays_transactions(peer: &PeerInfo) -> bool {
    peer.relay_txes
}
