//! Peer-to-peer messages handled by the node.

use std::sync::Arc;

use cashnode_types::{Inventory, Transaction};

/// Command name of the double-spend proof message.
pub const DSPROOF_COMMAND: &str = "dsproof-beta";

/// Reject code for invalid or unknown items.
pub const REJECT_INVALID: u8 = 0x10;

/// A message exchanged with a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetMessage {
    Inv(Vec<Inventory>),
    GetData(Vec<Inventory>),
    Tx(Arc<Transaction>),
    /// An encoded double-spend proof.
    DsProof(Vec<u8>),
    Reject(Reject),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reject {
    /// Command of the rejected message.
    pub message: String,
    pub code: u8,
    pub reason: String,
}

impl NetMessage {
    pub fn command(&self) -> &'static str {
        match self {
            NetMessage::Inv(_) => "inv",
            NetMessage::GetData(_) => "getdata",
            NetMessage::Tx(_) => "tx",
            NetMessage::DsProof(_) => DSPROOF_COMMAND,
            NetMessage::Reject(_) => "reject",
        }
    }
}
