//! Proof inventory announcements.

use cashnode_types::network::relays_transactions;
use cashnode_types::{Hash256, Inventory, InventorySink};
use tracing::info;

/// Announce the proof `proof_hash`, which double-spends `txid`, to every peer
/// that relays transactions.
pub fn broadcast_dsp_inv(sink: &dyn InventorySink, txid: &Hash256, proof_hash: &Hash256) {
    info!(target: "dsproof", %txid, proof = %proof_hash, "broadcasting dsproof inv");
    sink.broadcast_inventory(
        Inventory::double_spend_proof(*proof_hash),
        &relays_transactions,
    );
}
