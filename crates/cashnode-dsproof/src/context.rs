//! The chain view proof validation reads from.

use std::sync::Arc;

use cashnode_types::{Hash256, OutPoint, Transaction, TxOut};

/// Read access to the mempool and UTXO set.
///
/// Implementations are expected to be lock guards (or views derived from
/// them): validation performs no locking of its own and relies on the view
/// staying consistent for the duration of the call.
pub trait ProofContext {
    /// An unconfirmed transaction by id.
    fn mempool_tx(&self, txid: &Hash256) -> Option<Arc<Transaction>>;

    /// An unspent confirmed output.
    fn utxo(&self, outpoint: &OutPoint) -> Option<TxOut>;

    /// The mempool transaction currently spending `outpoint`.
    fn spender_of(&self, outpoint: &OutPoint) -> Option<Arc<Transaction>>;

    /// Resolve a previous output from the mempool first, then the UTXO set.
    fn prev_out(&self, outpoint: &OutPoint) -> Option<TxOut> {
        match self.mempool_tx(&outpoint.txid) {
            Some(tx) => tx.outputs.get(outpoint.index as usize).cloned(),
            None => self.utxo(outpoint),
        }
    }
}
