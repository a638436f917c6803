//! The respend action strategy.

use std::sync::Arc;

use cashnode_types::{Hash256, InventorySink, OutPoint, Transaction};
use parking_lot::Mutex;

use crate::logger::RespendLogger;
use crate::relayer::{RelayLimiter, RespendRelayer};
use crate::Result;

/// A reaction to a transaction that conflicts with a mempool transaction.
///
/// The detector reports each conflicting outpoint through
/// [`add_outpoint_conflict`](Self::add_outpoint_conflict), then the validity
/// of the respend through [`set_valid`](Self::set_valid), and finally calls
/// [`trigger`](Self::trigger) once when it is dropped.
pub trait RespendAction: Send {
    /// Record that `respend` spends `outpoint`, already spent by the mempool
    /// transaction `spent_txid`.
    ///
    /// `seen_before` is set when the outpoint was respent by an earlier valid
    /// transaction; `is_equivalent` when the two transactions differ only in
    /// their unlocking scripts. Returns whether more conflicts are wanted.
    fn add_outpoint_conflict(
        &mut self,
        outpoint: &OutPoint,
        spent_txid: &Hash256,
        respend: &Arc<Transaction>,
        seen_before: bool,
        is_equivalent: bool,
    ) -> bool;

    /// Whether the respend deserves full validation.
    fn is_interesting(&self) -> bool;

    fn set_valid(&mut self, valid: bool);

    fn trigger(&mut self) -> Result<()>;
}

/// Shared handle to an action; callers may keep a clone to inspect it after
/// the detector is gone.
pub type RespendActionPtr = Arc<Mutex<dyn RespendAction>>;

/// The relayer, plus the logger when `log_respends` is set.
pub fn create_default_actions(
    sink: Arc<dyn InventorySink>,
    limiter: Arc<RelayLimiter>,
    log_respends: bool,
) -> Vec<RespendActionPtr> {
    let mut actions: Vec<RespendActionPtr> =
        vec![Arc::new(Mutex::new(RespendRelayer::new(sink, limiter)))];
    if log_respends {
        actions.push(Arc::new(Mutex::new(RespendLogger::default())));
    }
    actions
}
