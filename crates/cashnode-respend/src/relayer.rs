//! Respend relaying and its rate limiter.

use std::sync::Arc;

use cashnode_types::network::relays_transactions;
use cashnode_types::{unix_time, Hash256, Inventory, InventorySink, OutPoint, Transaction};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::action::RespendAction;
use crate::Result;

/// Tunables for [`RelayLimiter`].
#[derive(Debug, Clone)]
pub struct RelayLimits {
    /// Sustained respend relay budget in thousands of bytes per minute.
    pub limit_relay_kb_per_min: u64,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            limit_relay_kb_per_min: 100,
        }
    }
}

struct LimiterState {
    count: f64,
    last_time: u64,
}

/// Exponentially decaying byte budget shared by every relayer.
///
/// The running byte count decays by `(1 - 1/600)` per elapsed second; a
/// relay is refused once the count reaches ten minutes' worth of the limit.
pub struct RelayLimiter {
    limits: RelayLimits,
    state: Mutex<LimiterState>,
}

impl RelayLimiter {
    pub fn new(limits: RelayLimits) -> Self {
        Self {
            limits,
            state: Mutex::new(LimiterState {
                count: 0.0,
                last_time: 0,
            }),
        }
    }

    /// Charge `size` bytes against the budget unless it is already spent.
    pub fn has_limit_exceeded(&self, size: usize) -> bool {
        self.has_limit_exceeded_at(size, unix_time())
    }

    /// [`has_limit_exceeded`](Self::has_limit_exceeded) at an explicit time.
    pub fn has_limit_exceeded_at(&self, size: usize, now: u64) -> bool {
        let mut state = self.state.lock();
        let elapsed = now.saturating_sub(state.last_time);
        state.count *= (1.0 - 1.0 / 600.0f64).powf(elapsed as f64);
        state.last_time = now;

        let limit = self.limits.limit_relay_kb_per_min as f64 * 10.0 * 1000.0;
        if state.count >= limit {
            debug!(target: "respend", "double-spend relay rejected by rate limiter");
            return true;
        }
        let before = state.count;
        state.count += size as f64;
        debug!(target: "respend", before, after = state.count, "double-spend relay rate limiter");
        false
    }
}

impl Default for RelayLimiter {
    fn default() -> Self {
        Self::new(RelayLimits::default())
    }
}

/// Announces a respend to transaction-relaying peers so that they, and the
/// wallets behind them, learn about the conflict.
pub struct RespendRelayer {
    sink: Arc<dyn InventorySink>,
    limiter: Arc<RelayLimiter>,
    respend: Option<Arc<Transaction>>,
    interesting: bool,
    valid: bool,
}

impl RespendRelayer {
    pub fn new(sink: Arc<dyn InventorySink>, limiter: Arc<RelayLimiter>) -> Self {
        Self {
            sink,
            limiter,
            respend: None,
            interesting: false,
            valid: false,
        }
    }
}

impl RespendAction for RespendRelayer {
    fn add_outpoint_conflict(
        &mut self,
        _outpoint: &OutPoint,
        _spent_txid: &Hash256,
        respend: &Arc<Transaction>,
        seen_before: bool,
        is_equivalent: bool,
    ) -> bool {
        if seen_before && is_equivalent {
            return true;
        }
        if self.limiter.has_limit_exceeded(respend.total_size()) {
            // Not relaying, so further conflicts do not matter.
            return false;
        }
        self.respend = Some(Arc::clone(respend));
        self.interesting = true;
        false
    }

    fn is_interesting(&self) -> bool {
        self.interesting
    }

    fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    fn trigger(&mut self) -> Result<()> {
        if !self.valid || !self.interesting {
            return Ok(());
        }
        let Some(respend) = &self.respend else {
            return Ok(());
        };
        let txid = respend.txid();
        info!(target: "respend", %txid, "relaying double-spend");
        self.sink
            .broadcast_inventory(Inventory::tx(txid), &relays_transactions);
        Ok(())
    }
}
