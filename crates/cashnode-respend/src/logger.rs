//! Respend logging.

use std::sync::Arc;

use cashnode_types::{Hash256, OutPoint, Transaction};
use tracing::info;

use crate::action::RespendAction;
use crate::Result;

/// Logs one line per respend. Never interesting.
#[derive(Debug, Default)]
pub struct RespendLogger {
    orig_txid: Option<Hash256>,
    respend_txid: Option<Hash256>,
    equivalent: bool,
    new_conflict: bool,
    valid: bool,
}

impl RespendLogger {
    pub fn is_equivalent(&self) -> bool {
        self.equivalent
    }

    /// True when at least one conflicting outpoint had not been respent
    /// before.
    pub fn is_new_conflict(&self) -> bool {
        self.new_conflict
    }

    /// The line written on trigger, if a conflict was recorded.
    pub fn summary(&self) -> Option<String> {
        let orig = self.orig_txid?;
        let respend = self.respend_txid?;
        Some(format!(
            "respend: Tx {orig} conflicts with {respend} (new conflict: {}, equivalent: {}, valid: {})",
            yes_no(self.new_conflict),
            yes_no(self.equivalent),
            yes_no(self.valid),
        ))
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

impl RespendAction for RespendLogger {
    fn add_outpoint_conflict(
        &mut self,
        _outpoint: &OutPoint,
        spent_txid: &Hash256,
        respend: &Arc<Transaction>,
        seen_before: bool,
        is_equivalent: bool,
    ) -> bool {
        self.orig_txid = Some(*spent_txid);
        self.respend_txid = Some(respend.txid());
        self.equivalent = is_equivalent;
        self.new_conflict = self.new_conflict || !seen_before;

        // One conflict is enough to log.
        false
    }

    fn is_interesting(&self) -> bool {
        false
    }

    fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    fn trigger(&mut self) -> Result<()> {
        if let Some(line) = self.summary() {
            info!(target: "respend", "{line}");
        }
        Ok(())
    }
}
