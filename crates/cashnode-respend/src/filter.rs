//! Outpoints already respent by a valid transaction.

use cashnode_dsproof::RollingBloomFilter;
use cashnode_types::encode::serialize;
use cashnode_types::OutPoint;
use parking_lot::Mutex;

/// Rolling set of respent outpoints, shared by every detector in the process.
///
/// Lets actions tell a brand-new conflict from one already reported.
pub struct RespentFilter {
    filter: Mutex<RollingBloomFilter>,
}

impl RespentFilter {
    pub const DEFAULT_CAPACITY: u32 = 100_000;
    pub const DEFAULT_FP_RATE: f64 = 0.01;

    pub fn new(capacity: u32, fp_rate: f64) -> Self {
        Self {
            filter: Mutex::new(RollingBloomFilter::new(capacity, fp_rate)),
        }
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.filter.lock().contains(&serialize(outpoint))
    }

    pub fn insert_all<'a>(&self, outpoints: impl IntoIterator<Item = &'a OutPoint>) {
        let mut filter = self.filter.lock();
        for outpoint in outpoints {
            filter.insert(&serialize(outpoint));
        }
    }
}

impl Default for RespentFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_FP_RATE)
    }
}
