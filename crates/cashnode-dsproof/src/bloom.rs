//! Rolling bloom filter.
//!
//! Remembers roughly the last `capacity` inserted items with a bounded
//! false-positive rate, forgetting older ones as new ones arrive. Entries are
//! tagged with one of three generations using two bits per position; each
//! generation holds `capacity / 2` items and starting a new generation wipes
//! the oldest one, so between `capacity` and `1.5 * capacity` items are
//! retained.
//!
//! Bit positions come from a BLAKE3 keyed XOF over the item. The key is
//! regenerated on every [`reset`](RollingBloomFilter::reset) so positions are
//! not predictable by peers.

use cashnode_crypto::keyed::{keyed_hash_xof, random_key};

/// Upper bound on the number of hash functions.
const MAX_HASH_FUNCS: u32 = 50;

/// A probabilistic set of recently inserted byte strings.
pub struct RollingBloomFilter {
    /// Pairs of words: position `p` lives at bit `p & 63` of
    /// `data[(p >> 6) * 2]` (generation low bit) and `data[(p >> 6) * 2 + 1]`
    /// (generation high bit).
    data: Vec<u64>,
    hash_funcs: u32,
    entries_per_generation: u32,
    entries_this_generation: u32,
    generation: u8,
    key: [u8; 32],
}

impl RollingBloomFilter {
    /// Create a filter sized for `capacity` items at `fp_rate`.
    pub fn new(capacity: u32, fp_rate: f64) -> Self {
        let log_fp = fp_rate.ln();
        let hash_funcs = ((log_fp / 0.5f64.ln()).round() as u32).clamp(1, MAX_HASH_FUNCS);
        let entries_per_generation = capacity.saturating_add(1) / 2;
        let max_elements = f64::from(entries_per_generation) * 3.0;
        let filter_bits = (-f64::from(hash_funcs) * max_elements
            / (1.0 - (log_fp / f64::from(hash_funcs)).exp()).ln())
        .ceil()
        .max(1.0) as usize;
        let words = filter_bits.div_ceil(64) * 2;

        let mut filter = Self {
            data: vec![0u64; words],
            hash_funcs,
            entries_per_generation: entries_per_generation.max(1),
            entries_this_generation: 0,
            generation: 1,
            key: [0u8; 32],
        };
        filter.reset();
        filter
    }

    pub fn insert(&mut self, item: &[u8]) {
        if self.entries_this_generation == self.entries_per_generation {
            self.entries_this_generation = 0;
            self.generation += 1;
            if self.generation == 4 {
                self.generation = 1;
            }
            self.wipe_generation(self.generation);
        }
        self.entries_this_generation += 1;

        let low = u64::from(self.generation & 1);
        let high = u64::from(self.generation >> 1);
        for (word, bit) in self.positions(item) {
            self.data[word] = (self.data[word] & !(1u64 << bit)) | (low << bit);
            self.data[word + 1] = (self.data[word + 1] & !(1u64 << bit)) | (high << bit);
        }
    }

    /// True if `item` was (probably) inserted within the retained generations.
    pub fn contains(&self, item: &[u8]) -> bool {
        self.positions(item)
            .into_iter()
            .all(|(word, bit)| ((self.data[word] | self.data[word + 1]) >> bit) & 1 == 1)
    }

    /// Forget everything and pick a fresh hashing key.
    pub fn reset(&mut self) {
        self.key = random_key();
        self.entries_this_generation = 0;
        self.generation = 1;
        self.data.fill(0);
    }

    pub fn hash_funcs(&self) -> u32 {
        self.hash_funcs
    }

    fn wipe_generation(&mut self, generation: u8) {
        let mask_low = 0u64.wrapping_sub(u64::from(generation & 1));
        let mask_high = 0u64.wrapping_sub(u64::from(generation >> 1));
        for pair in self.data.chunks_exact_mut(2) {
            let keep = (pair[0] ^ mask_low) | (pair[1] ^ mask_high);
            pair[0] &= keep;
            pair[1] &= keep;
        }
    }

    /// `(even word index, bit)` for each hash function.
    fn positions(&self, item: &[u8]) -> Vec<(usize, u32)> {
        let mut stream = vec![0u8; self.hash_funcs as usize * 4];
        keyed_hash_xof(&self.key, item, &mut stream);
        let pairs = self.data.len() / 2;
        stream
            .chunks_exact(4)
            .map(|chunk| {
                let h = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let bit = h & 0x3f;
                let word = ((h >> 6) as usize % pairs) * 2;
                (word, bit)
            })
            .collect()
    }
}
