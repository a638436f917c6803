//! BLAKE3 keyed hashing for non-cryptographic indexing.
//!
//! Filters and salted lookup tables key BLAKE3 with a random per-instance
//! tweak so that an adversary cannot precompute colliding inputs.

/// Fill `output` with BLAKE3 XOF bytes of `data` under `key`.
pub fn keyed_hash_xof(key: &[u8; 32], data: &[u8], output: &mut [u8]) {
    let mut hasher = ::blake3::Hasher::new_keyed(key);
    hasher.update(data);
    let mut reader = hasher.finalize_xof();
    reader.fill(output);
}

/// Generate a random 32-byte key.
pub fn random_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut key);
    key
}
