//! Hash functions used for transaction ids, signature digests and addresses.
//!
//! - [`sha256d`] — `SHA256(SHA256(data))`, the transaction-hash function
//! - [`hash160`] — `RIPEMD160(SHA256(data))`, used by pay-to-public-key-hash
//! - [`HashWriter`] — streaming double SHA-256 for serialized preimages

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// `RIPEMD160(SHA256(data))`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// Incremental double SHA-256 over a stream of serialized fields.
///
/// Feeding the same bytes through `write` in any chunking yields the same
/// result as [`sha256d`] over their concatenation.
#[derive(Clone, Default)]
pub struct HashWriter {
    inner: Sha256,
}

impl HashWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes.
    pub fn write(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finish and return the double SHA-256 digest.
    pub fn finish(self) -> [u8; 32] {
        let first = self.inner.finalize();
        Sha256::digest(first).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_sha256d_empty() {
        assert_eq!(
            sha256d(b""),
            hex!("5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456")
        );
    }

    #[test]
    fn test_hash160_empty() {
        assert_eq!(hash160(b""), hex!("b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"));
    }

    #[test]
    fn test_writer_matches_oneshot() {
        let mut writer = HashWriter::new();
        writer.write(b"double").write(b"-spend");
        assert_eq!(writer.finish(), sha256d(b"double-spend"));
    }
}
