//! 256-bit hash identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::encode::{self, Decodable, Encodable, Reader};

/// A 256-bit hash: transaction ids, proof ids and rolling sighash components.
///
/// Ordering compares the raw bytes left to right. `Display` prints the bytes
/// reversed, matching the conventional txid notation.
#[serde_as]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash256(#[serde_as(as = "serde_with::hex::Hex")] [u8; 32]);

impl Hash256 {
    /// The all-zero hash.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// First eight bytes as a little-endian integer.
    ///
    /// Only fit for bucketing: collisions are expected and tolerated.
    pub fn cheap_hash(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(buf)
    }

    /// Double SHA-256 of `data`.
    pub fn hash(data: &[u8]) -> Self {
        Self(cashnode_crypto::hash::sha256d(data))
    }

    /// Double SHA-256 of the consensus encoding of `value`.
    pub fn of<T: Encodable + ?Sized>(value: &T) -> Self {
        Self::hash(&encode::serialize(value))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({self})")
    }
}

impl FromStr for Hash256 {
    type Err = hex::FromHexError;

    /// Parse the reversed-hex display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl Encodable for Hash256 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

impl Decodable for Hash256 {
    fn decode(reader: &mut Reader<'_>) -> encode::Result<Self> {
        Ok(Self(reader.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_reversed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        let h = Hash256::from_bytes(bytes);
        let s = h.to_string();
        assert!(s.ends_with("ab"));
        assert_eq!(s.parse::<Hash256>().expect("parse"), h);
    }

    #[test]
    fn test_null_and_cheap_hash() {
        assert!(Hash256::ZERO.is_null());
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        bytes[8] = 0xff;
        let h = Hash256::from_bytes(bytes);
        assert!(!h.is_null());
        assert_eq!(h.cheap_hash(), 1);
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        a[0] = 1;
        b[31] = 0xff;
        assert!(Hash256::from_bytes(b) < Hash256::from_bytes(a));
    }

    #[test]
    fn test_serde_hex() {
        let h = Hash256::hash(b"x");
        let json = serde_json::to_string(&h).expect("serialize");
        assert_eq!(json.len(), 66);
        let back: Hash256 = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, h);
    }
}
