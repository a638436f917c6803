//! Consensus binary encoding.
//!
//! Integers are fixed-width little-endian. Variable-length fields (byte
//! strings, lists) carry a compact-size length prefix:
//!
//! | value             | encoding                  |
//! |-------------------|---------------------------|
//! | `< 0xfd`          | 1 byte                    |
//! | `<= 0xffff`       | `0xfd` + u16              |
//! | `<= 0xffff_ffff`  | `0xfe` + u32              |
//! | larger            | `0xff` + u64              |
//!
//! Decoding rejects non-minimal compact sizes.

use cashnode_script::Script;

/// Upper bound accepted for any single length prefix.
pub const MAX_SIZE: u64 = 0x0200_0000;

/// Errors raised while decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Input ended before the value was complete.
    #[error("unexpected end of data")]
    Truncated,

    /// A compact size used a longer form than necessary.
    #[error("non-canonical compact size")]
    NonCanonicalCompactSize,

    /// A length prefix exceeds the allowed maximum.
    #[error("length {len} exceeds maximum {max}")]
    Oversized { len: u64, max: u64 },

    /// Bytes remained after the top-level value was decoded.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// Structurally valid bytes that violate a type-level limit.
    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, EncodeError>;

/// A value with a consensus binary encoding.
pub trait Encodable {
    fn encode(&self, out: &mut Vec<u8>);
}

/// A value that can be read back from its consensus binary encoding.
pub trait Decodable: Sized {
    fn decode(reader: &mut Reader<'_>) -> Result<Self>;
}

/// Encode a value into a fresh buffer.
pub fn serialize<T: Encodable + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.encode(&mut out);
    out
}

/// Decode a value that must span the whole of `bytes`.
pub fn deserialize<T: Decodable>(bytes: &[u8]) -> Result<T> {
    let mut reader = Reader::new(bytes);
    let value = T::decode(&mut reader)?;
    if reader.remaining() != 0 {
        return Err(EncodeError::TrailingBytes(reader.remaining()));
    }
    Ok(value)
}

pub fn write_compact_size(out: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        out.push(n as u8);
    } else if n <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&n.to_le_bytes());
    }
}

/// Write a compact-size prefixed byte string.
pub fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_compact_size(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Cursor over an encoded byte slice.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(EncodeError::Truncated);
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.bytes[start..start + len])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_compact_size(&mut self) -> Result<u64> {
        let tag = self.read_u8()?;
        let (value, min) = match tag {
            0xfd => (u64::from(u16::from_le_bytes(self.read_array()?)), 0xfd),
            0xfe => (u64::from(u32::from_le_bytes(self.read_array()?)), 0x1_0000),
            0xff => (u64::from_le_bytes(self.read_array()?), 0x1_0000_0000),
            n => return Ok(u64::from(n)),
        };
        if value < min {
            return Err(EncodeError::NonCanonicalCompactSize);
        }
        if value > MAX_SIZE {
            return Err(EncodeError::Oversized {
                len: value,
                max: MAX_SIZE,
            });
        }
        Ok(value)
    }

    /// Read a compact-size prefixed byte string.
    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_compact_size()?;
        Ok(self.read_bytes(len as usize)?.to_vec())
    }
}

impl Encodable for u32 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Decodable for u32 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.read_u32()
    }
}

impl Encodable for i32 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Decodable for i32 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.read_i32()
    }
}

impl Encodable for i64 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Decodable for i64 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        reader.read_i64()
    }
}

impl Encodable for Script {
    fn encode(&self, out: &mut Vec<u8>) {
        write_var_bytes(out, self.as_bytes());
    }
}

impl Decodable for Script {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Script::from_bytes(reader.read_var_bytes()?))
    }
}

impl<T: Encodable> Encodable for [T] {
    fn encode(&self, out: &mut Vec<u8>) {
        write_compact_size(out, self.len() as u64);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        self.as_slice().encode(out);
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let len = reader.read_compact_size()? as usize;
        // Every element takes at least one byte.
        let mut items = Vec::with_capacity(len.min(reader.remaining()));
        for _ in 0..len {
            items.push(T::decode(reader)?);
        }
        Ok(items)
    }
}
