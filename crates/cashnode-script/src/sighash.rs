//! Signature-hash-type flags.
//!
//! The sighash type is the last byte of every transaction signature. Its low
//! five bits select which outputs are committed; the high bits are modifiers.

pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_FORKID: u8 = 0x40;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Mask selecting the base output mode.
pub const SIGHASH_BASE_MASK: u8 = 0x1f;

/// The base output mode (`ALL`, `NONE`, `SINGLE`) of a sighash type.
pub fn base_type(hash_type: u8) -> u8 {
    hash_type & SIGHASH_BASE_MASK
}

pub fn has_fork_id(hash_type: u8) -> bool {
    hash_type & SIGHASH_FORKID != 0
}

pub fn is_anyone_can_pay(hash_type: u8) -> bool {
    hash_type & SIGHASH_ANYONECANPAY != 0
}

pub fn is_single(hash_type: u8) -> bool {
    base_type(hash_type) == SIGHASH_SINGLE
}

pub fn is_none(hash_type: u8) -> bool {
    base_type(hash_type) == SIGHASH_NONE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let ht = SIGHASH_SINGLE | SIGHASH_FORKID | SIGHASH_ANYONECANPAY;
        assert!(is_single(ht));
        assert!(!is_none(ht));
        assert!(has_fork_id(ht));
        assert!(is_anyone_can_pay(ht));
        assert!(!has_fork_id(SIGHASH_ALL));
    }
}
