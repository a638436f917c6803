//! Script byte container, builder and instruction parser.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::opcodes::*;
use crate::{Result, ScriptError};

/// A serialized script (locking or unlocking).
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script(Vec<u8>);

/// One parsed script operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// A data push (`OP_0`, direct pushes and `OP_PUSHDATA1/2/4`).
    Push(&'a [u8]),
    /// Any other opcode.
    Op(u8),
}

impl Script {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Append a data push using the smallest push encoding.
    pub fn push_slice(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len < OP_PUSHDATA1 as usize {
            self.0.push(len as u8);
        } else if len <= 0xff {
            self.0.push(OP_PUSHDATA1);
            self.0.push(len as u8);
        } else if len <= 0xffff {
            self.0.push(OP_PUSHDATA2);
            self.0.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.0.push(OP_PUSHDATA4);
            self.0.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.0.extend_from_slice(data);
        self
    }

    /// Append a bare opcode.
    pub fn push_opcode(&mut self, op: u8) -> &mut Self {
        self.0.push(op);
        self
    }

    /// Standard pay-to-public-key-hash locking script:
    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut script = Self::new();
        script
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(pubkey_hash)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG);
        script
    }

    /// Standard pay-to-script-hash locking script: `OP_HASH160 <hash> OP_EQUAL`.
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        let mut script = Self::new();
        script
            .push_opcode(OP_HASH160)
            .push_slice(script_hash)
            .push_opcode(OP_EQUAL);
        script
    }

    pub fn is_pay_to_pubkey_hash(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == 20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    pub fn is_pay_to_script_hash(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == 20 && b[22] == OP_EQUAL
    }

    /// True when every operation is a data push or a small-integer opcode.
    pub fn is_push_only(&self) -> bool {
        self.instructions().all(|ins| match ins {
            Ok(Instruction::Push(_)) => true,
            Ok(Instruction::Op(op)) => op <= OP_16,
            Err(_) => false,
        })
    }

    /// Iterate over the operations of this script.
    pub fn instructions(&self) -> Instructions<'_> {
        Instructions {
            data: &self.0,
            pos: 0,
            failed: false,
        }
    }

    /// Data carried by the first operation, if it is a well-formed push.
    ///
    /// Returns `None` for an empty script, a truncated push, or when the first
    /// operation is not a data push.
    pub fn first_push(&self) -> Option<&[u8]> {
        match self.instructions().next()? {
            Ok(Instruction::Push(data)) => Some(data),
            _ => None,
        }
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Iterator over script operations. Stops after the first malformed push.
pub struct Instructions<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ScriptError::MalformedPush)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_len(&mut self, width: usize) -> Result<usize> {
        let bytes = self.take(width)?;
        let mut buf = [0u8; 4];
        buf[..width].copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf) as usize)
    }

    fn next_instruction(&mut self) -> Result<Instruction<'a>> {
        let op = self.take(1)?[0];
        let len = match op {
            0x00..=0x4b => op as usize,
            OP_PUSHDATA1 => self.read_len(1)?,
            OP_PUSHDATA2 => self.read_len(2)?,
            OP_PUSHDATA4 => self.read_len(4)?,
            _ => return Ok(Instruction::Op(op)),
        };
        Ok(Instruction::Push(self.take(len)?))
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let item = self.next_instruction();
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_encodings() {
        let mut s = Script::new();
        s.push_slice(&[0xaa; 3]);
        assert_eq!(s.as_bytes()[0], 3);

        let mut s = Script::new();
        s.push_slice(&[0xaa; 80]);
        assert_eq!(&s.as_bytes()[..2], &[OP_PUSHDATA1, 80]);

        let mut s = Script::new();
        s.push_slice(&[0xaa; 300]);
        assert_eq!(s.as_bytes()[0], OP_PUSHDATA2);
        assert_eq!(s.first_push().map(|d| d.len()), Some(300));
    }

    #[test]
    fn test_p2pkh_detection() {
        let script = Script::p2pkh(&[7u8; 20]);
        assert!(script.is_pay_to_pubkey_hash());
        assert!(!script.is_pay_to_script_hash());
        assert!(Script::p2sh(&[7u8; 20]).is_pay_to_script_hash());
    }

    #[test]
    fn test_instructions() {
        let mut s = Script::new();
        s.push_slice(b"sig").push_slice(b"key").push_opcode(OP_CHECKSIG);
        let ops: Vec<_> = s.instructions().collect::<Result<_>>().expect("parse");
        assert_eq!(
            ops,
            vec![
                Instruction::Push(b"sig"),
                Instruction::Push(b"key"),
                Instruction::Op(OP_CHECKSIG)
            ]
        );
        assert!(!s.is_push_only());
    }

    #[test]
    fn test_truncated_push() {
        let s = Script::from_bytes(vec![5, 1, 2]);
        let mut it = s.instructions();
        assert!(matches!(it.next(), Some(Err(ScriptError::MalformedPush))));
        assert!(it.next().is_none());
        assert!(s.first_push().is_none());
    }

    #[test]
    fn test_first_push_non_push_op() {
        let mut s = Script::new();
        s.push_opcode(OP_DUP);
        assert!(s.first_push().is_none());
        assert!(Script::new().first_push().is_none());
    }
}
