//! Transactions and their parts.

use std::fmt;

use cashnode_script::Script;
use serde::{Deserialize, Serialize};

use crate::encode::{self, Decodable, Encodable, Reader};
use crate::{Amount, Hash256};

/// Reference to a previous transaction output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash256,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, index: u32) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

impl Encodable for OutPoint {
    fn encode(&self, out: &mut Vec<u8>) {
        self.txid.encode(out);
        self.index.encode(out);
    }
}

impl Decodable for OutPoint {
    fn decode(reader: &mut Reader<'_>) -> encode::Result<Self> {
        Ok(Self {
            txid: Hash256::decode(reader)?,
            index: reader.read_u32()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
}

impl TxIn {
    pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;
}

impl Encodable for TxIn {
    fn encode(&self, out: &mut Vec<u8>) {
        self.prevout.encode(out);
        self.script_sig.encode(out);
        self.sequence.encode(out);
    }
}

impl Decodable for TxIn {
    fn decode(reader: &mut Reader<'_>) -> encode::Result<Self> {
        Ok(Self {
            prevout: OutPoint::decode(reader)?,
            script_sig: Script::decode(reader)?,
            sequence: reader.read_u32()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Amount,
    pub script_pubkey: Script,
}

impl Encodable for TxOut {
    fn encode(&self, out: &mut Vec<u8>) {
        self.value.encode(out);
        self.script_pubkey.encode(out);
    }
}

impl Decodable for TxOut {
    fn decode(reader: &mut Reader<'_>) -> encode::Result<Self> {
        Ok(Self {
            value: reader.read_i64()?,
            script_pubkey: Script::decode(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// Double SHA-256 of the serialized transaction.
    pub fn txid(&self) -> Hash256 {
        Hash256::of(self)
    }

    /// Serialized size in bytes.
    pub fn total_size(&self) -> usize {
        encode::serialize(self).len()
    }

    /// True if the two transactions are identical once every unlocking script
    /// is blanked out, i.e. they differ only in their signatures.
    pub fn is_equivalent_to(&self, other: &Transaction) -> bool {
        self.without_script_sigs() == other.without_script_sigs()
    }

    fn without_script_sigs(&self) -> Transaction {
        let mut stripped = self.clone();
        for input in &mut stripped.inputs {
            input.script_sig.clear();
        }
        stripped
    }
}

impl Encodable for Transaction {
    fn encode(&self, out: &mut Vec<u8>) {
        self.version.encode(out);
        self.inputs.encode(out);
        self.outputs.encode(out);
        self.lock_time.encode(out);
    }
}

impl Decodable for Transaction {
    fn decode(reader: &mut Reader<'_>) -> encode::Result<Self> {
        Ok(Self {
            version: reader.read_i32()?,
            inputs: Vec::decode(reader)?,
            outputs: Vec::decode(reader)?,
            lock_time: reader.read_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        let mut script_sig = Script::new();
        script_sig.push_slice(b"signature").push_slice(&[2u8; 33]);
        Transaction {
            version: 2,
            inputs: vec![TxIn {
                prevout: OutPoint::new(Hash256::hash(b"funding"), 1),
                script_sig,
                sequence: 5,
            }],
            outputs: vec![TxOut {
                value: 50_000,
                script_pubkey: Script::p2pkh(&[9u8; 20]),
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn test_encoding_layout() {
        let tx = sample();
        let bytes = encode::serialize(&tx);
        // version + vin count + outpoint + script + sequence + vout count + output + locktime
        let expected = 4 + 1 + 36 + (1 + 10 + 34) + 4 + 1 + (8 + 1 + 25) + 4;
        assert_eq!(bytes.len(), expected);
        let decoded: Transaction = encode::deserialize(&bytes).expect("decode");
        assert_eq!(decoded, tx);
        assert_eq!(decoded.txid(), tx.txid());
    }

    #[test]
    fn test_equivalence_ignores_script_sig() {
        let a = sample();
        let mut b = sample();
        let mut other_sig = Script::new();
        other_sig.push_slice(b"another-signature");
        b.inputs[0].script_sig = other_sig;
        assert_ne!(a.txid(), b.txid());
        assert!(a.is_equivalent_to(&b));

        b.outputs[0].value += 1;
        assert!(!a.is_equivalent_to(&b));
    }

    #[test]
    fn test_outpoint_display() {
        let op = OutPoint::new(Hash256::ZERO, 3);
        assert!(op.to_string().ends_with(":3"));
    }
}
