//! Test helpers: deterministic wallets, signed P2PKH spends and an in-memory
//! [`ProofContext`].

use std::collections::HashMap;
use std::sync::Arc;

use cashnode_crypto::hash::hash160;
use cashnode_crypto::secp256k1::KeyPair;
use cashnode_script::Script;
use cashnode_types::{Amount, Hash256, OutPoint, Transaction, TxIn, TxOut};

use crate::context::ProofContext;
use crate::sighash::transaction_digest;

/// Signature scheme used when signing test spends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigKind {
    Ecdsa,
    Schnorr,
}

/// A single-key P2PKH wallet derived from a seed byte.
#[derive(Clone)]
pub struct Wallet {
    key: KeyPair,
}

impl Wallet {
    /// `seed` must be non-zero.
    pub fn new(seed: u8) -> Self {
        let key = KeyPair::from_bytes(&[seed; 32]).expect("non-zero seed is a valid secret");
        Self { key }
    }

    pub fn pubkey(&self) -> [u8; 33] {
        self.key.public_key()
    }

    pub fn script_pubkey(&self) -> Script {
        Script::p2pkh(&hash160(&self.pubkey()))
    }

    pub fn output(&self, value: Amount) -> TxOut {
        TxOut {
            value,
            script_pubkey: self.script_pubkey(),
        }
    }

    /// A transaction paying `value` to this wallet, funded from a made-up
    /// outpoint distinguished by `salt`.
    pub fn funding_tx(&self, value: Amount, salt: u8) -> Transaction {
        Transaction {
            version: 2,
            inputs: vec![TxIn {
                prevout: OutPoint::new(Hash256::hash(&[b'f', salt]), 0),
                script_sig: Script::new(),
                sequence: TxIn::SEQUENCE_FINAL,
            }],
            outputs: vec![self.output(value)],
            lock_time: 0,
        }
    }

    /// Spend `prevouts` (all owned by this wallet) into `outputs`.
    pub fn spend(
        &self,
        prevouts: &[(OutPoint, TxOut)],
        outputs: Vec<TxOut>,
        sequence: u32,
        kind: SigKind,
        hash_type: u8,
    ) -> Transaction {
        let mut tx = Transaction {
            version: 2,
            inputs: prevouts
                .iter()
                .map(|(outpoint, _)| TxIn {
                    prevout: *outpoint,
                    script_sig: Script::new(),
                    sequence,
                })
                .collect(),
            outputs,
            lock_time: 0,
        };
        for (index, (_, prev_out)) in prevouts.iter().enumerate() {
            self.sign_input(&mut tx, index, prev_out, kind, hash_type);
        }
        tx
    }

    /// Replace input `index`'s unlocking script with `<sig> <pubkey>`.
    pub fn sign_input(
        &self,
        tx: &mut Transaction,
        index: usize,
        prev_out: &TxOut,
        kind: SigKind,
        hash_type: u8,
    ) {
        let digest = transaction_digest(tx, index, &prev_out.script_pubkey, prev_out.value, hash_type)
            .expect("input index in range");
        let mut sig = match kind {
            SigKind::Ecdsa => self.key.sign_ecdsa(digest.as_bytes()).expect("ecdsa sign"),
            SigKind::Schnorr => self
                .key
                .sign_schnorr(digest.as_bytes())
                .expect("schnorr sign")
                .to_vec(),
        };
        sig.push(hash_type);

        let mut script_sig = Script::new();
        script_sig.push_slice(&sig).push_slice(&self.pubkey());
        tx.inputs[index].script_sig = script_sig;
    }
}

/// Two signed transactions spending the same output to different payees.
pub struct Scenario {
    pub owner: Wallet,
    pub funding: Transaction,
    pub outpoint: OutPoint,
    pub prev_out: TxOut,
    pub first: Transaction,
    pub second: Transaction,
}

impl Scenario {
    pub fn new(kind: SigKind, hash_type: u8) -> Self {
        Self::with_seed(kind, hash_type, 1)
    }

    /// Different seeds give unrelated scenarios. `seed` must be below 254.
    pub fn with_seed(kind: SigKind, hash_type: u8, seed: u8) -> Self {
        let owner = Wallet::new(seed);
        let funding = owner.funding_tx(100_000, seed);
        let outpoint = OutPoint::new(funding.txid(), 0);
        let prev_out = funding.outputs[0].clone();
        let prevouts = [(outpoint, prev_out.clone())];

        let first = owner.spend(
            &prevouts,
            vec![Wallet::new(seed + 1).output(90_000)],
            TxIn::SEQUENCE_FINAL,
            kind,
            hash_type,
        );
        let second = owner.spend(
            &prevouts,
            vec![Wallet::new(seed + 2).output(90_000)],
            TxIn::SEQUENCE_FINAL,
            kind,
            hash_type,
        );
        Self {
            owner,
            funding,
            outpoint,
            prev_out,
            first,
            second,
        }
    }
}

/// Mempool and UTXO maps behind [`ProofContext`].
#[derive(Default)]
pub struct MemoryContext {
    mempool: HashMap<Hash256, Arc<Transaction>>,
    utxos: HashMap<OutPoint, TxOut>,
    spenders: HashMap<OutPoint, Arc<Transaction>>,
}

impl MemoryContext {
    pub fn add_utxo(&mut self, outpoint: OutPoint, output: TxOut) {
        self.utxos.insert(outpoint, output);
    }

    /// Add a mempool transaction; the first transaction seen spending an
    /// outpoint stays its spender.
    pub fn add_mempool_tx(&mut self, tx: Transaction) {
        let txid = tx.txid();
        self.add_mempool_tx_as(txid, tx);
    }

    /// Add a mempool transaction under an explicit id.
    pub fn add_mempool_tx_as(&mut self, txid: Hash256, tx: Transaction) {
        let tx = Arc::new(tx);
        for input in &tx.inputs {
            self.spenders
                .entry(input.prevout)
                .or_insert_with(|| Arc::clone(&tx));
        }
        self.mempool.insert(txid, tx);
    }
}

impl ProofContext for MemoryContext {
    fn mempool_tx(&self, txid: &Hash256) -> Option<Arc<Transaction>> {
        self.mempool.get(txid).cloned()
    }

    fn utxo(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.utxos.get(outpoint).cloned()
    }

    fn spender_of(&self, outpoint: &OutPoint) -> Option<Arc<Transaction>> {
        self.spenders.get(outpoint).cloned()
    }
}
