use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod consensus;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod mine;
pub mod peers;

pub use error::LedgerError;

// Field order is the hashing order: every serialized struct below declares its
// fields alphabetically so the JSON form always has sorted keys.

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: i64,
    pub receiver: String,
    pub sender: String,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: i64) -> Self {
        Self {
            amount,
            receiver: receiver.into(),
            sender: sender.into(),
        }
    }
}

/// A submitted transaction before its fields have been checked for presence.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TransactionInput {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub amount: Option<i64>,
}

impl TransactionInput {
    pub fn into_transaction(self) -> error::Result<Transaction> {
        let sender = self.sender.ok_or(LedgerError::MissingField("sender"))?;
        let receiver = self.receiver.ok_or(LedgerError::MissingField("receiver"))?;
        let amount = self.amount.ok_or(LedgerError::MissingField("amount"))?;
        Ok(Transaction::new(sender, receiver, amount))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub proof: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        index: u64,
        proof: u64,
        previous_hash: impl Into<String>,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            index,
            previous_hash: previous_hash.into(),
            proof,
            timestamp: now_secs(),
            transactions,
        }
    }
}

/// A chain together with its reported length, as served by `GET /get_chain`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainSnapshot {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes.as_ref());
    hex::encode(hasher.finalize())
}

/// Canonical bytes of a block: compact JSON with lexicographically sorted keys.
pub fn canonical_bytes(block: &Block) -> Vec<u8> {
    // Strings and integers only; serialization cannot fail.
    serde_json::to_vec(block).expect("block serializes to json")
}

pub fn fingerprint(block: &Block) -> String {
    sha256_hex(canonical_bytes(block))
}

pub mod pow {
    use crate::constants::{CANCEL_CHECK_INTERVAL, POW_PREFIX};
    use crate::sha256_hex;
    use num_bigint::BigInt;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Digest of `proof^2 - previous_proof^2`, computed exactly and hashed in decimal form.
    pub fn puzzle_digest(proof: u64, previous_proof: u64) -> String {
        let p = BigInt::from(proof);
        let q = BigInt::from(previous_proof);
        let operation = &p * &p - &q * &q;
        sha256_hex(operation.to_string())
    }

    pub fn meets_target(digest: &str) -> bool {
        digest.starts_with(POW_PREFIX)
    }

    pub fn is_valid_proof(proof: u64, previous_proof: u64) -> bool {
        meets_target(&puzzle_digest(proof, previous_proof))
    }

    /// Smallest proof >= 1 that satisfies the puzzle against `previous_proof`.
    /// Unbounded; expected ~65k attempts at the fixed target.
    pub fn solve(previous_proof: u64) -> u64 {
        let mut candidate = 1u64;
        while !is_valid_proof(candidate, previous_proof) {
            candidate += 1;
        }
        candidate
    }

    /// Same search as [`solve`], giving up with `None` once `stop` is raised.
    pub fn solve_with_cancel(previous_proof: u64, stop: &AtomicBool) -> Option<u64> {
        let mut candidate = 1u64;
        loop {
            if candidate % CANCEL_CHECK_INTERVAL == 0 && stop.load(Ordering::Relaxed) {
                return None;
            }
            if is_valid_proof(candidate, previous_proof) {
                return Some(candidate);
            }
            candidate += 1;
        }
    }
}

pub mod chain {
    use super::*;
    use crate::constants::{GENESIS_PREVIOUS_HASH, GENESIS_PROOF};

    pub fn genesis_block() -> Block {
        Block::new(1, GENESIS_PROOF, GENESIS_PREVIOUS_HASH, vec![])
    }

    /// Walks every consecutive pair checking the hash link and the puzzle.
    /// The first block is trusted as genesis.
    pub fn is_chain_valid(chain: &[Block]) -> bool {
        chain.windows(2).all(|pair| {
            let (previous, block) = (&pair[0], &pair[1]);
            block.previous_hash == fingerprint(previous)
                && pow::is_valid_proof(block.proof, previous.proof)
        })
    }
}
