use crate::chain::{genesis_block, is_chain_valid};
use crate::error::{LedgerError, Result};
use crate::{fingerprint, mine, pow, Block, ChainSnapshot, Transaction, TransactionInput};
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The chain and the pool of transactions waiting for the next block.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending_transactions: Vec<Transaction>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// A ledger holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![genesis_block()],
            pending_transactions: Vec::new(),
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot::new(self.chain.clone())
    }

    pub fn is_valid(&self) -> bool {
        is_chain_valid(&self.chain)
    }

    /// Appends a block carrying the whole pending pool. The proof is not checked.
    pub fn create_block(&mut self, proof: u64, previous_hash: impl Into<String>) -> Block {
        let transactions = std::mem::take(&mut self.pending_transactions);
        let block = Block::new(self.chain.len() as u64 + 1, proof, previous_hash, transactions);
        self.chain.push(block.clone());
        debug!(index = block.index, txs = block.transactions.len(), "block appended");
        block
    }

    pub fn previous_block(&self) -> Result<&Block> {
        self.chain.last().ok_or_else(|| {
            error!("ledger has no blocks; genesis invariant violated");
            LedgerError::EmptyChain
        })
    }

    /// Queues a transaction and returns the index of the block it should land in.
    pub fn add_transaction(
        &mut self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: i64,
    ) -> Result<u64> {
        let next_index = self.previous_block()?.index + 1;
        self.pending_transactions
            .push(Transaction::new(sender, receiver, amount));
        Ok(next_index)
    }

    pub fn submit(&mut self, input: TransactionInput) -> Result<u64> {
        let tx = input.into_transaction()?;
        self.add_transaction(tx.sender, tx.receiver, tx.amount)
    }

    /// Solves the puzzle against the tip and appends the resulting block.
    pub fn mine(&mut self) -> Result<Block> {
        let previous = self.previous_block()?;
        let proof = pow::solve(previous.proof);
        let previous_hash = fingerprint(previous);
        Ok(self.create_block(proof, previous_hash))
    }

    /// Installs `candidate` only if it is strictly longer and valid.
    pub fn replace_chain_if_longer(&mut self, candidate: Vec<Block>) -> bool {
        if candidate.len() <= self.chain.len() {
            return false;
        }
        if !is_chain_valid(&candidate) {
            debug!(len = candidate.len(), "rejected invalid candidate chain");
            return false;
        }
        info!(from = self.chain.len(), to = candidate.len(), "chain replaced");
        self.chain = candidate;
        true
    }
}

/// Cloneable handle to one [`Ledger`]. Every mutation happens under a single
/// lock; proof-of-work runs outside it.
#[derive(Clone, Debug, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn is_valid(&self) -> bool {
        // Validate a copy so hashing does not hold the lock.
        let chain = self.inner.lock().chain().to_vec();
        is_chain_valid(&chain)
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.inner.lock().pending_transactions().to_vec()
    }

    pub fn add_transaction(
        &self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: i64,
    ) -> Result<u64> {
        self.inner.lock().add_transaction(sender, receiver, amount)
    }

    pub fn submit(&self, input: TransactionInput) -> Result<u64> {
        self.inner.lock().submit(input)
    }

    pub fn replace_chain_if_longer(&self, candidate: Vec<Block>) -> bool {
        self.inner.lock().replace_chain_if_longer(candidate)
    }

    /// Mines one block. The search runs unlocked; if the tip moved meanwhile
    /// (another block was mined or the chain replaced) the search restarts
    /// against the new tip. `reward` is queued right before the block is cut.
    /// Returns `Ok(None)` when `stop` is raised.
    pub fn mine(&self, reward: Option<Transaction>, stop: &AtomicBool) -> Result<Option<Block>> {
        loop {
            let (previous_proof, previous_hash) = {
                let ledger = self.inner.lock();
                let previous = ledger.previous_block()?;
                (previous.proof, fingerprint(previous))
            };

            let Some(proof) = mine::solve_parallel(previous_proof, stop) else {
                return Ok(None);
            };

            let mut ledger = self.inner.lock();
            if fingerprint(ledger.previous_block()?) != previous_hash {
                debug!("tip moved during proof search; retrying");
                continue;
            }
            if let Some(tx) = reward.clone() {
                ledger.pending_transactions.push(tx);
            }
            let block = ledger.create_block(proof, previous_hash);
            info!(index = block.index, proof, "mined block");
            return Ok(Some(block));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mined_ledger(blocks: usize) -> Ledger {
        let mut ledger = Ledger::new();
        while ledger.len() < blocks {
            ledger.mine().unwrap();
        }
        ledger
    }

    #[test]
    fn genesis_invariant() {
        let ledger = Ledger::new();
        assert_eq!(ledger.len(), 1);
        let genesis = &ledger.chain()[0];
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.proof, 1);
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn add_transaction_then_mine() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.add_transaction("A", "B", 10).unwrap(), 2);

        let block = ledger.mine().unwrap();
        assert_eq!(block.index, 2);
        assert_eq!(block.proof, 533);
        assert_eq!(block.transactions, vec![Transaction::new("A", "B", 10)]);
        assert!(ledger.pending_transactions().is_empty());
        assert_eq!(ledger.chain().last(), Some(&block));
    }

    #[test]
    fn mine_drains_pool_in_order() {
        let mut ledger = Ledger::new();
        ledger.add_transaction("A", "B", 1).unwrap();
        ledger.add_transaction("B", "C", 2).unwrap();
        ledger.add_transaction("C", "A", 3).unwrap();
        let before = ledger.pending_transactions().to_vec();

        let block = ledger.mine().unwrap();
        assert_eq!(block.transactions, before);
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn mined_chains_are_valid() {
        let ledger = mined_ledger(4);
        assert_eq!(ledger.len(), 4);
        assert!(ledger.is_valid());
        for (i, block) in ledger.chain().iter().enumerate() {
            assert_eq!(block.index, i as u64 + 1);
        }
        for pair in ledger.chain().windows(2) {
            assert!(pow::puzzle_digest(pair[1].proof, pair[0].proof).starts_with("0000"));
        }
    }

    #[test]
    fn tampering_is_detected() {
        let ledger = mined_ledger(4);
        for i in 0..ledger.len() {
            let mut proof_tampered = ledger.chain().to_vec();
            proof_tampered[i].proof += 1;
            assert!(!is_chain_valid(&proof_tampered), "proof change at {i}");

            let mut hash_tampered = ledger.chain().to_vec();
            hash_tampered[i].previous_hash = "f00d".to_string();
            assert!(!is_chain_valid(&hash_tampered), "hash change at {i}");
        }
    }

    #[test]
    fn create_block_uses_next_index() {
        let mut ledger = Ledger::new();
        let block = ledger.create_block(99, "whatever");
        assert_eq!(block.index, 2);
        assert_eq!(block.previous_hash, "whatever");
        assert!(!ledger.is_valid());
    }

    #[test]
    fn empty_chain_is_an_error() {
        let mut ledger = Ledger::new();
        ledger.chain.clear();
        assert_eq!(ledger.previous_block(), Err(LedgerError::EmptyChain));
        assert_eq!(ledger.add_transaction("A", "B", 1), Err(LedgerError::EmptyChain));
        assert!(ledger.pending_transactions().is_empty());
        assert_eq!(ledger.mine(), Err(LedgerError::EmptyChain));
    }

    #[test]
    fn submit_missing_field_leaves_pool_unchanged() {
        let mut ledger = Ledger::new();
        ledger.add_transaction("X", "Y", 7).unwrap();
        let input = TransactionInput {
            sender: Some("A".into()),
            receiver: Some("B".into()),
            amount: None,
        };
        assert_eq!(ledger.submit(input), Err(LedgerError::MissingField("amount")));
        assert_eq!(ledger.pending_transactions(), &[Transaction::new("X", "Y", 7)]);
    }

    #[test]
    fn replacement_requires_longer_chain() {
        let mut local = mined_ledger(3);
        let shorter = mined_ledger(2);
        let original = local.chain().to_vec();

        assert!(!local.replace_chain_if_longer(shorter.chain().to_vec()));
        assert!(!local.replace_chain_if_longer(original.clone()));
        assert_eq!(local.chain(), original.as_slice());
    }

    #[test]
    fn replacement_rejects_invalid_chain() {
        let mut local = Ledger::new();
        let mut forged = mined_ledger(3).chain().to_vec();
        forged[2].previous_hash = "0".to_string();

        assert!(!local.replace_chain_if_longer(forged));
        assert_eq!(local.len(), 1);
    }

    #[test]
    fn replacement_installs_longer_valid_chain() {
        let mut local = Ledger::new();
        let remote = mined_ledger(3);
        assert!(local.replace_chain_if_longer(remote.chain().to_vec()));
        assert_eq!(local.chain(), remote.chain());
    }

    #[test]
    fn shared_mine_includes_reward() {
        let shared = SharedLedger::default();
        shared.add_transaction("A", "B", 10).unwrap();
        let stop = AtomicBool::new(false);
        let reward = Transaction::new("node-1", "miner", 1);

        let block = shared.mine(Some(reward.clone()), &stop).unwrap().unwrap();
        assert_eq!(block.index, 2);
        assert_eq!(block.transactions, vec![Transaction::new("A", "B", 10), reward]);
        assert!(shared.pending_transactions().is_empty());
        assert!(shared.is_valid());
    }

    #[test]
    fn shared_mine_stops_without_mutation() {
        let shared = SharedLedger::default();
        shared.add_transaction("A", "B", 10).unwrap();
        let stop = AtomicBool::new(true);

        assert_eq!(shared.mine(None, &stop), Ok(None));
        assert_eq!(shared.len(), 1);
        assert_eq!(shared.pending_transactions().len(), 1);
    }

    #[test]
    fn concurrent_mining_stays_linear() {
        let shared = SharedLedger::default();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    let stop = AtomicBool::new(false);
                    shared.mine(None, &stop).unwrap().unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shared.len(), 4);
        assert!(shared.is_valid());
    }
}
