use anyhow::{anyhow, Result};
use hadcoin_core::consensus::ChainFetcher;
use hadcoin_core::ledger::{Ledger, SharedLedger};
use hadcoin_core::ChainSnapshot;
use std::collections::HashMap;

/// Serves the chains of in-process ledgers keyed by peer address.
#[derive(Default)]
pub struct LocalNetwork {
    nodes: HashMap<String, SharedLedger>,
}

impl LocalNetwork {
    pub fn add(&mut self, address: &str, ledger: SharedLedger) {
        self.nodes.insert(address.to_string(), ledger);
    }
}

impl ChainFetcher for LocalNetwork {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainSnapshot> {
        self.nodes
            .get(peer)
            .map(SharedLedger::snapshot)
            .ok_or_else(|| anyhow!("no route to {peer}"))
    }
}

pub fn ledger_with_blocks(blocks: usize) -> SharedLedger {
    let mut ledger = Ledger::new();
    while ledger.len() < blocks {
        ledger.mine().expect("mine block");
    }
    SharedLedger::new(ledger)
}
