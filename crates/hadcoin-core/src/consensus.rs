use crate::chain::is_chain_valid;
use crate::constants::DEFAULT_PEER_TIMEOUT_SECS;
use crate::ledger::SharedLedger;
use crate::peers::PeerRegistry;
use crate::{Block, ChainSnapshot};
use anyhow::{anyhow, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Source of a peer's chain. This lives in the core so the node can plug in its
/// HTTP client without the core depending on it.
pub trait ChainFetcher: Send + Sync + 'static {
    fn fetch_chain(&self, peer: &str) -> impl Future<Output = Result<ChainSnapshot>> + Send;
}

/// Replaces the local chain with the longest valid chain reported by a peer.
pub struct ConsensusResolver<F: ChainFetcher> {
    fetcher: Arc<F>,
    timeout: Duration,
}

impl<F: ChainFetcher> Clone for ConsensusResolver<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            timeout: self.timeout,
        }
    }
}

impl<F: ChainFetcher> ConsensusResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            timeout: Duration::from_secs(DEFAULT_PEER_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Asks every registered peer for its chain and installs the longest valid one
    /// that beats the local chain. Unreachable or misbehaving peers are skipped.
    /// Equal lengths go to the peer whose address sorts first.
    /// Returns whether the local chain was replaced.
    pub async fn reconcile(&self, ledger: &SharedLedger, registry: &PeerRegistry) -> bool {
        let local_len = ledger.len();
        let responses = self.fetch_all(registry.list()).await;

        let Some((peer, chain)) = select_longest(local_len, responses) else {
            debug!(local_len, "no peer has a longer valid chain");
            return false;
        };

        let length = chain.len();
        let replaced = ledger.replace_chain_if_longer(chain);
        if replaced {
            info!(%peer, from = local_len, to = length, "adopted peer chain");
        } else {
            // Local chain grew past the candidate while peers were being queried.
            debug!(%peer, length, "peer chain no longer longer than local");
        }
        replaced
    }

    /// Fetches all peers concurrently. Failures and timeouts are logged and dropped.
    /// The result is sorted by peer address.
    async fn fetch_all(&self, peers: Vec<String>) -> Vec<(String, ChainSnapshot)> {
        let mut set = JoinSet::new();
        for peer in peers {
            let fetcher = Arc::clone(&self.fetcher);
            let timeout = self.timeout;
            set.spawn(async move {
                let result = match tokio::time::timeout(timeout, fetcher.fetch_chain(&peer)).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("timed out after {timeout:?}")),
                };
                (peer, result)
            });
        }

        let mut responses = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((peer, Ok(snapshot))) => responses.push((peer, snapshot)),
                Ok((peer, Err(e))) => warn!(%peer, error = %e, "skipping peer"),
                Err(e) => warn!(error = %e, "peer fetch task failed"),
            }
        }
        responses.sort_by(|a, b| a.0.cmp(&b.0));
        responses
    }
}

/// Picks the longest valid chain strictly longer than `local_len`. On equal
/// lengths the earlier entry wins.
pub fn select_longest(
    local_len: usize,
    responses: Vec<(String, ChainSnapshot)>,
) -> Option<(String, Vec<Block>)> {
    let mut max_length = local_len;
    let mut longest = None;
    for (peer, snapshot) in responses {
        if snapshot.length != snapshot.chain.len() {
            warn!(%peer, reported = snapshot.length, actual = snapshot.chain.len(), "length mismatch");
            continue;
        }
        if snapshot.length > max_length && is_chain_valid(&snapshot.chain) {
            max_length = snapshot.length;
            longest = Some((peer, snapshot.chain));
        }
    }
    longest
}
