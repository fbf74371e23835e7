use crate::error::{LedgerError, Result};
use std::collections::BTreeSet;
use tracing::debug;

/// Known peers as `host:port` network locations. Never pruned.
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only the network location of `address` and records it. Returns the
    /// stored location; registering the same peer twice is a no-op.
    pub fn register(&mut self, address: &str) -> Result<String> {
        let location = network_location(address)?;
        if self.peers.insert(location.clone()) {
            debug!(peer = %location, "peer registered");
        }
        Ok(location)
    }

    /// Sorted snapshot of the registered peers.
    pub fn list(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// `http://user@127.0.0.1:5001/get_chain?x=1` -> `127.0.0.1:5001`
pub fn network_location(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let rest = match trimmed.find("://") {
        Some(pos) => &trimmed[pos + 3..],
        None => trimmed.strip_prefix("//").unwrap_or(trimmed),
    };
    let authority = rest
        .split(|c: char| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    let location = authority.rsplit('@').next().unwrap_or_default();

    if location.is_empty() || location.chars().any(char::is_whitespace) {
        return Err(LedgerError::InvalidPeer(address.to_string()));
    }
    Ok(location.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_host_and_port() {
        assert_eq!(network_location("http://127.0.0.1:5001/").unwrap(), "127.0.0.1:5001");
        assert_eq!(
            network_location("https://node.example.org:8443/get_chain?full=1").unwrap(),
            "node.example.org:8443"
        );
        assert_eq!(network_location("http://alice@10.0.0.2:5000").unwrap(), "10.0.0.2:5000");
        assert_eq!(network_location("127.0.0.1:5002").unwrap(), "127.0.0.1:5002");
        assert_eq!(network_location("//localhost:5003/x").unwrap(), "localhost:5003");
    }

    #[test]
    fn rejects_empty_locations() {
        for bad in ["", "   ", "http://", "http:///path", "http://a b:1"] {
            assert!(
                matches!(network_location(bad), Err(LedgerError::InvalidPeer(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = PeerRegistry::new();
        registry.register("http://127.0.0.1:5002").unwrap();
        registry.register("http://127.0.0.1:5002/").unwrap();
        registry.register("127.0.0.1:5002").unwrap();
        registry.register("http://127.0.0.1:5001").unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list(), vec!["127.0.0.1:5001", "127.0.0.1:5002"]);
    }
}
