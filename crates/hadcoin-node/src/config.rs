use crate::constants::{DEFAULT_LISTEN, DEFAULT_REWARD_AMOUNT, DEFAULT_REWARD_RECEIVER, NODE_ID_BYTES};
use clap::Parser;
use hadcoin_core::constants::DEFAULT_PEER_TIMEOUT_SECS;
use hadcoin_core::Transaction;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "hadcoin-node")]
#[command(about = "Proof-of-work ledger node with longest-chain reconciliation")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, env = "HADCOIN_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: String,

    /// Identity credited as the sender of mining rewards (random if omitted)
    #[arg(long, env = "HADCOIN_NODE_ADDRESS")]
    pub node_address: Option<String>,

    /// Who receives the mining reward
    #[arg(long, env = "HADCOIN_REWARD_RECEIVER", default_value = DEFAULT_REWARD_RECEIVER)]
    pub reward_receiver: String,

    /// Reward amount per mined block; 0 disables the reward transaction
    #[arg(long, env = "HADCOIN_REWARD_AMOUNT", default_value_t = DEFAULT_REWARD_AMOUNT)]
    pub reward_amount: i64,

    /// Seconds to wait for a peer's chain during reconciliation
    #[arg(long, env = "HADCOIN_PEER_TIMEOUT_SECS", default_value_t = DEFAULT_PEER_TIMEOUT_SECS)]
    pub peer_timeout_secs: u64,

    /// Peer to register at startup (repeatable), e.g. http://127.0.0.1:5001
    #[arg(long = "peer")]
    pub peers: Vec<String>,
}

/// Runtime settings derived from [`Args`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_address: String,
    pub reward_receiver: String,
    pub reward_amount: i64,
    pub peer_timeout: Duration,
}

impl NodeConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            node_address: args.node_address.clone().unwrap_or_else(random_node_address),
            reward_receiver: args.reward_receiver.clone(),
            reward_amount: args.reward_amount,
            peer_timeout: Duration::from_secs(args.peer_timeout_secs),
        }
    }

    pub fn reward(&self) -> Option<Transaction> {
        (self.reward_amount > 0).then(|| {
            Transaction::new(&self.node_address, &self.reward_receiver, self.reward_amount)
        })
    }
}

fn random_node_address() -> String {
    hex::encode(rand::random::<[u8; NODE_ID_BYTES]>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["hadcoin-node"]);
        assert_eq!(args.listen, DEFAULT_LISTEN);
        assert!(args.peers.is_empty());

        let config = NodeConfig::from_args(&args);
        assert_eq!(config.node_address.len(), NODE_ID_BYTES * 2);
        assert_eq!(config.peer_timeout, Duration::from_secs(DEFAULT_PEER_TIMEOUT_SECS));
        let reward = config.reward().unwrap();
        assert_eq!(reward.sender, config.node_address);
        assert_eq!(reward.receiver, DEFAULT_REWARD_RECEIVER);
        assert_eq!(reward.amount, DEFAULT_REWARD_AMOUNT);
    }

    #[test]
    fn explicit_flags() {
        let args = Args::parse_from([
            "hadcoin-node",
            "--listen",
            "0.0.0.0:5001",
            "--node-address",
            "n1",
            "--reward-amount",
            "0",
            "--peer",
            "http://127.0.0.1:5002",
            "--peer",
            "127.0.0.1:5003",
        ]);
        assert_eq!(args.listen, "0.0.0.0:5001");
        assert_eq!(args.peers.len(), 2);

        let config = NodeConfig::from_args(&args);
        assert_eq!(config.node_address, "n1");
        assert!(config.reward().is_none());
    }
}
