pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
pub(crate) const DEFAULT_REWARD_RECEIVER: &str = "miner";
pub(crate) const DEFAULT_REWARD_AMOUNT: i64 = 1;
pub(crate) const NODE_ID_BYTES: usize = 16;
