pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const POW_DIFFICULTY: usize = 4;
pub const POW_PREFIX: &str = "0000";
pub const GENESIS_PROOF: u64 = 1;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// How many candidates a cancellable search tries between checks of its stop flag.
pub const CANCEL_CHECK_INTERVAL: u64 = 4096;
pub const DEFAULT_PEER_TIMEOUT_SECS: u64 = 5;
