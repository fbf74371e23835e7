use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The chain lost its genesis block. Only reachable through corrupted state.
    #[error("chain is empty: genesis block missing")]
    EmptyChain,

    #[error("transaction is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("invalid peer address: {0:?}")]
    InvalidPeer(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
