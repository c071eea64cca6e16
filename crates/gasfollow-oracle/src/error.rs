//! Oracle error types.

use thiserror::Error;

/// Errors reported by an oracle connector or client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The client could not be constructed: the node is unreachable or
    /// the contract cannot be resolved at the configured address.
    #[error("connection error: {0}")]
    Connection(String),

    /// A single read failed (transport, timeout, or malformed response).
    #[error("read error: {0}")]
    Read(String),
}

pub type OracleResult<T> = Result<T, OracleError>;
