//! Oracle client contract.

use async_trait::async_trait;

use crate::error::OracleResult;
use crate::value::SampledValue;

/// Where to find the oracle: a contract address behind an RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleEndpoint {
    address: String,
    rpc_url: String,
}

impl OracleEndpoint {
    pub fn new(address: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            rpc_url: rpc_url.into(),
        }
    }

    /// Contract address as configured (may be empty).
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// An endpoint with a blank address means following is switched off.
    pub fn is_configured(&self) -> bool {
        !self.address.trim().is_empty()
    }
}

/// A connected oracle offering a single read.
#[async_trait]
pub trait Oracle: Send + Sync + 'static {
    /// Fetch the current desired value. Performs no retry.
    async fn read(&self) -> OracleResult<SampledValue>;
}

/// Builds `Oracle` clients for an endpoint.
#[async_trait]
pub trait OracleConnector: Send + Sync + 'static {
    type Oracle: Oracle;

    /// Construct a client, failing with `OracleError::Connection` when the
    /// endpoint cannot be reached or resolved.
    async fn connect(&self, endpoint: &OracleEndpoint) -> OracleResult<Self::Oracle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_address_is_not_configured() {
        assert!(!OracleEndpoint::new("", "http://localhost:7545").is_configured());
        assert!(!OracleEndpoint::new("   ", "http://localhost:7545").is_configured());
        assert!(OracleEndpoint::new("0xabc", "http://localhost:7545").is_configured());
    }
}
