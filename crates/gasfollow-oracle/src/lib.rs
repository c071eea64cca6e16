//! gasfollow-oracle — client side of the EGL desired-gas-limit oracle.
//!
//! The oracle is a contract exposing a single read, `desiredEgl()`, that
//! returns an unsigned integer. This crate hides the transport behind two
//! small traits so the follower can be driven by any source:
//!
//! ```text
//! OracleConnector::connect(&OracleEndpoint) → Oracle
//! Oracle::read()                            → SampledValue
//! ```
//!
//! `JsonRpcConnector` is the production implementation. It resolves the
//! contract with `eth_getCode` when connecting and issues one `eth_call`
//! per read, each bounded by a request timeout. Neither operation retries;
//! retry cadence belongs to the caller.

pub mod client;
pub mod error;
pub mod jsonrpc;
pub mod value;

pub use client::{Oracle, OracleConnector, OracleEndpoint};
pub use error::{OracleError, OracleResult};
pub use jsonrpc::{JsonRpcConnector, JsonRpcOracle};
pub use value::SampledValue;
