//! Ethereum JSON-RPC oracle client.
//!
//! Connects over plain HTTP with the hyper legacy client and reads
//! `desiredEgl()` through `eth_call`. Every request carries its own
//! deadline so a stalled node degrades into a read error instead of
//! hanging the sampler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, USER_AGENT};
use http::{Method, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::{Oracle, OracleConnector, OracleEndpoint};
use crate::error::{OracleError, OracleResult};
use crate::value::SampledValue;

/// 4-byte selector of `desiredEgl()`.
const DESIRED_EGL_SELECTOR: &str = "0x90c023f1";

type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// Connects `JsonRpcOracle`s, verifying the contract exists first.
#[derive(Debug, Clone)]
pub struct JsonRpcConnector {
    request_timeout: Duration,
}

impl JsonRpcConnector {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl OracleConnector for JsonRpcConnector {
    type Oracle = JsonRpcOracle;

    async fn connect(&self, endpoint: &OracleEndpoint) -> OracleResult<JsonRpcOracle> {
        let uri = parse_rpc_url(endpoint.rpc_url())?;
        let address = parse_address(endpoint.address())?;

        let oracle = JsonRpcOracle {
            client: Client::builder(TokioExecutor::new()).build_http(),
            uri,
            address,
            request_timeout: self.request_timeout,
            next_id: AtomicU64::new(1),
        };

        let code = oracle
            .call("eth_getCode", json!([oracle.address, "latest"]))
            .await
            .map_err(|e| {
                OracleError::Connection(format!(
                    "cannot resolve EGL contract at {}: {e}",
                    oracle.address
                ))
            })?;
        let code = code
            .as_str()
            .ok_or_else(|| OracleError::Connection("eth_getCode returned a non-string".into()))
            .and_then(|s| decode_hex_data(s).map_err(|e| OracleError::Connection(e.to_string())))?;
        if code.is_empty() {
            return Err(OracleError::Connection(format!(
                "no contract deployed at {}",
                oracle.address
            )));
        }

        info!(address = %oracle.address, rpc_url = %endpoint.rpc_url(), "EGL oracle connected");
        Ok(oracle)
    }
}

/// A connected EGL contract.
pub struct JsonRpcOracle {
    client: HttpClient,
    uri: Uri,
    /// Normalized `0x`-prefixed lowercase address.
    address: String,
    request_timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcOracle {
    pub fn address(&self) -> &str {
        &self.address
    }

    async fn call(&self, method: &str, params: Value) -> OracleResult<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| OracleError::Read(format!("encode {method}: {e}")))?;

        let req = http::Request::builder()
            .method(Method::POST)
            .uri(self.uri.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, "gasfollow/0.1")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| OracleError::Read(format!("build {method} request: {e}")))?;

        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| OracleError::Read(format!("{method} request failed: {e}")))?;
            let status = resp.status();
            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| OracleError::Read(format!("{method} body: {e}")))?
                .to_bytes();
            if !status.is_success() {
                debug!(%status, method, "rpc non-2xx");
                return Err(OracleError::Read(format!("{method} returned HTTP {status}")));
            }
            Ok::<Bytes, OracleError>(body)
        };

        let body = tokio::time::timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| {
                OracleError::Read(format!(
                    "{method} timed out after {:?}",
                    self.request_timeout
                ))
            })??;

        parse_rpc_response(&body)
    }
}

#[async_trait]
impl Oracle for JsonRpcOracle {
    async fn read(&self) -> OracleResult<SampledValue> {
        let result = self
            .call(
                "eth_call",
                json!([{ "to": self.address, "data": DESIRED_EGL_SELECTOR }, "latest"]),
            )
            .await?;
        let data = result
            .as_str()
            .ok_or_else(|| OracleError::Read("eth_call returned a non-string".into()))?;
        decode_uint256(data)
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

fn parse_rpc_response(body: &[u8]) -> OracleResult<Value> {
    let resp: RpcResponse = serde_json::from_slice(body)
        .map_err(|e| OracleError::Read(format!("malformed rpc response: {e}")))?;
    if let Some(err) = resp.error {
        return Err(OracleError::Read(format!(
            "rpc error {}: {}",
            err.code, err.message
        )));
    }
    resp.result
        .ok_or_else(|| OracleError::Read("rpc response has no result".into()))
}

fn decode_hex_data(s: &str) -> OracleResult<Vec<u8>> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(digits).map_err(|e| OracleError::Read(format!("invalid hex {s:?}: {e}")))
}

/// Decode the first ABI word of a call result.
fn decode_uint256(s: &str) -> OracleResult<SampledValue> {
    let bytes = decode_hex_data(s)?;
    if bytes.len() < 32 {
        return Err(OracleError::Read(format!(
            "call result is {} bytes, expected a 32-byte word",
            bytes.len()
        )));
    }
    Ok(SampledValue::from_be_bytes(&bytes[..32]))
}

fn parse_address(s: &str) -> OracleResult<String> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.len() != 40 || hex::decode(digits).is_err() {
        return Err(OracleError::Connection(format!(
            "invalid contract address {s:?}"
        )));
    }
    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

fn parse_rpc_url(s: &str) -> OracleResult<Uri> {
    let uri: Uri = s
        .parse()
        .map_err(|e| OracleError::Connection(format!("invalid rpc url {s:?}: {e}")))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => {
            return Err(OracleError::Connection(format!(
                "unsupported rpc url scheme {other:?}, only http is supported"
            )));
        }
        None => {
            return Err(OracleError::Connection(format!(
                "rpc url {s:?} has no scheme"
            )));
        }
    }
    if uri.authority().is_none() {
        return Err(OracleError::Connection(format!("rpc url {s:?} has no host")));
    }
    Ok(uri)
}
