//! gasfollow.toml configuration.
//!
//! Every key is optional. An empty `egl_address` leaves following switched
//! off for the lifetime of the process.

use std::path::Path;
use std::time::Duration;

use gasfollow_oracle::OracleEndpoint;
use serde::{Deserialize, Serialize};

use crate::bounds::GasBounds;
use crate::error::{FollowError, FollowResult};

pub const DEFAULT_RPC_URL: &str = "http://localhost:7545";
pub const DEFAULT_POLL_INTERVAL: &str = "10s";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "5s";
pub const DEFAULT_GAS_FLOOR: u64 = 8_000_000;
pub const DEFAULT_GAS_CEIL: u64 = 8_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    /// EGL contract address. Empty disables the follower.
    pub egl_address: String,
    /// JSON-RPC endpoint of the node hosting the contract.
    pub rpc_url: String,
    pub poll_interval: String,
    /// Deadline for each oracle request.
    pub request_timeout: String,
    /// Baseline floor, restored whenever following is disabled.
    pub gas_floor: u64,
    /// Baseline ceiling, restored whenever following is disabled.
    pub gas_ceil: u64,
    /// Enable following as soon as the controller starts.
    pub follow_on_start: bool,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            egl_address: String::new(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT.to_string(),
            gas_floor: DEFAULT_GAS_FLOOR,
            gas_ceil: DEFAULT_GAS_CEIL,
            follow_on_start: true,
        }
    }
}

impl FollowConfig {
    pub fn from_file(path: &Path) -> FollowResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> FollowResult<Self> {
        let config: FollowConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> FollowResult<String> {
        toml::to_string_pretty(self).map_err(|e| FollowError::Config(e.to_string()))
    }

    /// Check that both durations parse and are non-zero, and that the
    /// baseline floor does not exceed its ceiling.
    pub fn validate(&self) -> FollowResult<()> {
        self.poll_interval_duration()?;
        self.request_timeout_duration()?;
        if self.gas_floor > self.gas_ceil {
            return Err(FollowError::Config(format!(
                "gas_floor ({}) exceeds gas_ceil ({})",
                self.gas_floor, self.gas_ceil
            )));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> OracleEndpoint {
        OracleEndpoint::new(self.egl_address.trim(), self.rpc_url.trim())
    }

    /// The bounds in force before following is ever enabled.
    pub fn baseline(&self) -> GasBounds {
        GasBounds::new(self.gas_floor, self.gas_ceil)
    }

    pub fn poll_interval_duration(&self) -> FollowResult<Duration> {
        positive_duration("poll_interval", &self.poll_interval)
    }

    pub fn request_timeout_duration(&self) -> FollowResult<Duration> {
        positive_duration("request_timeout", &self.request_timeout)
    }
}

fn positive_duration(key: &str, value: &str) -> FollowResult<Duration> {
    match parse_duration(value) {
        Some(d) if !d.is_zero() => Ok(d),
        Some(_) => Err(FollowError::Config(format!("{key} must be non-zero"))),
        None => Err(FollowError::Config(format!(
            "{key}: cannot parse duration {value:?}"
        ))),
    }
}

/// Parse a duration string like "10s", "500ms", "2m", or bare seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60).map(Duration::from_secs))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config = FollowConfig::from_toml_str("").unwrap();
        assert_eq!(config, FollowConfig::default());
        assert!(!config.endpoint().is_configured());
        assert_eq!(config.poll_interval_duration().unwrap(), Duration::from_secs(10));
        assert_eq!(config.request_timeout_duration().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn parse_full_config() {
        let config = FollowConfig::from_toml_str(
            r#"
egl_address = "0xABC"
rpc_url = "http://node:8545"
poll_interval = "15s"
request_timeout = "750ms"
gas_floor = 1000
gas_ceil = 2000
follow_on_start = false
"#,
        )
        .unwrap();
        assert_eq!(config.endpoint().address(), "0xABC");
        assert_eq!(config.endpoint().rpc_url(), "http://node:8545");
        assert_eq!(config.poll_interval_duration().unwrap(), Duration::from_secs(15));
        assert_eq!(config.request_timeout_duration().unwrap(), Duration::from_millis(750));
        assert_eq!(config.baseline(), GasBounds::new(1000, 2000));
        assert!(!config.follow_on_start);
    }

    #[test]
    fn zero_interval_rejected() {
        let err = FollowConfig::from_toml_str(r#"poll_interval = "0s""#).unwrap_err();
        assert!(matches!(err, FollowError::Config(msg) if msg.contains("poll_interval")));
    }

    #[test]
    fn garbage_duration_rejected() {
        let err = FollowConfig::from_toml_str(r#"request_timeout = "soon""#).unwrap_err();
        assert!(matches!(err, FollowError::Config(msg) if msg.contains("request_timeout")));
    }

    #[test]
    fn oversized_minutes_rejected() {
        assert_eq!(parse_duration("999999999999999999m"), None);
        let err =
            FollowConfig::from_toml_str(r#"poll_interval = "999999999999999999m""#).unwrap_err();
        assert!(matches!(err, FollowError::Config(msg) if msg.contains("poll_interval")));
    }

    #[test]
    fn inverted_baseline_rejected() {
        let err = FollowConfig::from_toml_str("gas_floor = 5000\ngas_ceil = 100").unwrap_err();
        assert!(matches!(err, FollowError::Config(msg) if msg.contains("gas_floor")));

        let equal = FollowConfig::from_toml_str("gas_floor = 100\ngas_ceil = 100").unwrap();
        assert_eq!(equal.baseline(), GasBounds::new(100, 100));
    }

    #[test]
    fn unknown_types_are_toml_errors() {
        let err = FollowConfig::from_toml_str("gas_floor = \"lots\"").unwrap_err();
        assert!(matches!(err, FollowError::Toml(_)));
    }

    #[test]
    fn from_file_roundtrip() {
        let config = FollowConfig {
            egl_address: "0xabc".to_string(),
            gas_floor: 10,
            gas_ceil: 20,
            ..FollowConfig::default()
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes()).unwrap();
        assert_eq!(FollowConfig::from_file(file.path()).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FollowConfig::from_file(Path::new("/nonexistent/gasfollow.toml")).unwrap_err();
        assert!(matches!(err, FollowError::Io(_)));
    }

    #[test]
    fn parse_duration_forms() {
        assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("12"), Some(Duration::from_secs(12)));
        assert_eq!(parse_duration("fast"), None);
    }
}
