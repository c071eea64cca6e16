//! Effective configuration: file values overlaid with CLI flags.

use std::path::Path;

use clap::Args;
use gasfollow_core::FollowConfig;

/// Command-line overrides for individual `gasfollow.toml` keys.
#[derive(Debug, Default, Args)]
pub struct ConfigOverrides {
    /// EGL contract address. An empty value disables following.
    #[arg(long)]
    pub egl_address: Option<String>,

    /// JSON-RPC endpoint (http only).
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Poll interval, e.g. "10s" or "500ms".
    #[arg(long)]
    pub poll_interval: Option<String>,

    /// Per-request oracle deadline.
    #[arg(long)]
    pub request_timeout: Option<String>,

    /// Baseline gas floor.
    #[arg(long)]
    pub gas_floor: Option<u64>,

    /// Baseline gas ceiling.
    #[arg(long)]
    pub gas_ceil: Option<u64>,

    /// Start with following disabled; wait for SIGUSR1.
    #[arg(long)]
    pub start_disabled: bool,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut FollowConfig) {
        if let Some(v) = self.egl_address {
            config.egl_address = v;
        }
        if let Some(v) = self.rpc_url {
            config.rpc_url = v;
        }
        if let Some(v) = self.poll_interval {
            config.poll_interval = v;
        }
        if let Some(v) = self.request_timeout {
            config.request_timeout = v;
        }
        if let Some(v) = self.gas_floor {
            config.gas_floor = v;
        }
        if let Some(v) = self.gas_ceil {
            config.gas_ceil = v;
        }
        if self.start_disabled {
            config.follow_on_start = false;
        }
    }
}

/// Read the config file (if any), apply overrides, and validate.
pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> anyhow::Result<FollowConfig> {
    let mut config = match path {
        Some(path) => FollowConfig::from_file(path)?,
        None => FollowConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}
