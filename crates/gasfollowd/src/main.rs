//! gasfollowd — the gasfollow daemon.
//!
//! Loads `gasfollow.toml`, starts the EGL follower against a JSON-RPC
//! node, and keeps the live gas bounds available to the rest of the
//! process. Following is toggled at runtime with signals:
//!
//! - `SIGUSR1` enables following
//! - `SIGUSR2` disables following and restores the baseline bounds
//! - Ctrl-C / `SIGTERM` shuts down
//!
//! # Usage
//!
//! ```text
//! gasfollowd run --config /etc/gasfollow.toml --egl-address 0x...
//! gasfollowd config --config /etc/gasfollow.toml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod run;
mod settings;

use settings::ConfigOverrides;

#[derive(Parser)]
#[command(
    name = "gasfollowd",
    about = "Follow the EGL desired gas limit",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the follower until interrupted.
    Run {
        /// Path to gasfollow.toml (defaults apply when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Print the effective configuration as TOML.
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,gasfollowd=debug,gasfollow_core=debug,gasfollow_oracle=debug",
                )
            }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, overrides } => {
            let config = settings::load(config.as_deref(), overrides)?;
            run::run_follower(config).await
        }
        Command::Config { config, overrides } => {
            let config = settings::load(config.as_deref(), overrides)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
