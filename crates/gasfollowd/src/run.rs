//! Follower mode — the daemon's main loop.
//!
//! 1. Seeds the live gas bounds with the configured baseline
//! 2. Starts the controller with a JSON-RPC connector
//! 3. Watches the bounds the way a block producer would consume them
//! 4. Maps signals onto enable / disable / shutdown

use gasfollow_core::{FollowConfig, FollowHandle, GasBounds, SharedBounds, Transition};
use gasfollow_oracle::JsonRpcConnector;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub async fn run_follower(config: FollowConfig) -> anyhow::Result<()> {
    info!("gasfollow daemon starting");

    // ── Live bounds + controller ───────────────────────────────
    let bounds = SharedBounds::new(config.baseline());
    let connector = JsonRpcConnector::new(config.request_timeout_duration()?);
    let follower = FollowHandle::start(&config, bounds.clone(), connector)?;

    // ── Bounds consumer ────────────────────────────────────────
    let consumer = tokio::spawn(watch_bounds(bounds.subscribe()));

    // ── Signals ────────────────────────────────────────────────
    let mut enable_signal = signal(SignalKind::user_defined1())?;
    let mut disable_signal = signal(SignalKind::user_defined2())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = enable_signal.recv() => {
                report("enable", follower.enable().await);
            }
            _ = disable_signal.recv() => {
                report("disable", follower.disable().await);
            }
            _ = terminate.recv() => {
                info!("SIGTERM received");
                break;
            }
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("shutdown signal received");
                break;
            }
        }
    }

    follower.shutdown().await;
    let final_bounds = bounds.get();
    consumer.abort();

    info!(
        floor = final_bounds.floor,
        ceiling = final_bounds.ceiling,
        "gasfollow daemon stopped"
    );
    Ok(())
}

fn report(request: &str, transition: Transition) {
    match transition {
        Transition::Enabled | Transition::Disabled => {
            debug!(request, ?transition, "toggle applied");
        }
        Transition::ConnectFailed(e) => {
            warn!(request, error = %e, "toggle failed");
        }
        other => {
            debug!(request, transition = ?other, "toggle had no effect");
        }
    }
}

/// Stand-in for the block producer: observes each bounds change.
async fn watch_bounds(mut rx: watch::Receiver<GasBounds>) {
    while rx.changed().await.is_ok() {
        let current = *rx.borrow_and_update();
        debug!(
            floor = current.floor,
            ceiling = current.ceiling,
            "producer gas bounds updated"
        );
    }
}
