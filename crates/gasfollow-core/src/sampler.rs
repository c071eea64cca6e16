//! Sampler — the background task that follows the oracle while enabled.
//!
//! Each cycle reads the oracle, derives new bounds, and writes them to
//! the shared handle. Both the read and the sleep between cycles race the
//! stop signal, so a stop takes effect without waiting out a slow node or
//! a full poll interval.

use std::time::Duration;

use gasfollow_oracle::{Oracle, OracleResult, SampledValue};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::bounds::{GasBounds, SharedBounds};

/// Poll `oracle` every `interval` until `stop` fires or its sender drops.
///
/// No write happens after the stop is observed.
pub async fn run_sampler<O: Oracle>(
    oracle: O,
    bounds: SharedBounds,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    debug!(?interval, "sampler starting");

    loop {
        if *stop.borrow() {
            break;
        }

        let read = tokio::select! {
            biased;
            _ = stop.changed() => break,
            read = oracle.read() => read,
        };
        apply_reading(&bounds, read);

        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    debug!("sampler stopped");
}

/// Apply one oracle reading. Returns the bounds written, if any.
fn apply_reading(bounds: &SharedBounds, read: OracleResult<SampledValue>) -> Option<GasBounds> {
    let desired = match read {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "EGL read failed, keeping current gas bounds");
            return None;
        }
    };

    let next = match GasBounds::from_desired(&desired) {
        Ok(b) => b,
        Err(e) => {
            error!(desiredegl = %desired, error = %e, "cannot apply desired gas limit");
            return None;
        }
    };

    if desired.is_zero() {
        warn!("oracle reported a desired gas limit of zero, applying as-is");
    }

    let prev = bounds.set(next);
    info!(
        desiredegl = %desired,
        old_floor = prev.floor,
        old_ceiling = prev.ceiling,
        floor = next.floor,
        ceiling = next.ceiling,
        "EGL gas bounds adjustment"
    );
    Some(next)
}
