//! Gas bounds and the shared handle the host reads them through.

use std::fmt;
use std::sync::Arc;

use gasfollow_oracle::SampledValue;
use tokio::sync::watch;

use crate::error::{FollowError, FollowResult};

/// Admission bounds used by the block production pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasBounds {
    pub floor: u64,
    pub ceiling: u64,
}

impl GasBounds {
    pub fn new(floor: u64, ceiling: u64) -> Self {
        Self { floor, ceiling }
    }

    /// Derive bounds from a desired gas limit: `ceiling = desired`,
    /// `floor = desired / 2`.
    ///
    /// Values above `u64::MAX` are rejected rather than truncated.
    pub fn from_desired(desired: &SampledValue) -> FollowResult<Self> {
        let ceiling = desired
            .to_u64()
            .ok_or_else(|| FollowError::BoundsOverflow(desired.to_string()))?;
        Ok(Self {
            floor: ceiling / 2,
            ceiling,
        })
    }
}

impl fmt::Display for GasBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{floor: {}, ceiling: {}}}", self.floor, self.ceiling)
    }
}

/// Live gas bounds shared between the follower and the host.
///
/// Cloning yields another handle to the same value. Both fields are
/// replaced together, so readers never see a floor from one write and a
/// ceiling from another.
#[derive(Debug, Clone)]
pub struct SharedBounds {
    tx: Arc<watch::Sender<GasBounds>>,
}

impl SharedBounds {
    pub fn new(initial: GasBounds) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Current bounds.
    pub fn get(&self) -> GasBounds {
        *self.tx.borrow()
    }

    /// Replace the bounds, returning the previous value.
    pub fn set(&self, bounds: GasBounds) -> GasBounds {
        self.tx.send_replace(bounds)
    }

    /// Receiver notified on every write.
    pub fn subscribe(&self) -> watch::Receiver<GasBounds> {
        self.tx.subscribe()
    }
}
