//! Controller — owns the follow switch and the sampler lifecycle.
//!
//! All requests from every `FollowHandle` clone land on one `mpsc`
//! channel drained by a single controller task, so the enabled/disabled
//! decision is never evaluated twice concurrently. Each request carries a
//! `oneshot` reply that is sent only once the transition is complete:
//! when `disable()` returns, the sampler has exited and the baseline is
//! back in place.
//!
//! ```text
//! NotConfigured                     (no EGL address, permanent no-op)
//! Disabled ──enable()──► Active     (connect, spawn sampler)
//! Active ──disable()──► Disabled    (stop, join, restore baseline)
//! any ──shutdown()/drop──► Stopped
//! ```

use std::time::Duration;

use gasfollow_oracle::{OracleConnector, OracleEndpoint, OracleError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::bounds::{GasBounds, SharedBounds};
use crate::config::FollowConfig;
use crate::error::FollowResult;
use crate::sampler::run_sampler;

const COMMAND_BUFFER: usize = 16;

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    /// No EGL address configured; following can never be enabled.
    NotConfigured,
    Disabled,
    Active,
    /// The controller task has exited.
    Stopped,
}

/// Outcome of an enable or disable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Enabled,
    Disabled,
    AlreadyEnabled,
    AlreadyDisabled,
    /// The oracle could not be connected; following stays disabled.
    ConnectFailed(OracleError),
    NotConfigured,
    Stopped,
}

enum Command {
    Enable(oneshot::Sender<Transition>),
    Disable(oneshot::Sender<Transition>),
    State(oneshot::Sender<FollowState>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle used by the host to toggle following.
///
/// Dropping the last handle shuts the controller down, stopping any
/// sampler and restoring the baseline.
#[derive(Debug, Clone)]
pub struct FollowHandle {
    tx: Option<mpsc::Sender<Command>>,
}

impl FollowHandle {
    /// Capture the baseline from `config`, write it to `bounds`, and spawn
    /// the controller task.
    ///
    /// With an empty `egl_address` nothing is spawned and no connection is
    /// ever attempted: the returned handle answers every request with
    /// `Transition::NotConfigured`. Must be called within a tokio runtime.
    pub fn start<C: OracleConnector>(
        config: &FollowConfig,
        bounds: SharedBounds,
        connector: C,
    ) -> FollowResult<Self> {
        config.validate()?;
        let baseline = config.baseline();
        bounds.set(baseline);

        let endpoint = config.endpoint();
        if !endpoint.is_configured() {
            info!(
                floor = baseline.floor,
                ceiling = baseline.ceiling,
                "EGL following not configured, gas bounds stay fixed"
            );
            return Ok(Self { tx: None });
        }

        let poll_interval = config.poll_interval_duration()?;
        info!(
            address = %endpoint.address(),
            rpc_url = %endpoint.rpc_url(),
            ?poll_interval,
            floor = baseline.floor,
            ceiling = baseline.ceiling,
            "EGL follower initialized"
        );

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let controller = Controller {
            connector,
            endpoint,
            poll_interval,
            baseline,
            bounds,
            phase: Phase::Disabled,
            samplers_started: 0,
        };
        tokio::spawn(controller.run(rx, config.follow_on_start));

        Ok(Self { tx: Some(tx) })
    }

    pub fn is_configured(&self) -> bool {
        self.tx.is_some()
    }

    /// Start following. A no-op with a warning if already enabled.
    pub async fn enable(&self) -> Transition {
        if !self.is_configured() {
            warn!("EGL following not configured, ignoring enable");
            return Transition::NotConfigured;
        }
        self.request(Command::Enable)
            .await
            .unwrap_or(Transition::Stopped)
    }

    /// Stop following and restore the baseline. A no-op with a warning if
    /// already disabled.
    pub async fn disable(&self) -> Transition {
        if !self.is_configured() {
            warn!("EGL following not configured, ignoring disable");
            return Transition::NotConfigured;
        }
        self.request(Command::Disable)
            .await
            .unwrap_or(Transition::Stopped)
    }

    pub async fn state(&self) -> FollowState {
        if !self.is_configured() {
            return FollowState::NotConfigured;
        }
        self.request(Command::State)
            .await
            .unwrap_or(FollowState::Stopped)
    }

    /// Stop the controller for good. Returns once any sampler has exited
    /// and the baseline is restored.
    pub async fn shutdown(&self) {
        if self.is_configured() && self.request(Command::Shutdown).await.is_none() {
            debug!("EGL follower already stopped");
        }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let tx = self.tx.as_ref()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(make(reply_tx)).await.ok()?;
        reply_rx.await.ok()
    }
}

struct RunningSampler {
    id: u64,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

enum Phase {
    Disabled,
    Active(RunningSampler),
}

struct Controller<C: OracleConnector> {
    connector: C,
    endpoint: OracleEndpoint,
    poll_interval: Duration,
    baseline: GasBounds,
    bounds: SharedBounds,
    phase: Phase,
    samplers_started: u64,
}

impl<C: OracleConnector> Controller<C> {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>, enable_on_start: bool) {
        if enable_on_start {
            self.enable().await;
        }

        let mut shutdown_reply = None;
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Enable(reply) => {
                    let _ = reply.send(self.enable().await);
                }
                Command::Disable(reply) => {
                    let _ = reply.send(self.disable().await);
                }
                Command::State(reply) => {
                    let _ = reply.send(self.state());
                }
                Command::Shutdown(reply) => {
                    shutdown_reply = Some(reply);
                    break;
                }
            }
        }

        if matches!(self.phase, Phase::Active(_)) {
            self.disable().await;
        }
        info!("EGL follower stopped");

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    fn state(&self) -> FollowState {
        match self.phase {
            Phase::Disabled => FollowState::Disabled,
            Phase::Active(_) => FollowState::Active,
        }
    }

    async fn enable(&mut self) -> Transition {
        if let Phase::Active(running) = &self.phase {
            warn!(sampler = running.id, "EGL following already enabled");
            return Transition::AlreadyEnabled;
        }

        let oracle = match self.connector.connect(&self.endpoint).await {
            Ok(oracle) => oracle,
            Err(e) => {
                error!(
                    address = %self.endpoint.address(),
                    rpc_url = %self.endpoint.rpc_url(),
                    error = %e,
                    "EGL oracle connection failed, following stays disabled"
                );
                return Transition::ConnectFailed(e);
            }
        };

        self.samplers_started += 1;
        let id = self.samplers_started;
        // A fresh stop channel per sampler; an old, already-fired one would
        // end the new sampler immediately.
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(
            run_sampler(oracle, self.bounds.clone(), self.poll_interval, stop_rx)
                .instrument(info_span!("egl_sampler", sampler = id)),
        );
        self.phase = Phase::Active(RunningSampler {
            id,
            stop_tx,
            handle,
        });

        info!(sampler = id, "EGL following enabled");
        Transition::Enabled
    }

    async fn disable(&mut self) -> Transition {
        let running = match std::mem::replace(&mut self.phase, Phase::Disabled) {
            Phase::Active(running) => running,
            Phase::Disabled => {
                warn!("EGL following already disabled");
                return Transition::AlreadyDisabled;
            }
        };

        // The sampler may already have exited; a failed send is fine.
        let _ = running.stop_tx.send(true);
        match running.handle.await {
            Ok(()) => info!(sampler = running.id, "sampler stop confirmed"),
            Err(e) => error!(sampler = running.id, error = %e, "sampler task failed"),
        }

        // Only after the join: nothing can overwrite the baseline now.
        let replaced = self.bounds.set(self.baseline);
        info!(
            floor = self.baseline.floor,
            ceiling = self.baseline.ceiling,
            replaced_floor = replaced.floor,
            replaced_ceiling = replaced.ceiling,
            "EGL following disabled, baseline gas bounds restored"
        );
        Transition::Disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use gasfollow_oracle::{Oracle, OracleResult, SampledValue};

    /// Counts connects and live oracle instances (one per sampler).
    #[derive(Clone, Default)]
    struct Counters {
        connects: Arc<AtomicUsize>,
        live: Arc<AtomicUsize>,
        failures_left: Arc<AtomicUsize>,
    }

    struct TestConnector {
        value: u64,
        counters: Counters,
    }

    struct TestOracle {
        value: u64,
        live: Arc<AtomicUsize>,
    }

    impl Drop for TestOracle {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Oracle for TestOracle {
        async fn read(&self) -> OracleResult<SampledValue> {
            Ok(SampledValue::from(self.value))
        }
    }

    #[async_trait]
    impl OracleConnector for TestConnector {
        type Oracle = TestOracle;

        async fn connect(&self, _endpoint: &OracleEndpoint) -> OracleResult<TestOracle> {
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .counters
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(OracleError::Connection("node unreachable".into()));
            }
            self.counters.live.fetch_add(1, Ordering::SeqCst);
            Ok(TestOracle {
                value: self.value,
                live: self.counters.live.clone(),
            })
        }
    }

    fn config(address: &str) -> FollowConfig {
        FollowConfig {
            egl_address: address.to_string(),
            poll_interval: "10ms".to_string(),
            gas_floor: 1000,
            gas_ceil: 2000,
            follow_on_start: false,
            ..FollowConfig::default()
        }
    }

    fn start(address: &str, value: u64) -> (FollowHandle, SharedBounds, Counters) {
        let counters = Counters::default();
        let bounds = SharedBounds::new(GasBounds::new(0, 0));
        let connector = TestConnector {
            value,
            counters: counters.clone(),
        };
        let handle = FollowHandle::start(&config(address), bounds.clone(), connector).unwrap();
        (handle, bounds, counters)
    }

    #[tokio::test]
    async fn start_writes_baseline() {
        let (handle, bounds, _) = start("0xABC", 4000);
        assert_eq!(bounds.get(), GasBounds::new(1000, 2000));
        assert_eq!(handle.state().await, FollowState::Disabled);
    }

    #[tokio::test]
    async fn empty_address_is_permanent_noop() {
        let (handle, bounds, counters) = start("  ", 4000);
        assert!(!handle.is_configured());
        assert_eq!(handle.enable().await, Transition::NotConfigured);
        assert_eq!(handle.disable().await, Transition::NotConfigured);
        assert_eq!(handle.state().await, FollowState::NotConfigured);
        assert_eq!(counters.connects.load(Ordering::SeqCst), 0);
        assert_eq!(bounds.get(), GasBounds::new(1000, 2000));
    }

    #[tokio::test]
    async fn invalid_interval_fails_start() {
        let bounds = SharedBounds::new(GasBounds::new(0, 0));
        let mut cfg = config("0xABC");
        cfg.poll_interval = "never".to_string();
        let connector = TestConnector {
            value: 1,
            counters: Counters::default(),
        };
        assert!(FollowHandle::start(&cfg, bounds, connector).is_err());
    }

    #[tokio::test]
    async fn double_enable_runs_one_sampler() {
        let (handle, bounds, counters) = start("0xABC", 4000);
        let mut rx = bounds.subscribe();

        assert_eq!(handle.enable().await, Transition::Enabled);
        assert_eq!(handle.enable().await, Transition::AlreadyEnabled);
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
        assert_eq!(counters.live.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state().await, FollowState::Active);

        rx.wait_for(|b| *b == GasBounds::new(2000, 4000)).await.unwrap();
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn double_disable_is_noop() {
        let (handle, bounds, counters) = start("0xABC", 4000);
        assert_eq!(handle.enable().await, Transition::Enabled);
        assert_eq!(handle.disable().await, Transition::Disabled);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
        assert_eq!(handle.disable().await, Transition::AlreadyDisabled);
        assert_eq!(bounds.get(), GasBounds::new(1000, 2000));
        assert_eq!(handle.state().await, FollowState::Disabled);
    }

    #[tokio::test]
    async fn disable_restores_baseline_after_writes() {
        let (handle, bounds, _) = start("0xABC", 6000);
        let mut rx = bounds.subscribe();
        handle.enable().await;
        rx.wait_for(|b| *b == GasBounds::new(3000, 6000)).await.unwrap();

        assert_eq!(handle.disable().await, Transition::Disabled);
        assert_eq!(bounds.get(), GasBounds::new(1000, 2000));
    }

    #[tokio::test]
    async fn connect_failure_leaves_disabled() {
        let (handle, bounds, counters) = start("0xABC", 4000);
        counters.failures_left.store(1, Ordering::SeqCst);

        assert!(matches!(
            handle.enable().await,
            Transition::ConnectFailed(OracleError::Connection(_))
        ));
        assert_eq!(handle.state().await, FollowState::Disabled);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
        assert_eq!(bounds.get(), GasBounds::new(1000, 2000));

        // The next attempt connects normally.
        assert_eq!(handle.enable().await, Transition::Enabled);
        assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn follow_on_start_enables_immediately() {
        let counters = Counters::default();
        let bounds = SharedBounds::new(GasBounds::new(0, 0));
        let mut cfg = config("0xABC");
        cfg.follow_on_start = true;
        let connector = TestConnector {
            value: 4000,
            counters: counters.clone(),
        };
        let handle = FollowHandle::start(&cfg, bounds.clone(), connector).unwrap();

        assert_eq!(handle.state().await, FollowState::Active);
        assert_eq!(handle.enable().await, Transition::AlreadyEnabled);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_restores_and_stops() {
        let (handle, bounds, counters) = start("0xABC", 4000);
        let mut rx = bounds.subscribe();
        handle.enable().await;
        rx.wait_for(|b| *b == GasBounds::new(2000, 4000)).await.unwrap();

        handle.shutdown().await;
        assert_eq!(bounds.get(), GasBounds::new(1000, 2000));
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
        assert_eq!(handle.state().await, FollowState::Stopped);
        assert_eq!(handle.enable().await, Transition::Stopped);

        // A second shutdown finds the controller gone and returns.
        handle.shutdown().await;
        assert_eq!(bounds.get(), GasBounds::new(1000, 2000));
    }

    #[tokio::test]
    async fn dropping_handles_stops_sampler() {
        let (handle, bounds, counters) = start("0xABC", 4000);
        let mut rx = bounds.subscribe();
        handle.enable().await;
        rx.wait_for(|b| *b == GasBounds::new(2000, 4000)).await.unwrap();

        drop(handle);
        rx.wait_for(|b| *b == GasBounds::new(1000, 2000)).await.unwrap();
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }
}
