//! Fixed-rate loop thread and the public lifecycle/injection interface.
//!
//! [`TacticalCore`] owns at most one loop thread. The thread owns the
//! [`Orchestrator`] and its gateway outright; the only things shared with
//! other threads are:
//! - a channel carrying submitted `(attacker, target)` batches into the loop
//! - a running flag the loop checks between ticks
//! - an exit channel the loop signals once its last tick has finished
//!
//! Submitted pairs are drained at the top of each tick, so they take effect
//! within one tick period. A stop request never interrupts a tick in
//! progress.
//!
//! # Example
//!
//! ```no_run
//! use skirmish_core::config::CoreConfig;
//! use skirmish_core::entity::UnitId;
//! use skirmish_core::runtime::TacticalCore;
//!
//! let core = TacticalCore::new(CoreConfig::default())?;
//! let receipt = core.submit(&[(UnitId::new(101), UnitId::new(202))]);
//! assert!(receipt.accepted);
//! core.stop();
//! # Ok::<(), skirmish_core::error::CoreError>(())
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::CoreConfig;
use crate::entity::UnitId;
use crate::error::{CoreError, CoreResult};
use crate::orchestrator::Orchestrator;
use crate::remote::{TcpUnitClient, UnitGateway};

/// Name of the loop thread.
const LOOP_THREAD_NAME: &str = "skirmish-tick-loop";

/// Builds a fresh gateway each time the loop starts.
pub type GatewayFactory = Arc<dyn Fn() -> Box<dyn UnitGateway> + Send + Sync>;

/// One batch of proposed `(attacker, target)` pairs.
type ProposalBatch = Vec<(UnitId, UnitId)>;

/// Answer to [`TacticalCore::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// Whether the batch was queued.
    pub accepted: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl SubmitReceipt {
    fn accepted(message: String) -> Self {
        Self { accepted: true, message }
    }

    fn rejected(message: String) -> Self {
        Self { accepted: false, message }
    }
}

struct LoopHandle {
    proposals: Sender<ProposalBatch>,
    running: Arc<AtomicBool>,
    exited: Receiver<()>,
    thread: JoinHandle<()>,
}

// =============================================================================
// Tactical Core
// =============================================================================

/// Lifecycle wrapper around the tick loop.
///
/// Safe to share between threads; every method takes `&self`.
pub struct TacticalCore {
    config: CoreConfig,
    factory: GatewayFactory,
    handle: Mutex<Option<LoopHandle>>,
}

impl std::fmt::Debug for TacticalCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TacticalCore")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl TacticalCore {
    /// Creates a core that talks to the game over TCP. The loop is not
    /// started.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the configuration is invalid.
    pub fn new(config: CoreConfig) -> CoreResult<Self> {
        let remote = config.remote.clone();
        let factory: GatewayFactory =
            Arc::new(move || Box::new(TcpUnitClient::new(remote.clone())) as Box<dyn UnitGateway>);
        Self::with_gateway_factory(config, factory)
    }

    /// Creates a core with a custom gateway.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the configuration is invalid.
    pub fn with_gateway_factory(config: CoreConfig, factory: GatewayFactory) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            factory,
            handle: Mutex::new(None),
        })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Starts the loop thread. Does nothing if it is already running.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Spawn`] if the thread cannot be created.
    pub fn start(&self) -> CoreResult<()> {
        let mut slot = self.lock();
        self.ensure_running(&mut slot)
    }

    /// Stops the loop and waits up to the configured stop timeout for the
    /// current tick to finish. Does nothing if the loop is not running.
    pub fn stop(&self) {
        let Some(handle) = self.lock().take() else {
            return;
        };
        handle.running.store(false, Ordering::Release);
        handle.thread.thread().unpark();
        drop(handle.proposals);

        let timeout = self.config.runtime.stop_timeout();
        match handle.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.thread.join().is_err() {
                    tracing::warn!("tick loop thread panicked while exiting");
                }
                tracing::info!("tick loop stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(?timeout, "tick loop did not stop in time, detaching");
            }
        }
    }

    /// Returns true while the loop thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|handle| !handle.thread.is_finished())
    }

    /// Queues `(attacker, target)` pairs for the next tick, starting the loop
    /// first if needed.
    ///
    /// Pairs are not validated here; pairs naming unknown units are dropped
    /// by the next assignment pass.
    pub fn submit(&self, pairs: &[(UnitId, UnitId)]) -> SubmitReceipt {
        let mut slot = self.lock();
        if let Err(err) = self.ensure_running(&mut slot) {
            return SubmitReceipt::rejected(err.to_string());
        }
        let Some(handle) = slot.as_ref() else {
            return SubmitReceipt::rejected(CoreError::NotRunning.to_string());
        };

        match handle.proposals.send(pairs.to_vec()) {
            Ok(()) => {
                tracing::debug!(count = pairs.len(), "assignment batch received");
                SubmitReceipt::accepted(format!("Received {} assignments", pairs.len()))
            }
            Err(_) => SubmitReceipt::rejected(CoreError::NotRunning.to_string()),
        }
    }

    fn ensure_running(&self, slot: &mut Option<LoopHandle>) -> CoreResult<()> {
        if slot.as_ref().is_some_and(|handle| !handle.thread.is_finished()) {
            return Ok(());
        }
        if let Some(dead) = slot.take() {
            if dead.thread.join().is_err() {
                tracing::warn!("previous tick loop died, restarting");
            }
        }
        *slot = Some(self.spawn()?);
        Ok(())
    }

    fn spawn(&self) -> CoreResult<LoopHandle> {
        let (proposals, inbox) = mpsc::channel::<ProposalBatch>();
        let (exit_tx, exited) = mpsc::channel::<()>();
        let running = Arc::new(AtomicBool::new(true));

        let orchestrator = Orchestrator::new(&self.config);
        let gateway = (self.factory)();
        let period = self.config.runtime.tick_period();
        let flag = Arc::clone(&running);

        let thread = thread::Builder::new()
            .name(LOOP_THREAD_NAME.into())
            .spawn(move || {
                run_loop(orchestrator, gateway, &inbox, &flag, period);
                let _ = exit_tx.send(());
            })
            .map_err(CoreError::Spawn)?;

        tracing::info!(?period, "tick loop started");
        Ok(LoopHandle {
            proposals,
            running,
            exited,
            thread,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<LoopHandle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TacticalCore {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Loop
// =============================================================================

/// Runs ticks until the flag drops or every sender is gone.
fn run_loop(
    mut orchestrator: Orchestrator,
    mut gateway: Box<dyn UnitGateway>,
    inbox: &Receiver<ProposalBatch>,
    running: &AtomicBool,
    period: Duration,
) {
    let mut next_tick_time = Instant::now();

    while running.load(Ordering::Acquire) {
        // 1. Drain submitted proposals
        loop {
            match inbox.try_recv() {
                Ok(batch) => orchestrator.queue_proposals(batch),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        // 2. Run one tick; a panic costs this tick only
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| orchestrator.tick(&mut *gateway)));
        if let Err(payload) = outcome {
            tracing::error!(
                tick = orchestrator.tick_count(),
                panic = panic_message(payload.as_ref()),
                "tick panicked, continuing"
            );
        }

        // 3. Sleep until the next tick
        next_tick_time += period;
        let now = Instant::now();
        if next_tick_time <= now {
            if now - next_tick_time > period * 2 {
                // Too far behind, reset to avoid a catch-up spiral
                next_tick_time = now;
            }
            continue;
        }
        while running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= next_tick_time {
                break;
            }
            thread::park_timeout(next_tick_time - now);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
