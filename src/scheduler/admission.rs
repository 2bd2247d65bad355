// src/scheduler/admission.rs
// =============================================================================
// This module implements the admission controller: a background "dispenser"
// task that hands out permits at a fixed cadence until a cap is reached.
//
// How it works:
// 1. Every `defer_time` the dispenser wakes up
// 2. For each of up to `max_workers` permits it first waits until the previous
//    permit has been received, then reads the takes counter
// 3. If the counter reached `max_takes`, it exits (closing the permit channel)
// 4. Otherwise it sends the permit
// 5. Callers block in `take()` until a permit arrives or the channel closes
//
// Shutdown:
// - `wait()` pushes the counter up to the cap so the dispenser's own cap
//   check ends it, even when the tree was smaller than the cap
// - `stop()` ends the dispenser early
// - The permit sender is owned by the dispenser, so any exit closes the
//   channel and every pending `take()` returns false
// - A permit still buffered when `stop()` fires is refused by `take()`
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Cadence used when the configured one is zero.
const MIN_DEFER_TIME: Duration = Duration::from_millis(1);

/// Configuration for an [`AdmissionController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Time between two admission rounds
    pub defer_time: Duration,
    /// Total number of takes after which no more permits are handed out
    pub max_takes: usize,
    /// Permits released per round
    pub max_workers: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            defer_time: MIN_DEFER_TIME,
            max_takes: 1,
            max_workers: 1,
        }
    }
}

impl AdmissionConfig {
    // A zero cadence would spin the ticker, zero width would never admit anyone
    fn normalized(self) -> Self {
        Self {
            defer_time: if self.defer_time.is_zero() {
                MIN_DEFER_TIME
            } else {
                self.defer_time
            },
            max_takes: self.max_takes,
            max_workers: self.max_workers.max(1),
        }
    }
}

/// Hands out a bounded number of permits at a fixed cadence.
///
/// The controller is single-use: once the cap is reached (or `stop` is
/// called) its permit channel stays closed.
pub struct AdmissionController {
    config: AdmissionConfig,
    takes: Arc<AtomicUsize>,
    permits: Mutex<mpsc::Receiver<()>>,
    shutdown: CancellationToken,
    dispenser: Mutex<Option<JoinHandle<()>>>,
}

impl AdmissionController {
    /// Creates the controller and spawns its dispenser task.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new(config: AdmissionConfig) -> Self {
        let config = config.normalized();
        let takes = Arc::new(AtomicUsize::new(0));
        let shutdown = CancellationToken::new();

        // Capacity 1 is the closest tokio gets to an unbuffered hand-off.
        // The dispenser reserves the slot before its cap check, so the check
        // never runs while an earlier permit is still unclaimed
        let (tx, rx) = mpsc::channel(1);

        let dispenser = tokio::spawn(dispense(
            config,
            Arc::clone(&takes),
            tx,
            shutdown.clone(),
        ));

        Self {
            config,
            takes,
            permits: Mutex::new(rx),
            shutdown,
            dispenser: Mutex::new(Some(dispenser)),
        }
    }

    /// Blocks until a permit is available (`true`) or the controller has
    /// closed its permit source (`false`).
    ///
    /// Once `stop` has been called every take returns `false`, including one
    /// that finds a permit left over from before the stop.
    pub async fn take(&self) -> bool {
        let mut permits = self.permits.lock().await;
        let permit = permits.recv().await;
        permit.is_some() && !self.shutdown.is_cancelled()
    }

    /// Charges `delta` more takes against the cap.
    pub fn done(&self, delta: usize) {
        self.takes.fetch_add(delta, Ordering::AcqRel);
    }

    /// Waits for the dispenser to exit, forcing the counter up to the cap
    /// first so it does not keep ticking towards a target nobody will reach.
    pub async fn wait(&self) {
        let counter = self.takes.fetch_max(self.config.max_takes, Ordering::AcqRel);
        debug!(counter, max_takes = self.config.max_takes, "waiting for admission dispenser");

        // The dispenser may be parked on a permit slot that nobody will free
        self.shutdown.cancel();

        let handle = self.dispenser.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "admission dispenser ended abnormally");
            }
        }
    }

    /// Tells the dispenser to exit without waiting for the cap.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Takes charged so far.
    pub fn takes(&self) -> usize {
        self.takes.load(Ordering::Acquire)
    }

    pub fn max_takes(&self) -> usize {
        self.config.max_takes
    }
}

impl Drop for AdmissionController {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// The background task. Owns the only sender, so returning closes the channel.
async fn dispense(
    config: AdmissionConfig,
    takes: Arc<AtomicUsize>,
    permits: mpsc::Sender<()>,
    shutdown: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + config.defer_time, config.defer_time);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    'ticks: loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        for _ in 0..config.max_workers {
            // Resolves once the previous permit has been received
            let slot = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break 'ticks,
                slot = permits.reserve() => slot,
            };
            let Ok(slot) = slot else {
                // Controller dropped, nobody can take anymore
                return;
            };

            let counter = takes.load(Ordering::Acquire);
            trace!(counter, max_takes = config.max_takes, "admission check");

            if counter >= config.max_takes {
                debug!(counter, max_takes = config.max_takes, "max takes reached, closing permits");
                return;
            }
            slot.send(());
        }
    }

    let counter = takes.load(Ordering::Acquire);
    if counter >= config.max_takes {
        debug!(counter, max_takes = config.max_takes, "max takes reached, closing permits");
    } else {
        debug!(counter, max_takes = config.max_takes, "admission stopped before max takes");
    }
}
