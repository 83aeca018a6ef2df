//! # Delivery Worker
//!
//! Background scheduler that advances random eligible deliveries.
//!
//! ## Cycle
//!
//! 1. Sample a wait from an exponential distribution whose rate is the
//!    current `events_per_minute` (read fresh every cycle).
//! 2. Sleep, racing the sleep against the stop signal.
//! 3. Pick a random member of the [`EligibilityTracker`] worklist together
//!    with the state it had when picked.
//! 4. Compute the successor with [`next_state`].
//! 5. Ask the delivery actor to commit it only if the delivery is still in
//!    the picked state. A stale read is skipped, not retried.
//!
//! A zero or non-finite rate pauses the worker: it sleeps `idle_recheck`
//! (never less than [`MIN_IDLE_RECHECK`]) and reads the rate again.
//!
//! Selection is uniform over the current worklist on every cycle; nothing
//! guarantees that a given delivery is ever picked.

use super::port::WorkerPort;
use super::sampler::{RandomSampler, Sampler};
use super::settings::WorkerSettings;
use super::tracker::EligibilityTracker;
use super::transition::{exponential_wait, next_state};
use crate::delivery_actor::{CommitOutcome, DeliveryError, ObserverId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Floor for the paused-worker sleep, so a zero setting cannot spin.
pub const MIN_IDLE_RECHECK: Duration = Duration::from_millis(1);

/// Counters describing what the worker has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Transitions applied.
    pub committed: u64,
    /// Commits refused because the delivery changed or disappeared after it was picked.
    pub stale: u64,
    /// Cycles that found the worker paused or the worklist empty.
    pub idle_cycles: u64,
    /// Cycles abandoned because of an unexpected state or a failed request.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    committed: AtomicU64,
    stale: AtomicU64,
    idle_cycles: AtomicU64,
    skipped: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            committed: self.committed.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            idle_cycles: self.idle_cycles.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<Box<dyn Sampler>>,
    observer: ObserverId,
}

/// Owns the background task and its Stopped/Running state.
///
/// `start` and `stop` are idempotent. `stop` returns only after the
/// background task has exited, so no read or commit can happen afterwards.
pub struct DeliveryWorker {
    port: Arc<dyn WorkerPort>,
    settings: Arc<WorkerSettings>,
    tracker: Arc<EligibilityTracker>,
    stats: Arc<StatsCounters>,
    sampler: Option<Box<dyn Sampler>>,
    idle_recheck: Duration,
    running: Option<Running>,
}

impl DeliveryWorker {
    pub fn new(
        port: Arc<dyn WorkerPort>,
        settings: Arc<WorkerSettings>,
        idle_recheck: Duration,
    ) -> Self {
        Self::with_sampler(
            port,
            settings,
            idle_recheck,
            Box::new(RandomSampler::from_entropy()),
        )
    }

    /// Same as [`DeliveryWorker::new`] with an explicit source of randomness.
    pub fn with_sampler(
        port: Arc<dyn WorkerPort>,
        settings: Arc<WorkerSettings>,
        idle_recheck: Duration,
        sampler: Box<dyn Sampler>,
    ) -> Self {
        Self {
            port,
            settings,
            tracker: Arc::new(EligibilityTracker::new()),
            stats: Arc::new(StatsCounters::default()),
            sampler: Some(sampler),
            idle_recheck: idle_recheck.max(MIN_IDLE_RECHECK),
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn settings(&self) -> &Arc<WorkerSettings> {
        &self.settings
    }

    pub fn tracker(&self) -> &Arc<EligibilityTracker> {
        &self.tracker
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.snapshot()
    }

    pub fn set_events_per_minute(&self, rate: f64) {
        self.settings.set_events_per_minute(rate);
    }

    pub fn set_fail_probability(&self, probability: f64) {
        self.settings.set_fail_probability(probability);
    }

    /// Attaches the tracker to the collection (seeding the worklist) and
    /// spawns the background task. No-op while running.
    pub async fn start(&mut self) -> Result<(), DeliveryError> {
        if self.running.is_some() {
            return Ok(());
        }
        self.tracker.clear();
        let observer = self.port.attach(self.tracker.clone()).await?;

        let cancel = CancellationToken::new();
        let cycle = Cycle {
            port: self.port.clone(),
            settings: self.settings.clone(),
            tracker: self.tracker.clone(),
            stats: self.stats.clone(),
            sampler: self
                .sampler
                .take()
                .unwrap_or_else(|| Box::new(RandomSampler::from_entropy())),
            idle_recheck: self.idle_recheck,
        };
        let handle = tokio::spawn(cycle.run(cancel.clone()));
        self.running = Some(Running {
            cancel,
            handle,
            observer,
        });
        info!(eligible = self.tracker.len(), "Delivery worker started");
        Ok(())
    }

    /// Cancels the background task, waits for it to exit, detaches the
    /// tracker and clears the worklist. No-op while stopped.
    pub async fn stop(&mut self) -> Result<(), DeliveryError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        running.cancel.cancel();
        match running.handle.await {
            Ok(sampler) => self.sampler = Some(sampler),
            Err(e) => error!(error = %e, "Delivery worker task failed"),
        }
        let detached = self.port.detach(running.observer).await;
        self.tracker.clear();
        info!(stats = ?self.stats.snapshot(), "Delivery worker stopped");
        detached
    }
}

/// State moved into the background task.
struct Cycle {
    port: Arc<dyn WorkerPort>,
    settings: Arc<WorkerSettings>,
    tracker: Arc<EligibilityTracker>,
    stats: Arc<StatsCounters>,
    sampler: Box<dyn Sampler>,
    idle_recheck: Duration,
}

impl Cycle {
    /// Loops until `cancel` fires; gives the sampler back for the next run.
    async fn run(mut self, cancel: CancellationToken) -> Box<dyn Sampler> {
        loop {
            let rate = self.settings.events_per_minute();
            let wait = exponential_wait(rate, self.sampler.unit());
            let pause = wait.unwrap_or(self.idle_recheck);
            debug!(rate, ?pause, "Worker sleeping");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }

            if wait.is_none() {
                StatsCounters::bump(&self.stats.idle_cycles);
                continue;
            }
            self.tick().await;
        }
        debug!("Worker loop exited");
        self.sampler
    }

    async fn tick(&mut self) {
        let Some((code, expected)) = self.tracker.pick(self.sampler.as_mut()) else {
            debug!("Worklist empty");
            StatsCounters::bump(&self.stats.idle_cycles);
            return;
        };
        let roll = self.sampler.unit();
        let Some(next) = next_state(expected, self.settings.fail_probability(), roll) else {
            warn!(%code, state = %expected, "Ineligible delivery in worklist");
            StatsCounters::bump(&self.stats.skipped);
            return;
        };

        match self.port.commit_if_unchanged(code, expected, next).await {
            Ok(CommitOutcome::Committed(change)) => {
                info!(%code, from = %change.old, to = %change.new, "Delivery advanced");
                StatsCounters::bump(&self.stats.committed);
            }
            Ok(CommitOutcome::Stale { expected, actual }) => {
                debug!(%code, %expected, %actual, "Precondition stale");
                StatsCounters::bump(&self.stats.stale);
            }
            Ok(CommitOutcome::Missing) => {
                debug!(%code, "Delivery gone before commit");
                StatsCounters::bump(&self.stats.stale);
            }
            Ok(CommitOutcome::Rejected(e)) => {
                warn!(%code, error = %e, "Commit rejected");
                StatsCounters::bump(&self.stats.skipped);
            }
            Err(e) => {
                warn!(%code, error = %e, "Commit request failed");
                StatsCounters::bump(&self.stats.skipped);
            }
        }
    }
}
