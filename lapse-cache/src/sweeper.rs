//! Background sweeping.
//!
//! A [`Sweeper`] runs [`TtlCache::prune`] on a fixed interval inside a Tokio
//! task. The cache itself stays synchronous; this is only a scheduler.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

use lapse_core::error::{LapseError, Result};
use lapse_core::Clock;

use crate::cache::TtlCache;
use crate::config::CacheConfig;

/// Totals accumulated by a sweep task over its lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Number of `prune` calls made
    pub sweeps: u64,
    /// Entries removed across all sweeps
    pub evicted: u64,
}

/// Periodic pruning schedule.
#[derive(Clone, Copy, Debug)]
pub struct Sweeper {
    interval: Duration,
}

impl Sweeper {
    /// Creates a schedule that sweeps every `interval`.
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(LapseError::ConfigError(
                "sweep interval must be greater than zero".into(),
            ));
        }
        Ok(Self { interval })
    }

    /// Creates a schedule from `sweep_interval_seconds`.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.sweep_interval())
    }

    /// Returns the sweep interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the sweep task on the current Tokio runtime.
    ///
    /// The first sweep happens one interval after spawning. The task runs
    /// until [`SweeperHandle::stop`] is called or the handle is dropped.
    #[instrument(skip(cache), fields(interval = ?self.interval))]
    pub fn spawn<K, V, C>(self, cache: Arc<TtlCache<K, V, C>>) -> Result<SweeperHandle>
    where
        K: Eq + Hash + Send + Sync + 'static,
        V: Send + Sync + 'static,
        C: Clock + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| LapseError::NoRuntime)?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = runtime.spawn(sweep_loop(cache, self.interval, shutdown_rx));

        info!("Sweeper started");
        Ok(SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        })
    }
}

/// Handle to a running sweep task.
///
/// Dropping the handle closes the shutdown channel, which also ends the task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<SweepReport>,
}

impl SweeperHandle {
    /// Stops the task and waits for it, returning its totals.
    pub async fn stop(mut self) -> Result<SweepReport> {
        if let Some(shutdown) = self.shutdown.take() {
            // Err only means the task already exited
            let _ = shutdown.send(());
        }
        self.task
            .await
            .map_err(|e| LapseError::SweeperFailed(e.to_string()))
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn sweep_loop<K, V, C>(
    cache: Arc<TtlCache<K, V, C>>,
    period: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> SweepReport
where
    K: Eq + Hash,
    C: Clock,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut report = SweepReport::default();

    // The first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                let removed = cache.prune();
                report.sweeps += 1;
                report.evicted += removed as u64;
                if removed > 0 {
                    debug!(removed, sweeps = report.sweeps, "Sweep evicted entries");
                }
            }
        }
    }

    info!(sweeps = report.sweeps, evicted = report.evicted, "Sweeper stopped");
    report
}
