use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::ServiceError;

/// Job ids are unique per process so a handle from one scheduler can never
/// cancel a job on another.
static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Longest supported period, roughly 30 years.
const MAX_INTERVAL: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Handle to one registered periodic job.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
}

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Runs tasks on a fixed period until cancelled.
///
/// Each firing is spawned as its own task: a failing or panicking firing is
/// logged and the recurrence continues, and cancelling never interrupts a
/// firing that already started.
#[derive(Default)]
pub struct PeriodicSyncScheduler {
    /// Shutdown senders for live jobs. Dropping a sender also stops its job.
    jobs: Mutex<HashMap<u64, mpsc::Sender<()>>>,
}

impl PeriodicSyncScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke `task` every `interval`, first after one full interval.
    ///
    /// Must be called inside a tokio runtime. The interval is clamped to
    /// between one millisecond and roughly 30 years.
    pub fn start<F, Fut>(&self, interval: Duration, task: F) -> TimerHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let interval = interval.clamp(Duration::from_millis(1), MAX_INTERVAL);
        let id = NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let first_tick = Instant::now() + interval;

        tokio::spawn(run_job(id, first_tick, interval, Arc::new(task), shutdown_rx));
        self.jobs.lock().insert(id, shutdown_tx);

        tracing::info!(job = id, ?interval, "periodic job started");
        TimerHandle { id }
    }

    /// Stop future firings of `handle`. Unknown or already-cancelled
    /// handles are ignored.
    pub fn cancel(&self, handle: &TimerHandle) {
        let removed = self.jobs.lock().remove(&handle.id);
        match removed {
            Some(shutdown_tx) => {
                // A full buffer means a stop is already queued.
                let _ = shutdown_tx.try_send(());
                tracing::info!(job = handle.id, "periodic job cancelled");
            }
            None => tracing::debug!(job = handle.id, "cancel: job not active"),
        }
    }

    /// Number of live jobs.
    pub fn active_jobs(&self) -> usize {
        self.jobs.lock().len()
    }
}

async fn run_job<F, Fut>(
    id: u64,
    first_tick: Instant,
    interval: Duration,
    task: Arc<F>,
    mut shutdown_rx: mpsc::Receiver<()>,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    let mut ticker = tokio::time::interval_at(first_tick, interval);

    loop {
        tokio::select! {
            // A queued stop wins over a tick that became ready at the same time.
            biased;
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let task = Arc::clone(&task);
                tokio::spawn(async move {
                    if let Err(e) = task().await {
                        tracing::warn!(job = id, error = %e, "periodic task failed");
                    }
                });
            }
        }
    }

    tracing::debug!(job = id, "periodic job stopped");
}
