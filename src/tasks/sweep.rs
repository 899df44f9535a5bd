//! Expiry Sweep Task
//!
//! Background lane that deletes persisted records older than an expiry
//! window. Reads and writes enqueue sweeps without waiting for them; a single
//! worker thread runs them one at a time, in order.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::cache::CacheStats;
use crate::error::{CacheError, Result};
use crate::persist::PersistenceStore;

/// Work items processed by the sweep worker.
#[derive(Debug)]
enum SweepTask {
    /// Delete every record older than the window
    Sweep(Duration),
    /// Signals once everything queued before it has run
    Barrier(oneshot::Sender<()>),
}

// == Sweep Report ==
/// Result of one sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records examined
    pub scanned: usize,
    /// Records deleted by this sweep
    pub deleted: usize,
    /// Expired records some other path removed first
    pub already_gone: usize,
    /// Expired records that could not be deleted
    pub failures: usize,
}

/// Deletes every record whose age exceeds `window`.
///
/// Per-record failures are logged and counted, never fatal. Only a failure to
/// enumerate the directory aborts the sweep.
pub fn run_sweep(store: &dyn PersistenceStore, window: Duration) -> Result<SweepReport> {
    let now = SystemTime::now();
    let records = store.list_entries()?;
    let mut report = SweepReport {
        scanned: records.len(),
        ..Default::default()
    };

    for record in records.iter().filter(|r| r.age_at(now) > window) {
        match store.remove_record(&record.path) {
            Ok(true) => {
                report.deleted += 1;
                trace!(path = %record.path.display(), "Expired record evicted");
            }
            Ok(false) => report.already_gone += 1,
            Err(e) => {
                report.failures += 1;
                warn!(
                    path = %record.path.display(),
                    error = %e,
                    "Couldn't evict cache file when time expiration is reached"
                );
            }
        }
    }

    Ok(report)
}

// == Expiry Sweep Scheduler ==
/// Single-worker queue of expiry sweeps.
///
/// Scheduling never blocks and never fails the caller. The queue is
/// unbounded and duplicate sweeps are not coalesced.
#[derive(Debug)]
pub struct ExpirySweepScheduler {
    sender: Mutex<Option<mpsc::UnboundedSender<SweepTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<Mutex<CacheStats>>,
}

impl ExpirySweepScheduler {
    /// Starts the worker thread.
    ///
    /// # Arguments
    /// * `store` - Store whose records are swept
    /// * `stats` - Shared counters updated after each sweep
    pub fn spawn(store: Arc<dyn PersistenceStore>, stats: Arc<Mutex<CacheStats>>) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker_stats = Arc::clone(&stats);

        let worker = thread::Builder::new()
            .name("expiry-sweep".to_string())
            .spawn(move || sweep_worker(receiver, store, worker_stats))
            .map_err(|e| {
                CacheError::SweepScheduling(format!("failed to start sweep worker: {}", e))
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            stats,
        })
    }

    fn send(&self, task: SweepTask) -> Result<()> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender
                .send(task)
                .map_err(|_| CacheError::SweepScheduling("sweep worker has stopped".to_string())),
            None => Err(CacheError::SweepScheduling(
                "sweep lane is shut down".to_string(),
            )),
        }
    }

    // == Schedule ==
    /// Enqueues a sweep for `window` and returns immediately.
    ///
    /// A lane that no longer accepts work is logged and counted as a sweep
    /// failure.
    pub fn schedule_sweep(&self, window: Duration) {
        if let Err(e) = self.send(SweepTask::Sweep(window)) {
            error!(error = %e, window_ms = window.as_millis() as u64, "Failed to schedule expiry sweep");
            self.stats
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record_sweep_failure();
        }
    }

    /// Blocks until every sweep enqueued before this call has finished.
    ///
    /// Returns at once if the lane is shut down. Must not be called from
    /// within an async runtime.
    pub fn wait_idle(&self) {
        let (done, finished) = oneshot::channel();
        if self.send(SweepTask::Barrier(done)).is_ok() {
            let _ = finished.blocking_recv();
        }
    }

    // == Shutdown ==
    /// Closes the lane and waits for queued sweeps to finish.
    ///
    /// Idempotent. Later calls to [`schedule_sweep`](Self::schedule_sweep)
    /// are reported as scheduling failures.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!("Expiry sweep worker panicked");
            }
        }
    }
}

impl Drop for ExpirySweepScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sweep_worker(
    mut receiver: mpsc::UnboundedReceiver<SweepTask>,
    store: Arc<dyn PersistenceStore>,
    stats: Arc<Mutex<CacheStats>>,
) {
    info!(root = %store.root_directory().display(), "Expiry sweep worker started");

    while let Some(task) = receiver.blocking_recv() {
        let window = match task {
            SweepTask::Sweep(window) => window,
            SweepTask::Barrier(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let started = Instant::now();
        match run_sweep(store.as_ref(), window) {
            Ok(report) => {
                if report.deleted > 0 {
                    info!(
                        deleted = report.deleted,
                        scanned = report.scanned,
                        failures = report.failures,
                        window_ms = window.as_millis() as u64,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Expiry sweep: removed expired records"
                    );
                } else {
                    debug!(scanned = report.scanned, "Expiry sweep: no expired records found");
                }
                stats
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_sweep(report.deleted as u64, report.failures as u64);
            }
            Err(e) => {
                error!(error = %e, "Expiry sweep interrupted by internal error");
                stats
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_sweep_failure();
            }
        }
    }

    info!("Expiry sweep worker stopped");
}
