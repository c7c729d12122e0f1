//! Best-effort activity recording.
//!
//! [`ActivityRecorder::record`] only enqueues; a background task drains the
//! queue into an [`ActivityLogRepository`]. A full queue or a failed write
//! is logged and counted, never returned to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rentdesk_core::models::activity::ActivityLogEntry;
use rentdesk_core::repository::ActivityLogRepository;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default queue depth between request handlers and the writer task.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Outcome counters for recorded entries.
#[derive(Debug, Default)]
pub struct RecorderStats {
    recorded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl RecorderStats {
    /// Entries written to storage.
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    /// Entries the store refused.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Entries never queued (queue full or writer gone).
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct ActivityRecorder {
    tx: mpsc::Sender<ActivityLogEntry>,
    stats: Arc<RecorderStats>,
}

impl ActivityRecorder {
    /// Start the writer task on the current runtime.
    pub fn spawn<R>(repo: R, capacity: usize) -> (Self, JoinHandle<()>)
    where
        R: ActivityLogRepository + 'static,
    {
        let (recorder, mut rx) = Self::detached(capacity);
        let stats = recorder.stats.clone();

        let handle = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                let action = entry.action.clone();
                match repo.append(entry).await {
                    Ok(()) => {
                        stats.recorded.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, action = %action, "Failed to write activity entry");
                    }
                }
            }
            debug!("Activity recorder stopped");
        });

        (recorder, handle)
    }

    /// A recorder whose queue the caller drains.
    pub fn detached(capacity: usize) -> (Self, mpsc::Receiver<ActivityLogEntry>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                stats: Arc::new(RecorderStats::default()),
            },
            rx,
        )
    }

    /// Enqueue `entry` without waiting.
    pub fn record(&self, entry: ActivityLogEntry) {
        match self.tx.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(action = %entry.action, "Activity queue full, entry dropped");
            }
            Err(TrySendError::Closed(entry)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(action = %entry.action, "Activity writer stopped, entry dropped");
            }
        }
    }

    pub fn stats(&self) -> &RecorderStats {
        &self.stats
    }
}
