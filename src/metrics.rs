use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing queue and ingestion activity.
#[derive(Default)]
pub struct PipelineMetrics {
    jobs_submitted: AtomicU64,
    jobs_rejected: AtomicU64,
    jobs_queued: AtomicU64,
    jobs_running: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    notes_indexed: AtomicU64,
    notes_skipped_sensitive: AtomicU64,
    chunks_stored: AtomicU64,
    chunks_failed: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a job accepted into the queue.
    pub fn record_submitted(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
        self.jobs_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submission dropped because the queue was full or closed.
    pub fn record_rejected(&self) {
        self.jobs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a worker picking a job off the queue.
    pub fn record_started(&self) {
        decrement(&self.jobs_queued);
        self.jobs_running.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a job finishing, successfully or not.
    pub fn record_finished(&self, succeeded: bool) {
        decrement(&self.jobs_running);
        if succeeded {
            self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a note whose chunks went through the embed/store loop.
    pub fn record_note_indexed(&self, chunks_stored: u64, chunks_failed: u64) {
        self.notes_indexed.fetch_add(1, Ordering::Relaxed);
        self.chunks_stored
            .fetch_add(chunks_stored, Ordering::Relaxed);
        self.chunks_failed
            .fetch_add(chunks_failed, Ordering::Relaxed);
    }

    /// Record a note withheld from embedding by the sensitive-content gate.
    pub fn record_sensitive_skip(&self) {
        self.notes_skipped_sensitive
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            jobs_rejected: self.jobs_rejected.load(Ordering::Relaxed),
            jobs_queued: self.jobs_queued.load(Ordering::Relaxed),
            jobs_running: self.jobs_running.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            notes_indexed: self.notes_indexed.load(Ordering::Relaxed),
            notes_skipped_sensitive: self.notes_skipped_sensitive.load(Ordering::Relaxed),
            chunks_stored: self.chunks_stored.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
        }
    }
}

fn decrement(counter: &AtomicU64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |value| {
        Some(value.saturating_sub(1))
    });
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Jobs accepted into the queue since startup.
    pub jobs_submitted: u64,
    /// Submissions dropped by backpressure or after shutdown.
    pub jobs_rejected: u64,
    /// Jobs waiting in the queue.
    pub jobs_queued: u64,
    /// Jobs currently held by a worker.
    pub jobs_running: u64,
    /// Jobs that finished without error.
    pub jobs_completed: u64,
    /// Jobs that returned an error or panicked.
    pub jobs_failed: u64,
    /// Notes that went through chunk embedding.
    pub notes_indexed: u64,
    /// Notes withheld from the vector index as sensitive.
    pub notes_skipped_sensitive: u64,
    /// Chunks persisted with a stored vector.
    pub chunks_stored: u64,
    /// Chunks abandoned after a persist, embed, or upsert failure.
    pub chunks_failed: u64,
}
