//! Bounded ingestion queue drained by a fixed pool of long-lived workers.
//!
//! Submission never blocks: a full queue rejects the job and the caller decides what to do.
//! Workers catch errors and panics per job, so one bad note never takes a worker down.

use crate::{
    config::Config,
    metrics::PipelineMetrics,
    models::ProcessingJob,
    processing::types::{IngestionOutcome, ProcessingError},
};
use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

/// Work performed for each dequeued job.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    /// Process one job snapshot.
    async fn process(&self, job: &ProcessingJob) -> Result<IngestionOutcome, ProcessingError>;
}

/// Queue capacity and worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Maximum number of pending jobs.
    pub capacity: usize,
    /// Number of worker tasks.
    pub workers: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            workers: 3,
        }
    }
}

impl From<&Config> for WorkerSettings {
    fn from(config: &Config) -> Self {
        Self {
            capacity: config.queue_capacity,
            workers: config.worker_count,
        }
    }
}

/// Lifecycle event broadcast by the pool.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// A job was accepted into the queue.
    JobQueued {
        /// Job identifier.
        job_id: Uuid,
        /// Note being ingested.
        note_id: Uuid,
    },
    /// A worker picked the job up.
    JobStarted {
        /// Job identifier.
        job_id: Uuid,
        /// Note being ingested.
        note_id: Uuid,
        /// Index of the worker running it.
        worker: usize,
    },
    /// The job finished without error.
    JobCompleted {
        /// Job identifier.
        job_id: Uuid,
        /// Note being ingested.
        note_id: Uuid,
        /// What the pipeline did.
        outcome: IngestionOutcome,
    },
    /// The job returned an error or panicked.
    JobFailed {
        /// Job identifier.
        job_id: Uuid,
        /// Note being ingested.
        note_id: Uuid,
        /// Rendered error or panic message.
        error: String,
    },
    /// A worker task began its loop.
    WorkerStarted {
        /// Worker index.
        worker: usize,
    },
    /// A worker task exited after the queue closed and drained.
    WorkerStopped {
        /// Worker index.
        worker: usize,
    },
}

/// Fixed-size worker pool over a bounded job queue.
///
/// Construct once and share through an `Arc`; nothing here is global.
pub struct WorkerPool {
    settings: WorkerSettings,
    processor: Arc<dyn JobProcessor>,
    sender: Mutex<Option<mpsc::Sender<ProcessingJob>>>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<ProcessingJob>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
    events: broadcast::Sender<WorkerEvent>,
    metrics: Arc<PipelineMetrics>,
}

impl WorkerPool {
    /// Create a stopped pool. Jobs submitted before [`WorkerPool::start`] wait in the queue.
    pub fn new(settings: WorkerSettings, processor: Arc<dyn JobProcessor>) -> Self {
        let settings = WorkerSettings {
            capacity: settings.capacity.max(1),
            workers: settings.workers.max(1),
        };
        let (sender, receiver) = mpsc::channel(settings.capacity);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            processor,
            sender: Mutex::new(Some(sender)),
            receiver: Arc::new(AsyncMutex::new(receiver)),
            handles: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            events,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Share a metrics registry with other components.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics registry this pool reports into.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Effective settings after clamping to at least one slot and one worker.
    pub fn settings(&self) -> WorkerSettings {
        self.settings
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    /// Enqueue a job without waiting.
    ///
    /// Returns `false` when the queue is full or shutdown has begun.
    pub fn submit(&self, job: ProcessingJob) -> bool {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            tracing::warn!(job_id = %job.id, note_id = %job.note_id, "Queue closed; job rejected");
            self.metrics.record_rejected();
            return false;
        };

        let (job_id, note_id) = (job.id, job.note_id);
        match sender.try_send(job) {
            Ok(()) => {
                self.metrics.record_submitted();
                let _ = self.events.send(WorkerEvent::JobQueued { job_id, note_id });
                tracing::debug!(%job_id, %note_id, "Job queued");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.record_rejected();
                tracing::warn!(
                    %job_id,
                    %note_id,
                    capacity = self.settings.capacity,
                    "Queue full; job rejected"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.record_rejected();
                tracing::warn!(%job_id, %note_id, "Queue closed; job rejected");
                false
            }
        }
    }

    /// Spawn the worker tasks. Calling it again is a no-op.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Worker pool already started");
            return;
        }

        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        for worker in 0..self.settings.workers {
            let receiver = Arc::clone(&self.receiver);
            let processor = Arc::clone(&self.processor);
            let events = self.events.clone();
            let metrics = Arc::clone(&self.metrics);
            handles.push(tokio::spawn(run_worker(
                worker, receiver, processor, events, metrics,
            )));
        }
        tracing::info!(
            workers = self.settings.workers,
            capacity = self.settings.capacity,
            "Worker pool started"
        );
    }

    /// Stop accepting jobs, let the workers drain the queue, and wait for them to exit.
    ///
    /// In-flight jobs run to completion. A pool that was never started spawns its workers
    /// here so jobs queued before shutdown still run.
    pub async fn stop(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            tracing::debug!("Worker pool already stopping");
        }
        drop(sender);

        if !self.started.load(Ordering::SeqCst) {
            tracing::debug!("Worker pool stopped before start; draining queued jobs");
            self.start();
        }

        let handles: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );

        for handle in handles {
            if let Err(error) = handle.await {
                tracing::error!(error = %error, "Worker task terminated abnormally");
            }
        }
        tracing::info!("Worker pool stopped");
    }

    /// Number of jobs waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .map(|sender| sender.max_capacity() - sender.capacity())
            .unwrap_or(0)
    }

    /// Whether [`WorkerPool::submit`] can still accept jobs.
    pub fn is_accepting(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<AsyncMutex<mpsc::Receiver<ProcessingJob>>>,
    processor: Arc<dyn JobProcessor>,
    events: broadcast::Sender<WorkerEvent>,
    metrics: Arc<PipelineMetrics>,
) {
    let _ = events.send(WorkerEvent::WorkerStarted { worker });
    tracing::debug!(worker, "Worker started");

    loop {
        let next = { receiver.lock().await.recv().await };
        let Some(job) = next else {
            break;
        };

        let (job_id, note_id) = (job.id, job.note_id);
        metrics.record_started();
        let _ = events.send(WorkerEvent::JobStarted {
            job_id,
            note_id,
            worker,
        });

        let result = AssertUnwindSafe(processor.process(&job))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(outcome)) => {
                metrics.record_finished(true);
                tracing::info!(worker, %job_id, %note_id, ?outcome, "Job completed");
                let _ = events.send(WorkerEvent::JobCompleted {
                    job_id,
                    note_id,
                    outcome,
                });
            }
            Ok(Err(error)) => {
                metrics.record_finished(false);
                tracing::error!(worker, %job_id, %note_id, error = %error, "Job failed");
                let _ = events.send(WorkerEvent::JobFailed {
                    job_id,
                    note_id,
                    error: error.to_string(),
                });
            }
            Err(panic) => {
                metrics.record_finished(false);
                let message = panic_message(panic.as_ref());
                tracing::error!(worker, %job_id, %note_id, panic = %message, "Job panicked");
                let _ = events.send(WorkerEvent::JobFailed {
                    job_id,
                    note_id,
                    error: format!("panic: {message}"),
                });
            }
        }
    }

    let _ = events.send(WorkerEvent::WorkerStopped { worker });
    tracing::debug!(worker, "Worker stopped");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
