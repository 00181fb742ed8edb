//! Ingestion side of the crate: chunking, the sensitive gate, the pipeline, the worker pool,
//! and note summarization.

pub mod chunking;
pub mod pipeline;
pub mod sensitive;
pub mod summarize;
pub mod types;
pub mod worker;

pub use pipeline::IngestionPipeline;
pub use summarize::{
    NoteSummarizer, SummarizeError, SummaryOutcome, SummarySettings, SummaryStrategy,
};
pub use types::{ChunkingError, IngestionOutcome, PipelineSettings, ProcessingError};
pub use worker::{JobProcessor, WorkerEvent, WorkerPool, WorkerSettings};
