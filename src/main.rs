use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use semnotes::{
    config::{self, Config},
    embedding::{EmbeddingClient, build_embedding_client},
    generation::{GenerationClient, build_generation_client},
    logging,
    metrics::PipelineMetrics,
    models::{JobKind, META_PLATFORM, META_SOURCE_URL, NoteMetadata, ProcessingJob},
    notes::{NewNote, NoteService},
    processing::{
        IngestionPipeline, NoteSummarizer, PipelineSettings, SummarySettings, WorkerPool,
        WorkerSettings,
    },
    qdrant::QdrantService,
    search::{QaService, QaSettings, SearchService, SearchSettings},
    store::{DocumentStore, MemoryDocumentStore},
    vector::{MemoryVectorStore, VectorStore},
};
use serde_json::json;
use uuid::Uuid;
use walkdir::WalkDir;

const RESUBMIT_DELAY: Duration = Duration::from_millis(25);

#[derive(Parser)]
#[command(
    name = "semnotes",
    about = "Index a folder of text notes and retrieve them by meaning"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest every .txt/.md file under DIR and print ingestion counters.
    Index { dir: PathBuf },
    /// Ingest DIR, then rank notes against QUERY.
    Search {
        dir: PathBuf,
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Ingest DIR, then answer QUESTION from the most relevant notes.
    Ask { dir: PathBuf, question: String },
    /// Ingest DIR, then summarize every note.
    Summarize { dir: PathBuf },
}

struct App {
    store: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingClient>,
    generator: Option<Arc<dyn GenerationClient>>,
    metrics: Arc<PipelineMetrics>,
    config: &'static Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let config = config::init_config().context("failed to load configuration")?;
    let cli = Cli::parse();
    let app = App::build(config).await?;

    match cli.command {
        Command::Index { dir } => {
            let ids = app.ingest_dir(&dir).await?;
            print_json(&json!({
                "notes": ids.len(),
                "metrics": app.metrics.snapshot(),
            }))
        }
        Command::Search { dir, query, limit } => {
            app.ingest_dir(&dir).await?;
            let search = SearchService::new(
                app.store.clone(),
                app.vectors.clone(),
                app.embedder.clone(),
                SearchSettings::from(config),
            );
            let results = search.search(&query, limit).await?;
            print_json(&results)
        }
        Command::Ask { dir, question } => {
            app.ingest_dir(&dir).await?;
            let qa = QaService::new(
                app.store.clone(),
                app.vectors.clone(),
                app.embedder.clone(),
                app.generator.clone(),
                QaSettings::from(config),
            );
            let answer = qa.answer(&question).await?;
            print_json(&answer)
        }
        Command::Summarize { dir } => {
            let ids = app.ingest_dir(&dir).await?;
            let summarizer = NoteSummarizer::new(
                app.store.clone(),
                app.generator.clone(),
                SummarySettings::from(config),
            );
            let mut summaries = Vec::with_capacity(ids.len());
            for id in ids {
                let outcome = summarizer.summarize(id).await?;
                summaries.push(json!({ "note_id": id, "summary": outcome }));
            }
            print_json(&summaries)
        }
    }
}

impl App {
    async fn build(config: &'static Config) -> Result<Self> {
        let embedder = build_embedding_client(config)?;
        let generator = build_generation_client(config)?;
        let vectors: Arc<dyn VectorStore> = match config.qdrant_url.as_deref() {
            Some(url) => {
                let qdrant = QdrantService::new(
                    url,
                    &config.qdrant_collection_name,
                    config.qdrant_api_key.clone(),
                    config.provider_timeout(),
                )?;
                qdrant
                    .ensure_collection(embedder.dimension() as u64)
                    .await
                    .context("failed to prepare Qdrant collection")?;
                Arc::new(qdrant)
            }
            None => {
                tracing::info!("QDRANT_URL not set; using in-memory vector index");
                Arc::new(MemoryVectorStore::new())
            }
        };

        Ok(Self {
            store: Arc::new(MemoryDocumentStore::new()),
            vectors,
            embedder,
            generator,
            metrics: Arc::new(PipelineMetrics::new()),
            config,
        })
    }

    /// Load, save, and ingest every note under `dir`, returning once the queue has drained.
    async fn ingest_dir(&self, dir: &Path) -> Result<Vec<Uuid>> {
        let pipeline = IngestionPipeline::new(
            self.store.clone(),
            self.vectors.clone(),
            self.embedder.clone(),
            PipelineSettings::from(self.config),
        )
        .with_metrics(self.metrics.clone());
        let pool = Arc::new(
            WorkerPool::new(WorkerSettings::from(self.config), Arc::new(pipeline))
                .with_metrics(self.metrics.clone()),
        );
        pool.start();

        let notes = NoteService::new(self.store.clone(), self.vectors.clone(), pool.clone());
        let mut ids = Vec::new();
        for new_note in load_notes(dir)? {
            let created = notes.create_note(new_note).await?;
            if !created.queued {
                while !pool.submit(ProcessingJob::from_note(&created.note, JobKind::Create)) {
                    tokio::time::sleep(RESUBMIT_DELAY).await;
                }
            }
            ids.push(created.note.id);
        }

        pool.stop().await;
        tracing::info!(notes = ids.len(), dir = %dir.display(), "Directory ingested");
        Ok(ids)
    }
}

fn load_notes(dir: &Path) -> Result<Vec<NewNote>> {
    let mut notes = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        let path = entry.path();
        let is_note = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext, "txt" | "md"));
        if !entry.file_type().is_file() || !is_note {
            continue;
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let (title, content) = split_title(&raw, path);
        notes.push(NewNote {
            title,
            content,
            metadata: NoteMetadata::new()
                .with(META_PLATFORM, "file")
                .with(META_SOURCE_URL, format!("file://{}", path.display())),
            ..NewNote::default()
        });
    }
    Ok(notes)
}

/// First non-blank line (minus markdown heading marks) becomes the title; the file stem is used
/// for files without one.
fn split_title(raw: &str, path: &Path) -> (String, String) {
    let mut lines = raw.lines();
    for line in lines.by_ref() {
        let heading = line.trim().trim_start_matches('#').trim();
        if !heading.is_empty() {
            let rest: Vec<&str> = lines.collect();
            return (heading.to_string(), rest.join("\n").trim().to_string());
        }
    }
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    (stem, String::new())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
