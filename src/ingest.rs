//! Ingestion pipeline orchestration.
//!
//! Coordinates the full build flow: walker → extractor → corpus → chunker →
//! index builder. Every fatal check happens before the step that would
//! need it: the root must exist before any collaborator is touched, and an
//! empty corpus stops the run before a store is opened.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::chunk::{chunk_text, validate_params};
use crate::config::{validate_db_name, Config};
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::error::{IngestError, Result};
use crate::extract::Extractor;
use crate::index::{build_index, IndexOptions};
use crate::models::{Corpus, SourceKind};
use crate::progress::{format_number, ProgressReporter};
use crate::store::{SqliteStoreOpener, StoreHandle, StoreOpener};
use crate::walker::{self, WalkStats};

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub files: usize,
    pub files_with_text: usize,
    pub ocr_pages: usize,
    pub chars: usize,
    pub chunks: usize,
    pub handle: StoreHandle,
}

/// One file seen by a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Extracted characters; `None` unless the scan extracted text.
    pub chars: Option<usize>,
}

/// Result of a dry run. Nothing is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub files: Vec<ScannedFile>,
    /// Chunks the corpus would produce; `None` unless text was extracted.
    pub estimated_chunks: Option<usize>,
    pub ocr_pages: usize,
}

/// Runs the pipeline with injected collaborators.
pub struct Ingestor {
    config: Config,
    extractor: Arc<Extractor>,
    progress: Arc<dyn ProgressReporter>,
}

impl Ingestor {
    pub fn new(config: Config, extractor: Extractor, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            config,
            extractor: Arc::new(extractor),
            progress,
        }
    }

    /// Use the configured OCR tools for extraction.
    pub fn from_config(config: Config, progress: Arc<dyn ProgressReporter>) -> Self {
        let extractor = Extractor::from_config(&config.ocr);
        Self::new(config, extractor, progress)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Walk and extract `root` on a blocking thread.
    pub async fn collect(&self, root: &Path) -> Result<(Corpus, WalkStats)> {
        check_root(root)?;

        let root = root.to_path_buf();
        let extractor = self.extractor.clone();
        let progress = self.progress.clone();
        let walker_config = self.config.walker.clone();

        tokio::task::spawn_blocking(move || {
            walker::walk(&root, &extractor, &walker_config, progress.as_ref())
        })
        .await
        .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))
    }

    /// Build and persist the index `db_name` from every document under `root`.
    pub async fn run(
        &self,
        root: &Path,
        db_name: &str,
        embedder: &dyn EmbeddingProvider,
        opener: &dyn StoreOpener,
    ) -> Result<BuildSummary> {
        let db_name = db_name.trim();
        let chunking = &self.config.chunking;
        validate_params(chunking.chunk_size, chunking.overlap)?;
        validate_db_name(db_name)?;

        let (corpus, stats) = self.collect(root).await?;
        if corpus.is_empty() {
            return Err(IngestError::EmptyCorpus { files: stats.files });
        }

        let chunks = chunk_text(&corpus.text, chunking.chunk_size, chunking.overlap)?;
        info!(
            "corpus: {} chars from {} file(s), {} chunk(s)",
            corpus.char_len(),
            stats.files,
            chunks.len()
        );

        let options = IndexOptions::from_config(&self.config.embedding);
        let handle = build_index(
            &chunks,
            db_name,
            embedder,
            opener,
            &options,
            self.progress.as_ref(),
        )
        .await?;

        Ok(BuildSummary {
            files: stats.files,
            files_with_text: stats.files_with_text,
            ocr_pages: stats.ocr_pages,
            chars: corpus.char_len(),
            chunks: chunks.len(),
            handle,
        })
    }

    /// List (and optionally extract) the files a build would ingest.
    pub async fn scan(&self, root: &Path, extract: bool) -> Result<ScanReport> {
        if !extract {
            check_root(root)?;
            let files = walker::discover(root, &self.config.walker)?
                .into_iter()
                .map(|f| ScannedFile {
                    path: f.path,
                    kind: f.kind,
                    chars: None,
                })
                .collect();
            return Ok(ScanReport {
                files,
                estimated_chunks: None,
                ocr_pages: 0,
            });
        }

        let chunking = &self.config.chunking;
        validate_params(chunking.chunk_size, chunking.overlap)?;

        let (corpus, stats) = self.collect(root).await?;
        let estimated = if corpus.is_empty() {
            0
        } else {
            chunk_text(&corpus.text, chunking.chunk_size, chunking.overlap)?.len()
        };

        let files = corpus
            .sources
            .into_iter()
            .zip(stats.file_chars)
            .map(|(f, chars)| ScannedFile {
                path: f.path,
                kind: f.kind,
                chars: Some(chars),
            })
            .collect();

        Ok(ScanReport {
            files,
            estimated_chunks: Some(estimated),
            ocr_pages: stats.ocr_pages,
        })
    }
}

/// Fail with [`IngestError::NotFound`] when `root` is missing.
pub fn check_root(root: &Path) -> Result<()> {
    if root.exists() {
        Ok(())
    } else {
        Err(IngestError::NotFound(root.to_path_buf()))
    }
}

/// `lexcorpus build`: run the pipeline with configured collaborators and
/// print a summary.
pub async fn run_build(
    config: &Config,
    root: &Path,
    db_name: &str,
    progress: Arc<dyn ProgressReporter>,
) -> anyhow::Result<()> {
    let db_name = db_name.trim();
    validate_db_name(db_name)?;
    check_root(root)?;

    let embedder = create_provider(&config.embedding).map_err(IngestError::Embedding)?;
    let opener = SqliteStoreOpener::from_config(&config.store);
    let ingestor = Ingestor::from_config(config.clone(), progress);

    let summary = ingestor
        .run(root, db_name, embedder.as_ref(), &opener)
        .await?;

    println!("build {}", summary.handle.db_name);
    println!(
        "  files: {} ({} with text)",
        format_number(summary.files as u64),
        format_number(summary.files_with_text as u64)
    );
    println!("  ocr pages: {}", format_number(summary.ocr_pages as u64));
    println!("  characters: {}", format_number(summary.chars as u64));
    println!("  chunks: {}", format_number(summary.chunks as u64));
    println!(
        "  records: {} ({} dims, {})",
        format_number(summary.handle.records as u64),
        summary.handle.dims,
        summary.handle.model
    );
    if let Some(path) = &summary.handle.path {
        println!("  store: {}", path.display());
    }
    println!("ok");

    Ok(())
}

/// `lexcorpus scan`: dry run, writes nothing.
pub async fn run_scan(
    config: &Config,
    root: &Path,
    extract: bool,
    progress: Arc<dyn ProgressReporter>,
) -> anyhow::Result<()> {
    let ingestor = Ingestor::from_config(config.clone(), progress);
    let report = ingestor.scan(root, extract).await?;

    println!("scan {} (dry-run)", root.display());
    for file in &report.files {
        let rel = file.path.strip_prefix(root).unwrap_or(&file.path);
        match file.chars {
            Some(chars) => println!(
                "  {:<4} {:>10} chars  {}",
                file.kind.as_str(),
                format_number(chars as u64),
                rel.display()
            ),
            None => println!("  {:<4} {}", file.kind.as_str(), rel.display()),
        }
    }
    println!("  files found: {}", report.files.len());
    if let Some(estimated) = report.estimated_chunks {
        println!("  ocr pages: {}", format_number(report.ocr_pages as u64));
        println!("  estimated chunks: {}", format_number(estimated as u64));
    }

    Ok(())
}
