//! Embed chunks and write them into a vector store.
//!
//! [`build_index`] is the only place the embedding provider and the store
//! meet. Batches are embedded and written strictly in chunk order; the
//! store is persisted only after every batch has been written, and is
//! discarded on any failure.

use tracing::{debug, info, warn};

use crate::config::{validate_db_name, EmbeddingConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{IngestError, Result};
use crate::models::Chunk;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::store::{IndexInfo, StoreHandle, StoreOpener, VectorStore};

/// Tuning for [`build_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexOptions {
    /// Chunks per embedding request.
    pub batch_size: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { batch_size: 64 }
    }
}

impl IndexOptions {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            batch_size: config.batch_size,
        }
    }
}

/// Embed every chunk and persist the resulting index as `db_name`.
pub async fn build_index(
    chunks: &[Chunk],
    db_name: &str,
    embedder: &dyn EmbeddingProvider,
    opener: &dyn StoreOpener,
    options: &IndexOptions,
    progress: &dyn ProgressReporter,
) -> Result<StoreHandle> {
    validate_db_name(db_name)?;
    if options.batch_size == 0 {
        return Err(IngestError::Config(
            "embedding.batch_size must be greater than 0".to_string(),
        ));
    }

    let info = IndexInfo {
        model: embedder.model_name().to_string(),
        dims: embedder.dims(),
    };
    let mut store = opener
        .open(db_name, &info)
        .await
        .map_err(IngestError::Store)?;

    if let Err(e) = write_batches(chunks, embedder, store.as_mut(), options, progress).await {
        discard(store.as_mut(), db_name).await;
        return Err(e);
    }

    progress.report(ProgressEvent::Persisting {
        db_name: db_name.to_string(),
    });
    match store.persist().await {
        Ok(handle) => {
            info!(
                "index '{}' built: {} records, {} dims, model {}",
                handle.db_name, handle.records, handle.dims, handle.model
            );
            Ok(handle)
        }
        Err(e) => {
            discard(store.as_mut(), db_name).await;
            Err(IngestError::Store(e))
        }
    }
}

async fn write_batches(
    chunks: &[Chunk],
    embedder: &dyn EmbeddingProvider,
    store: &mut dyn VectorStore,
    options: &IndexOptions,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let total = chunks.len() as u64;
    let mut done = 0u64;

    for batch in chunks.chunks(options.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        debug!("embedding batch of {} chunk(s)", texts.len());

        let vectors = embedder
            .embed(&texts)
            .await
            .map_err(IngestError::Embedding)?;
        check_vectors(&texts, &vectors, embedder.dims())?;

        store
            .add_texts(&texts, &vectors)
            .await
            .map_err(IngestError::Store)?;

        done += batch.len() as u64;
        progress.report(ProgressEvent::Embedding { n: done, total });
    }

    Ok(())
}

fn check_vectors(texts: &[String], vectors: &[Vec<f32>], dims: usize) -> Result<()> {
    if vectors.len() != texts.len() {
        return Err(IngestError::Embedding(anyhow::anyhow!(
            "provider returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        )));
    }
    if let Some(v) = vectors.iter().find(|v| v.len() != dims) {
        return Err(IngestError::Embedding(anyhow::anyhow!(
            "provider returned a {}-dimensional vector, expected {}",
            v.len(),
            dims
        )));
    }
    Ok(())
}

async fn discard(store: &mut dyn VectorStore, db_name: &str) {
    if let Err(e) = store.discard().await {
        warn!("failed to discard staged index '{}': {:#}", db_name, e);
    }
}
