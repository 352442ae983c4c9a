//! Vector store abstraction.
//!
//! The index builder never talks to a database directly. It asks a
//! [`StoreOpener`] for a [`VectorStore`] scoped to one `db_name`, feeds it
//! `(text, vector)` batches and finally calls [`VectorStore::persist`] or,
//! on any failure, [`VectorStore::discard`].
//!
//! Two backends ship with the crate:
//! - [`SqliteStoreOpener`]: one SQLite file per index under the store root,
//!   written into a dot-prefixed staging directory and renamed into place.
//! - [`InMemoryStoreOpener`]: keeps persisted indexes in a shared map; used
//!   by tests and dry runs.
//!
//! Both honor [`ExistingIndexPolicy`](crate::config::ExistingIndexPolicy).

pub mod memory;
pub mod sqlite;

pub use memory::{InMemoryStoreOpener, InMemoryVectorStore};
pub use sqlite::{SqliteStoreOpener, SqliteVectorStore, INDEX_FILE};

use std::path::PathBuf;

use anyhow::{bail, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Embedding parameters an index is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub model: String,
    pub dims: usize,
}

/// Result of a successful persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHandle {
    pub db_name: String,
    /// Location of the index file; `None` for in-memory stores.
    pub path: Option<PathBuf>,
    /// Records in the persisted index, including appended ones.
    pub records: usize,
    pub dims: usize,
    pub model: String,
}

/// A writable index for one `db_name`.
///
/// Nothing written through `add_texts` is visible under the final name
/// until `persist` returns.
#[async_trait]
pub trait VectorStore: Send {
    /// Add one batch. `texts` and `vectors` are parallel slices. Returns
    /// the store ids of the new records, in input order.
    async fn add_texts(&mut self, texts: &[String], vectors: &[Vec<f32>]) -> Result<Vec<String>>;

    /// Make the index durable under its final name.
    async fn persist(&mut self) -> Result<StoreHandle>;

    /// Drop everything staged since `open`.
    async fn discard(&mut self) -> Result<()>;
}

/// Creates [`VectorStore`]s. Existing-index policy is applied here.
#[async_trait]
pub trait StoreOpener: Send + Sync {
    async fn open(&self, db_name: &str, info: &IndexInfo) -> Result<Box<dyn VectorStore>>;
}

pub(crate) fn check_batch(texts: &[String], vectors: &[Vec<f32>], dims: usize) -> Result<()> {
    if texts.len() != vectors.len() {
        bail!(
            "batch has {} texts but {} vectors",
            texts.len(),
            vectors.len()
        );
    }
    if let Some(v) = vectors.iter().find(|v| v.len() != dims) {
        bail!("vector has {} dimensions, index expects {}", v.len(), dims);
    }
    Ok(())
}

/// An index can only be extended with vectors from the same model space.
pub(crate) fn check_compatible(db_name: &str, existing: &IndexInfo, new: &IndexInfo) -> Result<()> {
    if existing != new {
        bail!(
            "cannot append to '{}': it was built with {} ({} dims), this run uses {} ({} dims)",
            db_name,
            existing.model,
            existing.dims,
            new.model,
            new.dims
        );
    }
    Ok(())
}

/// SHA-256 of a record's text, hex encoded; stored next to each vector.
pub(crate) fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(model: &str, dims: usize) -> IndexInfo {
        IndexInfo {
            model: model.to_string(),
            dims,
        }
    }

    #[test]
    fn batch_shape_checked() {
        let texts = vec!["a".to_string(), "b".to_string()];
        assert!(check_batch(&texts, &[vec![0.0; 3], vec![0.0; 3]], 3).is_ok());
        assert!(check_batch(&texts, &[vec![0.0; 3]], 3).is_err());
        assert!(check_batch(&texts, &[vec![0.0; 3], vec![0.0; 2]], 3).is_err());
    }

    #[test]
    fn append_requires_same_model_and_dims() {
        assert!(check_compatible("db", &info("m", 4), &info("m", 4)).is_ok());
        let err = check_compatible("db", &info("m", 4), &info("m", 8)).unwrap_err();
        assert!(err.to_string().contains("cannot append to 'db'"));
        assert!(check_compatible("db", &info("m", 4), &info("n", 4)).is_err());
    }
}
