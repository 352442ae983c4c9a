//! In-memory [`StoreOpener`] for tests and dry runs.
//!
//! Persisted indexes live in a map shared by every clone of the opener, so a
//! test can build twice against the same opener and inspect the result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::config::ExistingIndexPolicy;
use crate::models::IndexedRecord;

use super::{check_batch, check_compatible, IndexInfo, StoreHandle, StoreOpener, VectorStore};

#[derive(Debug, Clone)]
struct StoredIndex {
    info: IndexInfo,
    records: Vec<IndexedRecord>,
}

type IndexMap = Arc<RwLock<HashMap<String, StoredIndex>>>;

/// Opener whose persisted indexes live in process memory.
#[derive(Clone, Default)]
pub struct InMemoryStoreOpener {
    policy: ExistingIndexPolicy,
    indexes: IndexMap,
    opens: Arc<AtomicUsize>,
}

impl InMemoryStoreOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: ExistingIndexPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Records of a persisted index, in insertion order.
    pub fn records(&self, db_name: &str) -> Option<Vec<IndexedRecord>> {
        self.indexes
            .read()
            .ok()?
            .get(db_name)
            .map(|index| index.records.clone())
    }

    pub fn contains(&self, db_name: &str) -> bool {
        self.indexes
            .read()
            .map(|map| map.contains_key(db_name))
            .unwrap_or(false)
    }

    /// How many times `open` has been called.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreOpener for InMemoryStoreOpener {
    async fn open(&self, db_name: &str, info: &IndexInfo) -> Result<Box<dyn VectorStore>> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let existing = {
            let map = self
                .indexes
                .read()
                .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
            map.get(db_name).cloned()
        };

        let staged = match (existing, self.policy) {
            (None, _) => Vec::new(),
            (Some(_), ExistingIndexPolicy::Fail) => {
                bail!("index '{}' already exists", db_name)
            }
            (Some(index), ExistingIndexPolicy::Append) => {
                check_compatible(db_name, &index.info, info)?;
                index.records
            }
            (Some(_), ExistingIndexPolicy::Replace) => Vec::new(),
        };

        Ok(Box::new(InMemoryVectorStore {
            db_name: db_name.to_string(),
            info: info.clone(),
            staged,
            indexes: self.indexes.clone(),
        }))
    }
}

/// A staged in-memory index.
pub struct InMemoryVectorStore {
    db_name: String,
    info: IndexInfo,
    staged: Vec<IndexedRecord>,
    indexes: IndexMap,
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_texts(&mut self, texts: &[String], vectors: &[Vec<f32>]) -> Result<Vec<String>> {
        check_batch(texts, vectors, self.info.dims)?;

        let mut ids = Vec::with_capacity(texts.len());
        for (text, vector) in texts.iter().zip(vectors) {
            let store_id = uuid::Uuid::new_v4().to_string();
            self.staged.push(IndexedRecord {
                store_id: store_id.clone(),
                chunk_text: text.clone(),
                embedding: vector.clone(),
            });
            ids.push(store_id);
        }
        Ok(ids)
    }

    async fn persist(&mut self) -> Result<StoreHandle> {
        let records = std::mem::take(&mut self.staged);
        let count = records.len();

        self.indexes
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?
            .insert(
                self.db_name.clone(),
                StoredIndex {
                    info: self.info.clone(),
                    records,
                },
            );

        Ok(StoreHandle {
            db_name: self.db_name.clone(),
            path: None,
            records: count,
            dims: self.info.dims,
            model: self.info.model.clone(),
        })
    }

    async fn discard(&mut self) -> Result<()> {
        self.staged.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> IndexInfo {
        IndexInfo {
            model: "fake".to_string(),
            dims: 2,
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn nothing_visible_before_persist() {
        let opener = InMemoryStoreOpener::new();
        let mut store = opener.open("briefs", &info()).await.unwrap();
        store
            .add_texts(&texts(&["a"]), &[vec![1.0, 0.0]])
            .await
            .unwrap();
        assert!(!opener.contains("briefs"));

        let handle = store.persist().await.unwrap();
        assert_eq!(handle.records, 1);
        assert_eq!(handle.path, None);
        assert_eq!(opener.records("briefs").unwrap()[0].chunk_text, "a");
    }

    #[tokio::test]
    async fn discard_leaves_no_index() {
        let opener = InMemoryStoreOpener::new();
        let mut store = opener.open("briefs", &info()).await.unwrap();
        store
            .add_texts(&texts(&["a"]), &[vec![1.0, 0.0]])
            .await
            .unwrap();
        store.discard().await.unwrap();
        assert!(!opener.contains("briefs"));
    }

    #[tokio::test]
    async fn policies_apply_to_existing_index() {
        let append = InMemoryStoreOpener::with_policy(ExistingIndexPolicy::Append);
        for text in ["one", "two"] {
            let mut store = append.open("db", &info()).await.unwrap();
            store
                .add_texts(&texts(&[text]), &[vec![0.5, 0.5]])
                .await
                .unwrap();
            store.persist().await.unwrap();
        }
        assert_eq!(append.records("db").unwrap().len(), 2);

        let fail = InMemoryStoreOpener::with_policy(ExistingIndexPolicy::Fail);
        fail.open("db", &info())
            .await
            .unwrap()
            .persist()
            .await
            .unwrap();
        assert!(fail.open("db", &info()).await.is_err());
        assert_eq!(fail.open_count(), 2);
    }

    #[tokio::test]
    async fn wrong_dimension_rejected() {
        let opener = InMemoryStoreOpener::new();
        let mut store = opener.open("db", &info()).await.unwrap();
        assert!(store
            .add_texts(&texts(&["a"]), &[vec![1.0, 2.0, 3.0]])
            .await
            .is_err());
    }
}
