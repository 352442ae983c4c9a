//! SQLite-backed [`StoreOpener`].
//!
//! Layout under the store root:
//!
//! ```text
//! vector_databases/
//!   contracts/index.sqlite                 <- persisted index
//!   .contracts.partial-<uuid>/index.sqlite <- staging, only while building
//! ```
//!
//! A build always writes into a fresh staging directory. `persist` closes
//! the pool and renames the staging directory over the final one, so an
//! interrupted run never leaves a half-written index under the real name.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::config::{ExistingIndexPolicy, StoreConfig};
use crate::db;
use crate::embedding::vec_to_blob;
use crate::migrate;

use super::{
    check_batch, check_compatible, text_hash, IndexInfo, StoreHandle, StoreOpener, VectorStore,
};

/// File name of the index database inside its directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// Opens SQLite indexes under a store root.
#[derive(Debug, Clone)]
pub struct SqliteStoreOpener {
    root: PathBuf,
    policy: ExistingIndexPolicy,
}

impl SqliteStoreOpener {
    pub fn new(root: impl Into<PathBuf>, policy: ExistingIndexPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.root.clone(), config.on_existing)
    }

    /// Directory a persisted index named `db_name` lives in.
    pub fn index_dir(&self, db_name: &str) -> PathBuf {
        self.root.join(db_name)
    }

    async fn prepare(
        &self,
        db_name: &str,
        info: &IndexInfo,
        staging: &Path,
        final_dir: &Path,
    ) -> Result<(SqlitePool, i64)> {
        let staged_file = staging.join(INDEX_FILE);

        if final_dir.exists() && self.policy == ExistingIndexPolicy::Append {
            let existing = final_dir.join(INDEX_FILE);
            std::fs::copy(&existing, &staged_file)
                .with_context(|| format!("failed to copy {}", existing.display()))?;
            debug!("appending to copy of {}", existing.display());
        }

        let pool = db::connect(&staged_file).await?;
        migrate::run_migrations(&pool).await?;

        if let Some(existing) = read_index_info(&pool).await? {
            check_compatible(db_name, &existing, info)?;
        }

        let now = chrono::Utc::now().to_rfc3339();
        for (key, value) in [
            ("db_name", db_name.to_string()),
            ("model", info.model.clone()),
            ("dims", info.dims.to_string()),
            ("created_at", now),
        ] {
            sqlx::query("INSERT OR IGNORE INTO index_meta (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&pool)
                .await?;
        }

        let next_seq: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq) + 1, 0) FROM records")
            .fetch_one(&pool)
            .await?;

        Ok((pool, next_seq))
    }
}

#[async_trait]
impl StoreOpener for SqliteStoreOpener {
    async fn open(&self, db_name: &str, info: &IndexInfo) -> Result<Box<dyn VectorStore>> {
        let final_dir = self.index_dir(db_name);
        if final_dir.exists() && self.policy == ExistingIndexPolicy::Fail {
            bail!(
                "index '{}' already exists at {}",
                db_name,
                final_dir.display()
            );
        }

        let staging = self
            .root
            .join(format!(".{}.partial-{}", db_name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&staging)
            .with_context(|| format!("failed to create {}", staging.display()))?;

        match self.prepare(db_name, info, &staging, &final_dir).await {
            Ok((pool, next_seq)) => Ok(Box::new(SqliteVectorStore {
                db_name: db_name.to_string(),
                info: info.clone(),
                root: self.root.clone(),
                staging,
                final_dir,
                pool: Some(pool),
                next_seq,
            })),
            Err(e) => {
                let _ = std::fs::remove_dir_all(&staging);
                Err(e)
            }
        }
    }
}

/// A staged SQLite index.
pub struct SqliteVectorStore {
    db_name: String,
    info: IndexInfo,
    root: PathBuf,
    staging: PathBuf,
    final_dir: PathBuf,
    pool: Option<SqlitePool>,
    next_seq: i64,
}

impl SqliteVectorStore {
    fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .as_ref()
            .ok_or_else(|| anyhow!("store '{}' is already closed", self.db_name))
    }

    /// Swap the staging directory in under the final name.
    fn promote(&self) -> Result<()> {
        if !self.final_dir.exists() {
            std::fs::rename(&self.staging, &self.final_dir).with_context(|| {
                format!(
                    "failed to move {} to {}",
                    self.staging.display(),
                    self.final_dir.display()
                )
            })?;
            return Ok(());
        }

        let old = self
            .root
            .join(format!(".{}.old-{}", self.db_name, uuid::Uuid::new_v4()));
        std::fs::rename(&self.final_dir, &old)
            .with_context(|| format!("failed to move aside {}", self.final_dir.display()))?;

        if let Err(e) = std::fs::rename(&self.staging, &self.final_dir) {
            // Put the previous index back before reporting.
            let _ = std::fs::rename(&old, &self.final_dir);
            return Err(anyhow::Error::new(e)
                .context(format!("failed to move {}", self.staging.display())));
        }

        if let Err(e) = std::fs::remove_dir_all(&old) {
            warn!("could not remove previous index {}: {}", old.display(), e);
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add_texts(&mut self, texts: &[String], vectors: &[Vec<f32>]) -> Result<Vec<String>> {
        check_batch(texts, vectors, self.info.dims)?;

        let mut seq = self.next_seq;
        let mut ids = Vec::with_capacity(texts.len());
        let mut tx = self.pool()?.begin().await?;

        for (text, vector) in texts.iter().zip(vectors) {
            let id = uuid::Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO records (id, seq, text, hash, dims, embedding) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(seq)
            .bind(text)
            .bind(text_hash(text))
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
            seq += 1;
            ids.push(id);
        }

        tx.commit().await?;
        self.next_seq = seq;
        Ok(ids)
    }

    async fn persist(&mut self) -> Result<StoreHandle> {
        let pool = self.pool()?;

        sqlx::query("INSERT OR REPLACE INTO index_meta (key, value) VALUES ('persisted_at', ?)")
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(pool)
            .await?;
        let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(pool)
            .await?;
        // Read-only openers cannot replay a WAL.
        sqlx::query("PRAGMA journal_mode=DELETE")
            .execute(pool)
            .await?;

        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        self.promote()?;
        info!(
            "persisted index '{}' ({} records) to {}",
            self.db_name,
            records,
            self.final_dir.display()
        );

        Ok(StoreHandle {
            db_name: self.db_name.clone(),
            path: Some(self.final_dir.join(INDEX_FILE)),
            records: records as usize,
            dims: self.info.dims,
            model: self.info.model.clone(),
        })
    }

    async fn discard(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
        if self.staging.exists() {
            std::fs::remove_dir_all(&self.staging)
                .with_context(|| format!("failed to remove {}", self.staging.display()))?;
        }
        debug!("discarded staging index {}", self.staging.display());
        Ok(())
    }
}

/// Model and dims recorded in `index_meta`, if the index has them.
pub(crate) async fn read_index_info(pool: &SqlitePool) -> Result<Option<IndexInfo>> {
    let rows = sqlx::query("SELECT key, value FROM index_meta WHERE key IN ('model', 'dims')")
        .fetch_all(pool)
        .await?;

    let mut model = None;
    let mut dims = None;
    for row in rows {
        let key: String = row.get("key");
        let value: String = row.get("value");
        match key.as_str() {
            "model" => model = Some(value),
            "dims" => dims = value.parse::<usize>().ok(),
            _ => {}
        }
    }

    Ok(match (model, dims) {
        (Some(model), Some(dims)) => Some(IndexInfo { model, dims }),
        _ => None,
    })
}
