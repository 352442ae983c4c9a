//! Persisted index overview.
//!
//! Reads `<store.root>/<db_name>/index.sqlite` read-only and summarizes it:
//! record count, embedding model and dimensions, when it was built and how
//! much disk it takes. Used by `lexcorpus stats`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use sqlx::Row;

use crate::config::{validate_db_name, Config};
use crate::db;
use crate::store::INDEX_FILE;

/// Summary of one persisted index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub db_name: String,
    pub path: PathBuf,
    pub records: i64,
    pub model: Option<String>,
    pub dims: Option<usize>,
    pub created_at: Option<String>,
    pub persisted_at: Option<String>,
    pub size_bytes: u64,
}

/// Load stats for `db_name` under `store_root`.
pub async fn read_stats(store_root: &Path, db_name: &str) -> Result<IndexStats> {
    validate_db_name(db_name)?;
    let path = store_root.join(db_name).join(INDEX_FILE);
    if !path.is_file() {
        bail!("no index named '{}' at {}", db_name, path.display());
    }

    let pool = db::connect_read_only(&path).await?;

    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(&pool)
        .await?;

    let mut stats = IndexStats {
        db_name: db_name.to_string(),
        path: path.clone(),
        records,
        model: None,
        dims: None,
        created_at: None,
        persisted_at: None,
        size_bytes: dir_size(store_root.join(db_name).as_path()),
    };

    for row in sqlx::query("SELECT key, value FROM index_meta")
        .fetch_all(&pool)
        .await?
    {
        let key: String = row.get("key");
        let value: String = row.get("value");
        match key.as_str() {
            "model" => stats.model = Some(value),
            "dims" => stats.dims = value.parse().ok(),
            "created_at" => stats.created_at = Some(value),
            "persisted_at" => stats.persisted_at = Some(value),
            _ => {}
        }
    }

    pool.close().await;
    Ok(stats)
}

/// Run the stats command: read the index and print a summary.
pub async fn run_stats(config: &Config, db_name: &str) -> Result<()> {
    let stats = read_stats(&config.store.root, db_name.trim()).await?;

    println!("Index: {}", stats.db_name);
    println!("================================");
    println!();
    println!("  Path:        {}", stats.path.display());
    println!("  Size:        {}", format_bytes(stats.size_bytes));
    println!();
    println!("  Records:     {}", stats.records);
    println!(
        "  Model:       {}",
        stats.model.as_deref().unwrap_or("unknown")
    );
    println!(
        "  Dims:        {}",
        stats
            .dims
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    if let Some(created) = &stats.created_at {
        println!("  Created:     {}", format_ts(created));
    }
    println!(
        "  Persisted:   {}",
        stats
            .persisted_at
            .as_deref()
            .map(format_ts)
            .unwrap_or_else(|| "never".to_string())
    );
    println!();

    Ok(())
}

fn dir_size(dir: &Path) -> u64 {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// RFC 3339 timestamp as "2026-01-31 14:05 (3 hours ago)".
fn format_ts(rfc3339: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(rfc3339) {
        Ok(dt) => {
            let ts = dt.timestamp();
            format!(
                "{} ({})",
                dt.format("%Y-%m-%d %H:%M"),
                format_ts_relative(ts)
            )
        }
        Err(_) => rfc3339.to_string(),
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExistingIndexPolicy;
    use crate::store::{IndexInfo, SqliteStoreOpener, StoreOpener, VectorStore};

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn unparseable_timestamp_passes_through() {
        assert_eq!(format_ts("yesterday"), "yesterday");
        assert!(format_ts(&chrono::Utc::now().to_rfc3339()).ends_with("(just now)"));
    }

    #[tokio::test]
    async fn missing_index_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_stats(dir.path(), "absent").await.unwrap_err();
        assert!(err.to_string().contains("absent"));
        assert!(err.to_string().contains(INDEX_FILE));
    }

    #[tokio::test]
    async fn reads_persisted_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let opener = SqliteStoreOpener::new(dir.path(), ExistingIndexPolicy::Replace);
        let info = IndexInfo {
            model: "fake-model".to_string(),
            dims: 2,
        };
        let mut store = opener.open("briefs", &info).await.unwrap();
        store
            .add_texts(&["clause".to_string()], &[vec![0.5, 0.25]])
            .await
            .unwrap();
        store.persist().await.unwrap();

        let stats = read_stats(dir.path(), "briefs").await.unwrap();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.model.as_deref(), Some("fake-model"));
        assert_eq!(stats.dims, Some(2));
        assert!(stats.persisted_at.is_some());
        assert!(stats.size_bytes > 0);
    }
}
