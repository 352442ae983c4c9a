//! Recursive corpus walker.
//!
//! Discovers every `.pdf` / `.txt` file (extension matched
//! case-insensitively) under a root folder, extracts each one and folds
//! the results into a single [`Corpus`]. Files with any other extension are
//! skipped and never counted.
//!
//! Discovered paths are sorted before extraction so the corpus (and every
//! chunk boundary derived from it) does not depend on the platform's
//! directory iteration order.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::WalkerConfig;
use crate::error::{IngestError, Result};
use crate::extract::Extractor;
use crate::models::{Corpus, SourceFile};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Counters collected while walking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub files: usize,
    pub files_with_text: usize,
    pub ocr_pages: usize,
    /// Characters contributed by each file, parallel to `Corpus::sources`.
    pub file_chars: Vec<usize>,
}

/// List ingestible files under `root`, sorted by path.
pub fn discover(root: &Path, config: &WalkerConfig) -> Result<Vec<SourceFile>> {
    if !root.exists() {
        return Err(IngestError::NotFound(root.to_path_buf()));
    }

    let mut excludes = vec!["**/.git/**".to_string()];
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // An unreadable subdirectory must not end the run.
                tracing::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if exclude_set.is_match(relative) {
            debug!("excluded {}", relative.display());
            continue;
        }

        if let Some(file) = SourceFile::classify(path) {
            files.push(file);
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Discover and extract every file under `root` into one corpus.
///
/// File texts are joined with a newline separator. Extraction failures
/// are absorbed by the extractor; only a missing root (or an invalid exclude
/// pattern) fails the walk.
pub fn walk(
    root: &Path,
    extractor: &Extractor,
    config: &WalkerConfig,
    progress: &dyn ProgressReporter,
) -> Result<(Corpus, WalkStats)> {
    progress.report(ProgressEvent::Discovering {
        root: root.to_path_buf(),
    });
    let files = discover(root, config)?;
    info!("discovered {} file(s) under {}", files.len(), root.display());

    let total = files.len() as u64;
    let mut corpus = Corpus::default();
    let mut stats = WalkStats {
        files: files.len(),
        ..Default::default()
    };

    for (i, file) in files.into_iter().enumerate() {
        progress.report(ProgressEvent::Extracting {
            n: i as u64 + 1,
            total,
            path: file.path.clone(),
        });

        let extracted = extractor.extract_report(&file);
        if !extracted.text.trim().is_empty() {
            stats.files_with_text += 1;
        }
        stats.ocr_pages += extracted.ocr_pages;
        stats.file_chars.push(extracted.text.chars().count());

        if i > 0 {
            corpus.text.push('\n');
        }
        corpus.text.push_str(&extracted.text);
        corpus.sources.push(file);
    }

    Ok((corpus, stats))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            IngestError::Config(format!("invalid exclude glob '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| IngestError::Config(format!("invalid exclude globs: {}", e)))
}
