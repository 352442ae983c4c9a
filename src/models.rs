//! Core data models used throughout lexcorpus.
//!
//! These types represent the files, pages, corpus, chunks and stored
//! records that flow through one ingestion run.

use std::path::{Path, PathBuf};

/// Kind of an ingestible file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Pdf,
    Text,
}

impl SourceKind {
    /// Classify a path by extension (case-insensitive). Returns `None` for
    /// anything that is not `pdf` or `txt`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("pdf") {
            Some(SourceKind::Pdf)
        } else if ext.eq_ignore_ascii_case("txt") {
            Some(SourceKind::Text)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Text => "text",
        }
    }
}

/// A file discovered by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    /// Build a `SourceFile` if the path has a supported extension.
    pub fn classify(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let kind = SourceKind::from_path(&path)?;
        Some(Self { path, kind })
    }
}

/// How the text of a PDF page was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Native,
    Ocr,
}

/// Text of a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub source: SourceFile,
    /// 1-based page number.
    pub page_number: u32,
    pub text: String,
    pub method: ExtractionMethod,
}

/// Concatenated text of every ingested file, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub text: String,
    pub sources: Vec<SourceFile>,
}

impl Corpus {
    /// True when no file contributed anything but whitespace.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Length of the corpus in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A window of the corpus, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the chunk sequence, starting at 0.
    pub index: usize,
    pub text: String,
    /// Leading characters shared with the previous chunk (0 for the first).
    pub overlap: usize,
}

/// A chunk and its vector, as written into a store.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    pub store_id: String,
    pub chunk_text: String,
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(
            SourceKind::from_path(Path::new("brief.PDF")),
            Some(SourceKind::Pdf)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("notes.TxT")),
            Some(SourceKind::Text)
        );
        assert_eq!(SourceKind::from_path(Path::new("contract.docx")), None);
        assert_eq!(SourceKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn corpus_of_whitespace_is_empty() {
        let corpus = Corpus {
            text: "\n \n".to_string(),
            sources: vec![],
        };
        assert!(corpus.is_empty());
    }

    #[test]
    fn char_len_counts_chars_not_bytes() {
        let corpus = Corpus {
            text: "§ 12".to_string(),
            sources: vec![],
        };
        assert_eq!(corpus.char_len(), 4);
    }
}
