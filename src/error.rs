//! Error taxonomy for an ingestion run.
//!
//! Only [`ExtractError`] is recovered locally (inside the extractor, per
//! file). Every [`IngestError`] that reaches the caller ends the run.

use std::path::PathBuf;

use thiserror::Error;

/// Terminal failures of an ingestion run, plus the per-file extraction
/// failure that the extractor reports and recovers from.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The root folder does not exist.
    #[error("root folder not found: {}", .0.display())]
    NotFound(PathBuf),

    /// One file could not be extracted.
    #[error("failed to extract {}: {source}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    /// No discovered file produced any text.
    #[error("corpus is empty: {files} supported file(s) found, none yielded text")]
    EmptyCorpus { files: usize },

    /// Invalid configuration (chunking parameters, db name, policies).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The embedding collaborator failed.
    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    /// The vector store collaborator failed.
    #[error("vector store failed: {0:#}")]
    Store(anyhow::Error),
}

/// Per-file extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("page {page} could not be rendered: {reason}")]
    Render { page: u32, reason: String },

    #[error("OCR failed on page {page}: {reason}")]
    Ocr { page: u32, reason: String },
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_path() {
        let err = IngestError::NotFound(PathBuf::from("/no/such/dir"));
        assert_eq!(err.to_string(), "root folder not found: /no/such/dir");
    }

    #[test]
    fn extraction_error_keeps_source() {
        let err = IngestError::Extraction {
            path: PathBuf::from("a.pdf"),
            source: ExtractError::Pdf("bad xref".to_string()),
        };
        assert!(err.to_string().contains("a.pdf"));
        assert!(err.to_string().contains("bad xref"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn embedding_error_shows_context_chain() {
        let inner = anyhow::anyhow!("connection refused").context("ollama unreachable");
        let err = IngestError::Embedding(inner);
        let msg = err.to_string();
        assert!(msg.contains("ollama unreachable"));
        assert!(msg.contains("connection refused"));
    }
}
