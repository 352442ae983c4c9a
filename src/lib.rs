//! # lexcorpus
//!
//! Builds a semantic-retrieval corpus from a folder of legal documents.
//!
//! Scanned and born-digital PDFs plus plain-text files are discovered
//! recursively, their text is extracted (with per-page OCR for image-only
//! pages), folded into a single corpus, split into overlapping chunks, and
//! embedded into a persisted vector index under `vector_databases/<db_name>/`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌───────────┐   ┌──────────┐
//! │  Walker  │──▶│ Extractor │──▶│ Corpus  │──▶│  Chunker  │──▶│  Index   │
//! │ pdf/txt  │   │ text+OCR  │   │ (text)  │   │ size/ovlp │   │ embed+db │
//! └──────────┘   └───────────┘   └─────────┘   └───────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lexcorpus doctor                         # check pdftoppm / tesseract
//! lexcorpus scan ./documents --extract     # dry run
//! lexcorpus build ./documents contracts    # build vector_databases/contracts
//! lexcorpus stats contracts
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`walker`] | Recursive file discovery and corpus aggregation |
//! | [`extract`] | PDF / text extraction with OCR fallback |
//! | [`ocr`] | Page renderer and OCR engine collaborators |
//! | [`chunk`] | Character-window chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store abstraction (SQLite, in-memory) |
//! | [`index`] | Embedding chunks into a store |
//! | [`ingest`] | Pipeline orchestration |
//! | [`progress`] | Operator progress reporting |
//! | [`stats`] | Persisted index overview |
//! | [`doctor`] | External tool checks |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod doctor;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod ocr;
pub mod progress;
pub mod stats;
pub mod store;
pub mod walker;
