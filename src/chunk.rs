//! Fixed-size, overlap-aware corpus chunker.
//!
//! Splits the corpus into windows of at most `chunk_size` characters. Each
//! window after the first starts `overlap` characters before the end of the
//! previous one. Splitting is purely by length so the sequence is fully
//! determined by the input and the two parameters.
//!
//! Lengths are counted in `char`s, so a window never cuts a code point in
//! half.

use crate::error::{IngestError, Result};
use crate::models::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_OVERLAP: usize = 200;

/// Check the `chunk_size > overlap >= 0` constraint.
pub fn validate_params(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(IngestError::Config(
            "chunk_size must be greater than 0".to_string(),
        ));
    }
    if chunk_size <= overlap {
        return Err(IngestError::Config(format!(
            "chunk_size ({}) must be greater than overlap ({})",
            chunk_size, overlap
        )));
    }
    Ok(())
}

/// Split text into overlapping windows. Returns chunks with contiguous
/// indices starting at 0; empty text yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    validate_params(chunk_size, overlap)?;

    // Byte offset of every char boundary, plus the end of the string.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_len = bounds.len();
    bounds.push(text.len());

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < char_len {
        let end = (start + chunk_size).min(char_len);
        let shared = if chunks.is_empty() { 0 } else { overlap };
        chunks.push(make_chunk(
            chunks.len(),
            &text[bounds[start]..bounds[end]],
            shared,
        ));
        if end == char_len {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}

/// Rebuild the original text from a chunk sequence by dropping each
/// chunk's shared prefix.
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        out.extend(chunk.text.chars().skip(chunk.overlap));
    }
    out
}

fn make_chunk(index: usize, text: &str, overlap: usize) -> Chunk {
    Chunk {
        index,
        text: text.to_string(),
        overlap,
    }
}
