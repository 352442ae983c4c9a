//! Build progress reporting.
//!
//! Reports what the pipeline is doing during `lexcorpus build`: discovery,
//! per-file extraction, embedding batches and the final persist. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// A single progress event.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// Walking the root folder. Total unknown.
    Discovering { root: PathBuf },
    /// File `n` of `total` is being extracted.
    Extracting {
        n: u64,
        total: u64,
        path: PathBuf,
    },
    /// `n` of `total` chunks have been embedded and written.
    Embedding { n: u64, total: u64 },
    /// Finalizing the store.
    Persisting { db_name: String },
}

/// Receives progress events. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "extracting  12 / 340 files  contracts/nda.pdf".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Discovering { root } => {
                format!("discovering files under {}...\n", root.display())
            }
            ProgressEvent::Extracting { n, total, path } => format!(
                "extracting  {} / {} files  {}\n",
                format_number(*n),
                format_number(*total),
                path.display()
            ),
            ProgressEvent::Embedding { n, total } => format!(
                "embedding  {} / {} chunks\n",
                format_number(*n),
                format_number(*total)
            ),
            ProgressEvent::Persisting { db_name } => format!("persisting {}...\n", db_name),
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = to_json(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

fn to_json(event: &ProgressEvent) -> serde_json::Value {
    match event {
        ProgressEvent::Discovering { root } => serde_json::json!({
            "event": "progress",
            "phase": "discovering",
            "root": root.display().to_string(),
        }),
        ProgressEvent::Extracting { n, total, path } => serde_json::json!({
            "event": "progress",
            "phase": "extracting",
            "n": n,
            "total": total,
            "path": path.display().to_string(),
        }),
        ProgressEvent::Embedding { n, total } => serde_json::json!({
            "event": "progress",
            "phase": "embedding",
            "n": n,
            "total": total,
        }),
        ProgressEvent::Persisting { db_name } => serde_json::json!({
            "event": "progress",
            "phase": "persisting",
            "db_name": db_name,
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Arc<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Arc::new(NoProgress),
            ProgressMode::Human => Arc::new(StderrProgress),
            ProgressMode::Json => Arc::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_event_shape() {
        let v = to_json(&ProgressEvent::Embedding { n: 64, total: 200 });
        assert_eq!(v["phase"], "embedding");
        assert_eq!(v["n"], 64);
        assert_eq!(v["total"], 200);

        let v = to_json(&ProgressEvent::Extracting {
            n: 1,
            total: 3,
            path: PathBuf::from("a/b.pdf"),
        });
        assert_eq!(v["phase"], "extracting");
        assert_eq!(v["path"], "a/b.pdf");
    }
}
