use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::error::IngestError;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "./config/lexcorpus.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub walker: WalkerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL, used by the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
            url: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tesseract")]
    pub tesseract: String,
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract: default_tesseract(),
            pdftoppm: default_pdftoppm(),
            language: default_language(),
            dpi: default_dpi(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_tesseract() -> String {
    "tesseract".to_string()
}
fn default_pdftoppm() -> String {
    "pdftoppm".to_string()
}
fn default_language() -> String {
    "eng".to_string()
}
fn default_dpi() -> u32 {
    150
}

/// What to do when `<store.root>/<db_name>` already exists.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExistingIndexPolicy {
    /// Build a fresh index and swap it in at persist time.
    #[default]
    Replace,
    /// Copy the existing index and add the new records to it.
    Append,
    /// Refuse to touch an existing index.
    Fail,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub on_existing: ExistingIndexPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
            on_existing: ExistingIndexPolicy::default(),
        }
    }
}

fn default_store_root() -> PathBuf {
    PathBuf::from("vector_databases")
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WalkerConfig {
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Config {
    /// Check every setting that must hold before the pipeline touches disk.
    pub fn validate(&self) -> Result<(), IngestError> {
        crate::chunk::validate_params(self.chunking.chunk_size, self.chunking.overlap)?;

        if self.embedding.batch_size == 0 {
            return Err(IngestError::Config(
                "embedding.batch_size must be > 0".to_string(),
            ));
        }

        match self.embedding.provider.as_str() {
            "disabled" | "local" => {}
            "openai" | "ollama" => {
                if self.embedding.dims.is_none() || self.embedding.dims == Some(0) {
                    return Err(IngestError::Config(format!(
                        "embedding.dims must be > 0 when provider is '{}'",
                        self.embedding.provider
                    )));
                }
                if self.embedding.model.is_none() {
                    return Err(IngestError::Config(format!(
                        "embedding.model must be specified when provider is '{}'",
                        self.embedding.provider
                    )));
                }
            }
            other => {
                return Err(IngestError::Config(format!(
                    "unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                    other
                )))
            }
        }

        if self.ocr.dpi == 0 {
            return Err(IngestError::Config("ocr.dpi must be > 0".to_string()));
        }

        Ok(())
    }
}

/// Reject database names that would escape the store root or collide with
/// staging directories.
pub fn validate_db_name(name: &str) -> Result<(), IngestError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(IngestError::Config("database name is empty".to_string()));
    }
    if name.starts_with('.') {
        return Err(IngestError::Config(format!(
            "database name '{}' must not start with '.'",
            name
        )));
    }
    if name.contains(['/', '\\']) {
        return Err(IngestError::Config(format!(
            "database name '{}' must not contain path separators",
            name
        )));
    }
    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}

/// Load `path` when it exists; fall back to built-in defaults only when the
/// caller left the path at its default value.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Config {
        toml::from_str(toml_src).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.chunking.overlap, 200);
        assert_eq!(cfg.store.root, PathBuf::from("vector_databases"));
        assert_eq!(cfg.store.on_existing, ExistingIndexPolicy::Replace);
        assert!(cfg.ocr.enabled);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse("");
        assert_eq!(cfg.chunking.chunk_size, 1000);
        assert_eq!(cfg.embedding.provider, "disabled");
    }

    #[test]
    fn overlap_too_large_is_config_error() {
        let cfg = parse("[chunking]\nchunk_size = 100\noverlap = 100\n");
        assert!(matches!(cfg.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn openai_requires_dims_and_model() {
        let cfg = parse("[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n");
        assert!(cfg.validate().is_err());
        let cfg = parse("[embedding]\nprovider = \"openai\"\ndims = 1536\n");
        assert!(cfg.validate().is_err());
        let cfg = parse(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n",
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_provider_rejected() {
        let cfg = parse("[embedding]\nprovider = \"magic\"\n");
        assert!(matches!(cfg.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn on_existing_parses_lowercase() {
        let cfg = parse("[store]\non_existing = \"append\"\n");
        assert_eq!(cfg.store.on_existing, ExistingIndexPolicy::Append);
        assert!(toml::from_str::<Config>("[store]\non_existing = \"merge\"\n").is_err());
    }

    #[test]
    fn db_name_rules() {
        assert!(validate_db_name("contracts_2024").is_ok());
        assert!(validate_db_name("").is_err());
        assert!(validate_db_name("   ").is_err());
        assert!(validate_db_name("../escape").is_err());
        assert!(validate_db_name("a/b").is_err());
        assert!(validate_db_name(".hidden").is_err());
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let err = load_or_default(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
