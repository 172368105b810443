//! Analysis configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzeError;

/// Files at or above this size get a sampled fingerprint (1 MiB).
pub const DEFAULT_SAMPLE_THRESHOLD: u64 = 1024 * 1024;

/// Configuration for an analysis run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct AnalyzeConfig {
    /// Maximum number of files per chunk.
    #[builder(default = "100")]
    pub max_chunk_files: usize,

    /// Runs with fewer files than this are processed on the calling thread.
    #[builder(default = "10")]
    pub parallel_threshold: usize,

    /// Upper bound on the worker pool size.
    #[builder(default = "8")]
    pub max_workers: usize,

    /// Number of workers (0 = min(available parallelism, max_workers)).
    #[builder(default = "0")]
    pub workers: usize,

    /// Size at which fingerprints switch from full to sampled hashing.
    #[builder(default = "DEFAULT_SAMPLE_THRESHOLD")]
    pub sample_threshold: u64,

    /// Bytes hashed from each end of a file when sampling.
    #[builder(default = "8192")]
    pub sample_window: usize,

    /// Bytes of decoded text kept as the content sample.
    #[builder(default = "1024")]
    pub content_sample_bytes: usize,

    /// Minimum similarity for two files to share a similar group.
    #[builder(default = "0.7")]
    pub similarity_threshold: f64,

    /// Re-hash sampled exact-duplicate candidates in full before grouping.
    #[builder(default = "true")]
    pub verify_sampled_duplicates: bool,

    /// Entries whose name starts with this character are skipped.
    #[builder(default = "'.'")]
    pub hidden_marker: char,

    /// Glob patterns matched against file and directory names.
    #[builder(default)]
    pub ignore_patterns: Vec<String>,

    /// Follow symbolic links while walking.
    #[builder(default = "false")]
    pub follow_symlinks: bool,

    /// Location of the result cache database (None = platform data dir).
    #[builder(default)]
    pub database_path: Option<PathBuf>,
}

impl AnalyzeConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_chunk_files == Some(0) {
            return Err("max_chunk_files must be greater than zero".to_string());
        }
        if self.max_workers == Some(0) {
            return Err("max_workers must be greater than zero".to_string());
        }
        if self.sample_window == Some(0) {
            return Err("sample_window must be greater than zero".to_string());
        }
        if let Some(threshold) = self.similarity_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(format!(
                    "similarity_threshold must be within [0, 1], got {threshold}"
                ));
            }
        }
        Ok(())
    }
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            max_chunk_files: 100,
            parallel_threshold: 10,
            max_workers: 8,
            workers: 0,
            sample_threshold: DEFAULT_SAMPLE_THRESHOLD,
            sample_window: 8192,
            content_sample_bytes: 1024,
            similarity_threshold: 0.7,
            verify_sampled_duplicates: true,
            hidden_marker: '.',
            ignore_patterns: Vec::new(),
            follow_symlinks: false,
            database_path: None,
        }
    }
}

impl AnalyzeConfig {
    /// Create a new config builder.
    pub fn builder() -> AnalyzeConfigBuilder {
        AnalyzeConfigBuilder::default()
    }

    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, AnalyzeError> {
        let config: Self =
            toml::from_str(content).map_err(|e| AnalyzeError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalyzeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AnalyzeError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Load `config.toml` from the platform config directory, or defaults when
    /// there is none.
    pub fn load_default() -> Result<Self, AnalyzeError> {
        match Self::default_config_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Platform location of the user config file.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("smartsort").join("config.toml"))
    }

    /// Resolved database location.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("smartsort")
                .join("smartsort.db")
        })
    }

    /// Check invariants for configs that did not come through the builder.
    pub fn validate(&self) -> Result<(), AnalyzeError> {
        if self.max_chunk_files == 0 {
            return Err(AnalyzeError::invalid_config(
                "max_chunk_files must be greater than zero",
            ));
        }
        if self.max_workers == 0 {
            return Err(AnalyzeError::invalid_config(
                "max_workers must be greater than zero",
            ));
        }
        if self.sample_window == 0 {
            return Err(AnalyzeError::invalid_config(
                "sample_window must be greater than zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AnalyzeError::invalid_config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }

    /// Effective worker count: explicit setting or available parallelism,
    /// capped at `max_workers`.
    pub fn effective_workers(&self) -> usize {
        let wanted = match self.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        };
        wanted.clamp(1, self.max_workers.max(1))
    }

    /// Check if an entry name marks a hidden entry.
    pub fn is_hidden(&self, name: &str) -> bool {
        name.starts_with(self.hidden_marker)
    }
}
