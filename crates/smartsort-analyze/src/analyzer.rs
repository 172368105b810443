//! Per-file analysis: fingerprint, content sample and classification.

use std::path::Path;

use chrono::{DateTime, Utc};

use smartsort_core::{AnalyzeConfig, FileRecord, extension_of};

use crate::classify::Classifier;
use crate::content::read_sample;
use crate::fingerprint::{FingerprintPolicy, fingerprint};

/// Stateless per-file analyzer. Cheap to share across worker threads.
#[derive(Debug, Clone)]
pub struct FileAnalyzer {
    policy: FingerprintPolicy,
    classifier: Classifier,
    sample_bytes: usize,
}

impl Default for FileAnalyzer {
    fn default() -> Self {
        Self::from_config(&AnalyzeConfig::default())
    }
}

impl FileAnalyzer {
    pub fn new(policy: FingerprintPolicy, classifier: Classifier, sample_bytes: usize) -> Self {
        Self {
            policy,
            classifier,
            sample_bytes,
        }
    }

    pub fn from_config(config: &AnalyzeConfig) -> Self {
        Self::new(
            FingerprintPolicy::from_config(config),
            Classifier::new(),
            config.content_sample_bytes,
        )
    }

    pub fn policy(&self) -> &FingerprintPolicy {
        &self.policy
    }

    /// Analyze one file. I/O failures produce an `Errors` record instead of
    /// an error so a single unreadable file never aborts a run.
    pub fn analyze(
        &self,
        path: &Path,
        size_bytes: u64,
        modified_at: DateTime<Utc>,
        created_at: Option<DateTime<Utc>>,
    ) -> FileRecord {
        let content_fingerprint = match fingerprint(path, size_bytes, &self.policy) {
            Ok(fp) => fp,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "fingerprint failed");
                return FileRecord::errored(path, size_bytes, modified_at, created_at, e.to_string());
            }
        };

        let content_sample = match read_sample(path, self.sample_bytes) {
            Ok(sample) => sample,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "content sample failed");
                return FileRecord::errored(path, size_bytes, modified_at, created_at, e.to_string());
            }
        };

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(path);
        let classification = self
            .classifier
            .classify(&filename, &extension, &content_sample);

        FileRecord {
            path: path.to_path_buf(),
            filename: filename.into(),
            extension,
            size_bytes,
            created_at,
            modified_at,
            content_fingerprint,
            detected_category: classification.category,
            type_confidence: classification.confidence,
            content_sample,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use smartsort_core::Category;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_analyze_text_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Homework_1.TXT");
        fs::write(&path, "chapter one questions").unwrap();

        let record = FileAnalyzer::default().analyze(&path, 21, Utc::now(), None);
        assert_eq!(record.extension, ".txt");
        assert_eq!(record.detected_category, Category::School);
        assert_eq!(record.type_confidence, 1.0);
        assert_eq!(record.content_sample, "chapter one questions");
        assert!(!record.content_fingerprint.is_empty());
        assert!(record.error.is_none());
    }

    #[test]
    fn test_vanished_file_becomes_error_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.pdf");

        let record = FileAnalyzer::default().analyze(&path, 100, Utc::now(), None);
        assert_eq!(record.detected_category, Category::Errors);
        assert!(record.error.is_some());
        assert_eq!(record.filename, "gone.pdf");
    }
}
