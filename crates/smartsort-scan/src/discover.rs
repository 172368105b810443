//! JWalk-based file discovery.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};
use serde::{Deserialize, Serialize};

use smartsort_core::{AnalyzeConfig, AnalyzeError, DiscoveryWarning, WarningKind};

/// A regular file found during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub created: Option<DateTime<Utc>>,
    /// Set when the file was listed but its metadata could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiscoveredFile {
    /// A listed file whose metadata could not be read. Processing turns it
    /// into an `Errors` record instead of dropping it.
    pub fn failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            modified: DateTime::<Utc>::default(),
            created: None,
            error: Some(message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Everything found under a root directory.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Canonical root that was walked.
    pub root: PathBuf,
    pub files: Vec<DiscoveredFile>,
    pub warnings: Vec<DiscoveryWarning>,
    pub total_bytes: u64,
    pub duration: Duration,
}

impl Discovery {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// A directory that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedDirectory {
    /// Absolute, canonical path.
    pub path: PathBuf,
    /// Files that discovery would visit.
    pub file_count: u64,
}

/// Check that a path exists, is a directory and can be listed.
///
/// Returns the canonical path. Runs before any other work so a bad target
/// never produces a partial session.
pub fn validate_root(path: &Path) -> Result<PathBuf, AnalyzeError> {
    let root = path.canonicalize().map_err(|e| AnalyzeError::io(path, e))?;
    if !root.is_dir() {
        return Err(AnalyzeError::NotADirectory { path: root });
    }
    std::fs::read_dir(&root).map_err(|e| AnalyzeError::io(&root, e))?;
    Ok(root)
}

/// Recursive walker that skips hidden and ignored entries.
#[derive(Debug, Clone)]
pub struct Discoverer {
    hidden_marker: char,
    ignore: GlobSet,
    follow_symlinks: bool,
    threads: usize,
}

impl Discoverer {
    /// Build a discoverer from the run configuration.
    pub fn new(config: &AnalyzeConfig) -> Result<Self, AnalyzeError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                AnalyzeError::invalid_config(format!("bad ignore pattern {pattern:?}: {e}"))
            })?;
            builder.add(glob);
        }
        let ignore = builder
            .build()
            .map_err(|e| AnalyzeError::invalid_config(e.to_string()))?;

        Ok(Self {
            hidden_marker: config.hidden_marker,
            ignore,
            follow_symlinks: config.follow_symlinks,
            threads: config.effective_workers(),
        })
    }

    /// Validate a directory and count the files discovery would find.
    pub fn validate(&self, path: &Path) -> Result<ValidatedDirectory, AnalyzeError> {
        let root = validate_root(path)?;
        let file_count = self
            .walker(&root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .count() as u64;
        Ok(ValidatedDirectory {
            path: root,
            file_count,
        })
    }

    /// Walk `path` and collect every regular file.
    pub fn discover(&self, path: &Path) -> Result<Discovery, AnalyzeError> {
        let start = Instant::now();
        let root = validate_root(path)?;

        let mut files = Vec::new();
        let mut warnings = Vec::new();
        let mut total_bytes = 0u64;

        for entry_result in self.walker(&root) {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let kind = match err.io_error().map(|e| e.kind()) {
                        Some(std::io::ErrorKind::PermissionDenied) => WarningKind::PermissionDenied,
                        _ => WarningKind::ReadError,
                    };
                    warnings.push(DiscoveryWarning::new(path, err.to_string(), kind));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    let message = err.to_string();
                    warnings.push(DiscoveryWarning::new(
                        &path,
                        message.clone(),
                        WarningKind::MetadataError,
                    ));
                    files.push(DiscoveredFile::failed(path, message));
                    continue;
                }
            };

            let size = metadata.len();
            total_bytes += size;
            files.push(DiscoveredFile {
                path,
                size,
                modified: metadata.modified().unwrap_or(UNIX_EPOCH).into(),
                created: metadata.created().ok().map(Into::into),
                error: None,
            });
        }

        for warning in &warnings {
            tracing::warn!(path = %warning.path.display(), "{}", warning.message);
        }
        tracing::info!(
            root = %root.display(),
            files = files.len(),
            bytes = total_bytes,
            "discovery finished"
        );

        Ok(Discovery {
            root,
            files,
            warnings,
            total_bytes,
            duration: start.elapsed(),
        })
    }

    fn walker(&self, root: &Path) -> WalkDir {
        let parallelism = match self.threads {
            0 | 1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        };

        // The root itself is never filtered; only entries read from a
        // directory pass through here.
        let marker = self.hidden_marker;
        let ignore = self.ignore.clone();
        WalkDir::new(root)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(self.follow_symlinks)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|entry| match entry {
                    Ok(e) => {
                        let name = e.file_name.to_string_lossy();
                        !name.starts_with(marker) && !ignore.is_match(name.as_ref())
                    }
                    Err(_) => true,
                });
            })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();
        fs::create_dir(root.join(".git")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join("dir2/file4.log"), "another file here").unwrap();
        fs::write(root.join(".hidden"), "secret").unwrap();
        fs::write(root.join(".git/HEAD"), "ref: main").unwrap();

        temp
    }

    fn names(discovery: &Discovery) -> Vec<String> {
        let mut names: Vec<String> = discovery
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_discover_skips_hidden() {
        let temp = create_test_tree();
        let discoverer = Discoverer::new(&AnalyzeConfig::default()).unwrap();
        let discovery = discoverer.discover(temp.path()).unwrap();

        assert_eq!(
            names(&discovery),
            vec!["file1.txt", "file2.txt", "file3.txt", "file4.log"]
        );
        assert_eq!(discovery.total_bytes, 5 + 17 + 4 + 17);
        assert!(discovery.warnings.is_empty());
        assert!(discovery.files.iter().all(|f| f.path.is_absolute()));
    }

    #[test]
    fn test_hidden_root_is_still_walked() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".stash");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("kept.txt"), "x").unwrap();

        let discoverer = Discoverer::new(&AnalyzeConfig::default()).unwrap();
        let discovery = discoverer.discover(&root).unwrap();
        assert_eq!(names(&discovery), vec!["kept.txt"]);
    }

    #[test]
    fn test_ignore_patterns() {
        let temp = create_test_tree();
        let config = AnalyzeConfig::builder()
            .ignore_patterns(vec!["*.log".to_string(), "subdir".to_string()])
            .build()
            .unwrap();
        let discovery = Discoverer::new(&config).unwrap().discover(temp.path()).unwrap();

        assert_eq!(names(&discovery), vec!["file1.txt", "file2.txt"]);
    }

    #[test]
    fn test_custom_hidden_marker() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("_draft.txt"), "x").unwrap();
        fs::write(temp.path().join(".visible.txt"), "y").unwrap();

        let config = AnalyzeConfig::builder().hidden_marker('_').build().unwrap();
        let discovery = Discoverer::new(&config).unwrap().discover(temp.path()).unwrap();
        assert_eq!(names(&discovery), vec![".visible.txt"]);
    }

    #[test]
    fn test_bad_ignore_pattern() {
        let config = AnalyzeConfig::builder()
            .ignore_patterns(vec!["a[".to_string()])
            .build()
            .unwrap();
        assert!(matches!(
            Discoverer::new(&config),
            Err(AnalyzeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let temp = create_test_tree();
        let discoverer = Discoverer::new(&AnalyzeConfig::default()).unwrap();

        let validated = discoverer.validate(temp.path()).unwrap();
        assert_eq!(validated.file_count, 4);
        assert!(validated.path.is_absolute());

        let missing = discoverer.validate(&temp.path().join("nope"));
        assert!(matches!(missing, Err(AnalyzeError::NotFound { .. })));

        let file = discoverer.validate(&temp.path().join("file1.txt"));
        assert!(matches!(file, Err(AnalyzeError::NotADirectory { .. })));
    }
}
