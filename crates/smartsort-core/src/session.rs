//! Analysis sessions, summaries and performance metrics.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::group::{DuplicateGroup, GroupKind};
use crate::issues::NamingIssues;
use crate::record::{Category, FileRecord};

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of one pipeline run.
///
/// Ids sort by creation time; a sequence suffix distinguishes runs started
/// within the same microsecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh, time-based session id.
    pub fn generate() -> Self {
        Self::at(Utc::now())
    }

    fn at(now: DateTime<Utc>) -> Self {
        let seq = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "session_{}_{:06}",
            now.timestamp_micros(),
            seq % 1_000_000
        ))
    }

    /// Wrap an existing id, e.g. one read back from storage.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How a run ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// Every chunk was processed.
    #[default]
    Completed,
    /// Cancelled at a chunk boundary; unscheduled chunks were dropped.
    Cancelled,
}

/// How the files of a run were processed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessingMethod {
    /// On the calling thread, for runs below the parallel threshold.
    Serial,
    /// On the worker pool.
    #[default]
    Parallel,
}

/// Throughput and cache statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceMetrics {
    pub processing_method: ProcessingMethod,
    pub worker_count: usize,
    pub chunk_count: usize,
    /// Chunks dropped because the run was cancelled.
    pub skipped_chunks: usize,
    /// Files processed by each worker thread, indexed by worker.
    pub files_per_worker: Vec<u64>,
    pub files_per_second: f64,
    pub bytes_processed: u64,
    pub cache_enabled: bool,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub discovery_seconds: f64,
    pub processing_seconds: f64,
    pub grouping_seconds: f64,
}

impl PerformanceMetrics {
    /// Fill in derived rates from the raw counters.
    pub fn compute_rates(&mut self, files_processed: u64, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        self.files_per_second = if secs > 0.0 {
            files_processed as f64 / secs
        } else {
            0.0
        };

        let lookups = self.cache_hits + self.cache_misses;
        self.cache_hit_rate = if lookups > 0 {
            self.cache_hits as f64 / lookups as f64
        } else {
            0.0
        };
    }
}

/// Aggregate counts over the records and groups of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSummary {
    pub category_counts: BTreeMap<Category, u64>,
    pub error_count: u64,
    pub exact_groups: usize,
    pub similar_groups: usize,
    pub wasted_bytes: u64,
    pub naming_issues: NamingIssues,
}

impl SessionSummary {
    /// Summarize a finished run.
    pub fn from_results(records: &[FileRecord], groups: &[DuplicateGroup]) -> Self {
        let mut summary = Self::default();
        for record in records {
            *summary
                .category_counts
                .entry(record.detected_category)
                .or_default() += 1;
            if record.is_error() {
                summary.error_count += 1;
            }
        }
        for group in groups {
            match group.kind {
                GroupKind::Exact => summary.exact_groups += 1,
                GroupKind::Similar => summary.similar_groups += 1,
            }
            summary.wasted_bytes += group.wasted_bytes;
        }
        summary
    }
}

/// Metadata for one completed pipeline run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSession {
    pub session_id: SessionId,
    pub directory_path: PathBuf,
    /// When the run started.
    pub timestamp: DateTime<Utc>,
    pub files_processed: u64,
    pub processing_time_seconds: f64,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub summary: SessionSummary,
    #[serde(default)]
    pub performance_metrics: PerformanceMetrics,
}

impl AnalysisSession {
    /// Check if the run processed every chunk.
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

/// A run that has started but not been finalized.
#[derive(Debug)]
pub struct PendingSession {
    session_id: SessionId,
    directory_path: PathBuf,
    timestamp: DateTime<Utc>,
    started: Instant,
}

impl PendingSession {
    /// Start a session for a directory.
    pub fn start(directory_path: impl Into<PathBuf>) -> Self {
        Self {
            session_id: SessionId::generate(),
            directory_path: directory_path.into(),
            timestamp: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn directory_path(&self) -> &std::path::Path {
        &self.directory_path
    }

    /// Time since the session started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Finalize the session once aggregation is done.
    pub fn finalize(
        self,
        files_processed: u64,
        status: SessionStatus,
        summary: SessionSummary,
        mut performance_metrics: PerformanceMetrics,
    ) -> AnalysisSession {
        let elapsed = self.started.elapsed();
        performance_metrics.compute_rates(files_processed, elapsed);
        AnalysisSession {
            session_id: self.session_id,
            directory_path: self.directory_path,
            timestamp: self.timestamp,
            files_processed,
            processing_time_seconds: elapsed.as_secs_f64(),
            status,
            summary,
            performance_metrics,
        }
    }
}
