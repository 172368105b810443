//! The analysis pipeline: validate, discover, dispatch, group, record.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use smartsort_analyze::{FileAnalyzer, GroupConfig, Grouper, detect_naming_issues};
use smartsort_cache::{CacheError, ResultCache};
use smartsort_core::{
    AnalysisSession, AnalyzeConfig, AnalyzeError, DiscoveryWarning, DuplicateGroup, FileRecord,
    PendingSession, PerformanceMetrics, SessionId, SessionStatus, SessionSummary,
};
use smartsort_scan::{
    AnalysisProgress, CancellationToken, ChunkDispatcher, Discoverer, ValidatedDirectory,
    partition, validate_root,
};

use crate::control::RunControl;
use crate::processor::RecordProcessor;

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub session: AnalysisSession,
    pub records: Vec<FileRecord>,
    pub groups: Vec<DuplicateGroup>,
    pub warnings: Vec<DiscoveryWarning>,
}

impl AnalysisReport {
    pub fn exact_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|g| g.is_exact())
    }

    pub fn similar_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.groups.iter().filter(|g| !g.is_exact())
    }
}

/// Runs analyses over directories and answers history queries.
///
/// `analyze_directory` gives every run its own progress counter. Its
/// cancellation token is the one handed out by `cancel_token`; once a run
/// ends cancelled the engine installs a fresh token for the next one.
/// Callers that run several analyses at once should pass their own
/// `RunControl` to `analyze_directory_with`.
pub struct AnalysisEngine {
    config: AnalyzeConfig,
    database_path: PathBuf,
    discoverer: Discoverer,
    analyzer: FileAnalyzer,
    grouper: Grouper,
    current: Mutex<RunControl>,
}

impl AnalysisEngine {
    /// Build an engine. Fails only on invalid configuration.
    pub fn new(config: AnalyzeConfig) -> Result<Self, AnalyzeError> {
        config.validate()?;
        let discoverer = Discoverer::new(&config)?;
        Ok(Self {
            database_path: config.resolved_database_path(),
            discoverer,
            analyzer: FileAnalyzer::from_config(&config),
            grouper: Grouper::new(GroupConfig::from_config(&config)),
            current: Mutex::new(RunControl::new()),
            config,
        })
    }

    /// Use a different database file than the configured one.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn config(&self) -> &AnalyzeConfig {
        &self.config
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Progress of the most recently started run.
    pub fn progress(&self) -> AnalysisProgress {
        self.current_run().progress()
    }

    /// Token for the run in flight, or for the next run when none is.
    pub fn cancel_token(&self) -> CancellationToken {
        self.current_run().cancel_token()
    }

    /// Check that `path` can be analyzed and count the files it holds.
    pub fn validate_directory(&self, path: &Path) -> Result<ValidatedDirectory, AnalyzeError> {
        self.discoverer.validate(path)
    }

    /// Analyze every file under `path` and group duplicates.
    ///
    /// Directory problems are reported before any work begins. Per-file
    /// failures become `Errors` records. Cache problems are logged and the
    /// run continues without the cache.
    pub fn analyze_directory(
        &self,
        path: &Path,
        caching_enabled: bool,
    ) -> Result<AnalysisReport, AnalyzeError> {
        let control = {
            let mut current = self.lock_current();
            *current = current.restarted();
            current.clone()
        };

        let result = self.analyze_directory_with(path, caching_enabled, &control);

        if control.is_cancelled() {
            let mut current = self.lock_current();
            if current.is_cancelled() {
                *current = current.with_fresh_token();
            }
        }
        result
    }

    /// Like `analyze_directory`, reporting progress and observing
    /// cancellation through `control` only.
    pub fn analyze_directory_with(
        &self,
        path: &Path,
        caching_enabled: bool,
        control: &RunControl,
    ) -> Result<AnalysisReport, AnalyzeError> {
        let progress = control.counter();
        progress.start(0);

        let root = validate_root(path)?;
        let pending = PendingSession::start(&root);
        info!("Starting session {} for {}", pending.session_id(), root.display());

        // Phase 1: discovery
        let discovery = self.discoverer.discover(&root)?;
        let discovery_seconds = discovery.duration.as_secs_f64();
        let file_count = discovery.file_count();
        let warnings = discovery.warnings;

        // Phase 2: chunked processing
        let store = self.open_store();
        let file_cache = if caching_enabled { store.as_ref() } else { None };

        let chunks = partition(discovery.files, self.config.max_chunk_files);
        let chunk_count = chunks.len();
        let workers = self.config.effective_workers();
        info!(
            "Processing {} files in {} chunks on {} workers",
            file_count, chunk_count, workers
        );

        let dispatcher = ChunkDispatcher::new(workers)?
            .with_parallel_threshold(self.config.parallel_threshold)
            .with_progress(progress)
            .with_cancellation(control.cancel_token());
        let processor = RecordProcessor::new(&self.analyzer, file_cache, pending.session_id());
        let outcome = dispatcher.dispatch(chunks, &processor);
        if outcome.cancelled {
            warn!(
                "Run cancelled: {} of {} chunks skipped",
                outcome.chunks_skipped, chunk_count
            );
        }

        // Phase 3: grouping over the full record set
        let grouping_start = Instant::now();
        let groups = self.grouper.group(&outcome.records).into_groups();
        let grouping_seconds = grouping_start.elapsed().as_secs_f64();
        info!("Found {} duplicate groups", groups.len());

        let metrics = PerformanceMetrics {
            processing_method: outcome.processing_method,
            worker_count: outcome.files_per_worker.len(),
            chunk_count,
            skipped_chunks: outcome.chunks_skipped,
            files_per_worker: outcome.files_per_worker,
            bytes_processed: outcome.bytes_processed,
            cache_enabled: file_cache.is_some() && !processor.is_degraded(),
            cache_hits: processor.hits(),
            cache_misses: processor.misses(),
            discovery_seconds,
            processing_seconds: outcome.elapsed.as_secs_f64(),
            grouping_seconds,
            ..Default::default()
        };
        let status = if outcome.cancelled {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Completed
        };
        let records = outcome.records;
        let mut summary = SessionSummary::from_results(&records, &groups);
        summary.naming_issues = detect_naming_issues(&records);
        let session = pending.finalize(records.len() as u64, status, summary, metrics);

        // Phase 4: persistence
        if let Some(store) = &store {
            if let Err(e) = persist(store, &session, &records, &groups) {
                warn!("Failed to record session {}: {}", session.session_id, e);
            }
        }

        info!(
            "Session {} {}: {} files in {:.2}s",
            session.session_id, session.status, session.files_processed, session.processing_time_seconds
        );

        Ok(AnalysisReport {
            session,
            records,
            groups,
            warnings,
        })
    }

    /// Most recent sessions first.
    pub fn history(&self, limit: usize) -> Result<Vec<AnalysisSession>, CacheError> {
        self.store()?.history(limit)
    }

    pub fn session(&self, session_id: &SessionId) -> Result<Option<AnalysisSession>, CacheError> {
        self.store()?.session(session_id)
    }

    pub fn session_files(&self, session_id: &SessionId) -> Result<Vec<FileRecord>, CacheError> {
        self.store()?.session_files(session_id)
    }

    pub fn session_groups(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<DuplicateGroup>, CacheError> {
        self.store()?.session_groups(session_id)
    }

    fn current_run(&self) -> RunControl {
        self.lock_current().clone()
    }

    fn lock_current(&self) -> MutexGuard<'_, RunControl> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self) -> Result<ResultCache, CacheError> {
        ResultCache::open(&self.database_path)
    }

    fn open_store(&self) -> Option<ResultCache> {
        match self.store() {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(
                    "Result store at {} unavailable, running without it: {}",
                    self.database_path.display(),
                    e
                );
                None
            }
        }
    }
}

fn persist(
    store: &ResultCache,
    session: &AnalysisSession,
    records: &[FileRecord],
    groups: &[DuplicateGroup],
) -> Result<(), CacheError> {
    store.record_session(session)?;
    let files = store.record_session_files(&session.session_id, records)?;
    let stored_groups = store.record_session_groups(&session.session_id, groups)?;
    debug!(
        "Recorded session {} with {} files and {} groups",
        session.session_id, files, stored_groups
    );
    Ok(())
}
