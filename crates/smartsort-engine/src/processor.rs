//! Per-file processing with an optional read-through result cache.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{trace, warn};

use smartsort_analyze::FileAnalyzer;
use smartsort_cache::{CacheError, ResultCache};
use smartsort_core::{FileRecord, SessionId};
use smartsort_scan::{DiscoveredFile, FileProcessor};

/// Analyzes files, consulting the cache first when one is attached.
///
/// The first cache failure switches the processor to uncached mode for the
/// rest of the run.
pub(crate) struct RecordProcessor<'a> {
    analyzer: &'a FileAnalyzer,
    cache: Option<&'a ResultCache>,
    session_id: &'a SessionId,
    hits: AtomicU64,
    misses: AtomicU64,
    degraded: AtomicBool,
}

impl<'a> RecordProcessor<'a> {
    pub(crate) fn new(
        analyzer: &'a FileAnalyzer,
        cache: Option<&'a ResultCache>,
        session_id: &'a SessionId,
    ) -> Self {
        Self {
            analyzer,
            cache,
            session_id,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            degraded: AtomicBool::new(false),
        }
    }

    pub(crate) fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub(crate) fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn active_cache(&self) -> Option<&'a ResultCache> {
        if self.is_degraded() { None } else { self.cache }
    }

    fn degrade(&self, err: &CacheError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            warn!("Result cache failed, continuing without it: {}", err);
        }
    }
}

impl FileProcessor for RecordProcessor<'_> {
    fn process(&self, file: &DiscoveredFile) -> FileRecord {
        if let Some(message) = &file.error {
            return FileRecord::errored(
                &file.path,
                file.size,
                file.modified,
                file.created,
                message.as_str(),
            );
        }

        if let Some(cache) = self.active_cache() {
            match cache.lookup_with_metadata(&file.path, file.modified, file.size) {
                Ok(Some(record)) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    trace!("Cache hit: {}", file.path.display());
                    return record;
                }
                Ok(None) => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => self.degrade(&e),
            }
        }

        let record = self
            .analyzer
            .analyze(&file.path, file.size, file.modified, file.created);

        // Errored records are not cached so the file is retried next run.
        if !record.is_error() {
            if let Some(cache) = self.active_cache() {
                if let Err(e) = cache.store(&record, self.session_id) {
                    self.degrade(&e);
                }
            }
        }

        record
    }
}
