//! Polled progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Snapshot of a run's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisProgress {
    pub files_processed: u64,
    pub files_total: u64,
    pub elapsed: Duration,
}

impl AnalysisProgress {
    /// Completed fraction in [0, 1]; zero before the total is known.
    pub fn fraction(&self) -> f64 {
        if self.files_total == 0 {
            0.0
        } else {
            (self.files_processed as f64 / self.files_total as f64).min(1.0)
        }
    }

    /// Calculate processing rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_processed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Shared processed-file counter. Workers increment it; callers poll it.
#[derive(Debug, Clone)]
pub struct ProgressCounter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    processed: AtomicU64,
    total: AtomicU64,
    started: Mutex<Instant>,
}

impl Default for ProgressCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                processed: AtomicU64::new(0),
                total: AtomicU64::new(0),
                started: Mutex::new(Instant::now()),
            }),
        }
    }

    /// Reset for a new run over `total` files.
    pub fn start(&self, total: u64) {
        self.inner.processed.store(0, Ordering::Relaxed);
        self.inner.total.store(total, Ordering::Relaxed);
        *self
            .inner
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn increment(&self, n: u64) {
        self.inner.processed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.inner.processed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> AnalysisProgress {
        let started = *self
            .inner
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        AnalysisProgress {
            files_processed: self.inner.processed.load(Ordering::Relaxed),
            files_total: self.inner.total.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        }
    }
}
