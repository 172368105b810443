//! Progress and cancellation handles scoped to a single run.

use smartsort_scan::{AnalysisProgress, CancellationToken, ProgressCounter};

/// Handles for one analysis run.
///
/// Clones share the same counter and token, so a UI thread can poll or
/// cancel while a worker thread runs the analysis.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    progress: ProgressCounter,
    cancel: CancellationToken,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of this run's progress.
    pub fn progress(&self) -> AnalysisProgress {
        self.progress.snapshot()
    }

    /// Stop this run at the next chunk boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn counter(&self) -> ProgressCounter {
        self.progress.clone()
    }

    /// Same token, fresh counter.
    pub(crate) fn restarted(&self) -> Self {
        Self {
            progress: ProgressCounter::new(),
            cancel: self.cancel.clone(),
        }
    }

    /// Same counter, fresh token.
    pub(crate) fn with_fresh_token(&self) -> Self {
        Self {
            progress: self.progress.clone(),
            cancel: CancellationToken::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let control = RunControl::new();
        let ui = control.clone();
        ui.cancel();
        assert!(control.is_cancelled());
        assert!(control.cancel_token().is_cancelled());

        control.counter().start(4);
        control.counter().increment(1);
        assert_eq!(ui.progress().files_processed, 1);
        assert_eq!(ui.progress().files_total, 4);
    }

    #[test]
    fn test_restart_keeps_token_and_resets_progress() {
        let control = RunControl::new();
        control.counter().start(9);
        control.counter().increment(9);

        let next = control.restarted();
        assert_eq!(next.progress().files_total, 0);
        assert_eq!(next.progress().files_processed, 0);
        control.cancel();
        assert!(next.is_cancelled());
    }
}
