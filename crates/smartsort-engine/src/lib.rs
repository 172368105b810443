//! Entry points of the smartsort analysis pipeline.
//!
//! [`AnalysisEngine::analyze_directory`] validates a directory, discovers its
//! files, analyzes them in parallel chunks (reading through the result cache
//! when enabled), groups exact and similar duplicates, and records the
//! session. History queries read back what earlier runs recorded.
//!
//! Each run reports progress and observes cancellation through a
//! [`RunControl`].

mod control;
mod engine;
mod processor;

pub use control::RunControl;
pub use engine::{AnalysisEngine, AnalysisReport};

pub use smartsort_cache::CacheError;
pub use smartsort_scan::{AnalysisProgress, CancellationToken, ValidatedDirectory};
