//! Core types and configuration for smartsort.
//!
//! This crate provides the data model shared by every stage of the analysis
//! pipeline: per-file records, duplicate groups, analysis sessions, the run
//! configuration and the error types.

mod config;
mod error;
mod group;
mod issues;
mod record;
mod session;

pub use config::{AnalyzeConfig, AnalyzeConfigBuilder, DEFAULT_SAMPLE_THRESHOLD};
pub use error::{AnalyzeError, DiscoveryWarning, WarningKind};
pub use group::{DuplicateGroup, GroupKind};
pub use issues::{CleanupAction, CleanupSuggestion, NamingIssues, SuggestionPriority};
pub use record::{Category, ContentFingerprint, FileRecord, extension_of};
pub use session::{
    AnalysisSession, PendingSession, PerformanceMetrics, ProcessingMethod, SessionId,
    SessionStatus, SessionSummary,
};
