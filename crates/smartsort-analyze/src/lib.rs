//! Analysis algorithms for smartsort.
//!
//! - **Fingerprinting** - BLAKE3 over the full content for small files, over
//!   size plus head and tail windows for large ones
//! - **Classification** - keyword and extension scoring with content overrides
//! - **Similarity** - weighted name, size, extension and content signals
//! - **Grouping** - exact duplicates by fingerprint and size, similar files by
//!   greedy clustering within extension buckets
//!
//! ```rust,ignore
//! use smartsort_analyze::{FileAnalyzer, Grouper};
//!
//! let analyzer = FileAnalyzer::default();
//! let records: Vec<_> = files
//!     .iter()
//!     .map(|f| analyzer.analyze(&f.path, f.size, f.modified, f.created))
//!     .collect();
//!
//! let report = Grouper::default().group(&records);
//! println!("{} exact, {} similar", report.exact.len(), report.similar.len());
//! ```

mod analyzer;
pub mod classify;
mod content;
mod fingerprint;
mod grouping;
mod naming;
mod similarity;

pub use analyzer::FileAnalyzer;
pub use classify::{CategoryScores, Classification, Classifier};
pub use content::{decode_sample, read_sample};
pub use fingerprint::{FingerprintPolicy, fingerprint, full_hash};
pub use grouping::{GroupConfig, GroupConfigBuilder, GroupReport, Grouper, choose_keeper};
pub use naming::{detect_naming_issues, name_quality, naming_score};
pub use similarity::{SimilarityScorer, SimilarityWeights, edit_similarity, similarity};
