//! File discovery and chunked parallel dispatch for smartsort.
//!
//! - **Discovery** via jwalk, skipping hidden entries and ignore globs
//! - **Partitioning** into chunks bounded by file count and cumulative size
//! - **Dispatch** of chunks to a fixed-size rayon pool, with results merged
//!   in arrival order; small runs stay on the calling thread
//! - **Progress** as a polled, atomically incremented counter
//! - **Cancellation** at chunk boundaries through a `CancellationToken`
//!
//! # Example
//!
//! ```rust,no_run
//! use smartsort_core::{AnalyzeConfig, FileRecord};
//! use smartsort_scan::{ChunkDispatcher, DiscoveredFile, Discoverer, partition};
//!
//! let config = AnalyzeConfig::default();
//! let discovery = Discoverer::new(&config)?.discover("/path/to/dir".as_ref())?;
//! let chunks = partition(discovery.files, config.max_chunk_files);
//!
//! let dispatcher = ChunkDispatcher::new(config.effective_workers())?;
//! let outcome = dispatcher.dispatch(chunks, &|file: &DiscoveredFile| {
//!     FileRecord::errored(&file.path, file.size, file.modified, file.created, "skipped")
//! });
//! println!("processed {} files", outcome.records.len());
//! # Ok::<(), smartsort_core::AnalyzeError>(())
//! ```

mod chunk;
mod discover;
mod dispatch;
mod progress;

pub use chunk::{Chunk, partition};
pub use discover::{DiscoveredFile, Discoverer, Discovery, ValidatedDirectory, validate_root};
pub use dispatch::{ChunkDispatcher, DEFAULT_PARALLEL_THRESHOLD, DispatchOutcome, FileProcessor};
pub use progress::{AnalysisProgress, ProgressCounter};

pub use tokio_util::sync::CancellationToken;
