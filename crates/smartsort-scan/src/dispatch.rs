//! Chunk dispatch over a fixed-size worker pool.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;

use smartsort_core::{AnalyzeError, FileRecord, ProcessingMethod};

use crate::chunk::Chunk;
use crate::discover::DiscoveredFile;
use crate::progress::ProgressCounter;

/// Runs with fewer files than this skip the pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10;

/// Turns one discovered file into a record. Must not fail: per-file problems
/// are expressed as `Errors` records.
pub trait FileProcessor: Sync {
    fn process(&self, file: &DiscoveredFile) -> FileRecord;
}

impl<F> FileProcessor for F
where
    F: Fn(&DiscoveredFile) -> FileRecord + Sync,
{
    fn process(&self, file: &DiscoveredFile) -> FileRecord {
        self(file)
    }
}

/// Aggregated result of dispatching a chunk plan.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Records in chunk arrival order.
    pub records: Vec<FileRecord>,
    pub chunks_completed: usize,
    /// Chunks dropped because cancellation was requested before they started.
    pub chunks_skipped: usize,
    /// Files processed by each worker, indexed by worker.
    pub files_per_worker: Vec<u64>,
    pub bytes_processed: u64,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub processing_method: ProcessingMethod,
}

enum ChunkResult {
    Done {
        id: usize,
        records: Vec<FileRecord>,
        bytes: u64,
    },
    Skipped {
        id: usize,
    },
}

/// Runs chunks on a dedicated thread pool and merges their results.
pub struct ChunkDispatcher {
    pool: ThreadPool,
    workers: usize,
    parallel_threshold: usize,
    progress: ProgressCounter,
    cancel: CancellationToken,
}

impl ChunkDispatcher {
    /// Create a dispatcher with `workers` threads.
    pub fn new(workers: usize) -> Result<Self, AnalyzeError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("smartsort-worker-{i}"))
            .build()
            .map_err(|e| AnalyzeError::WorkerPool {
                message: e.to_string(),
            })?;

        Ok(Self {
            pool,
            workers,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            progress: ProgressCounter::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Report progress through an existing counter.
    pub fn with_progress(mut self, progress: ProgressCounter) -> Self {
        self.progress = progress;
        self
    }

    /// Process runs smaller than `threshold` files serially.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Observe an existing cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn progress(&self) -> &ProgressCounter {
        &self.progress
    }

    /// Process every chunk and merge results as chunks complete.
    ///
    /// Cancellation is honoured at chunk boundaries: chunks already running
    /// finish, chunks not yet started are skipped. Runs below the parallel
    /// threshold are processed in chunk order on the calling thread.
    pub fn dispatch<P: FileProcessor>(&self, chunks: Vec<Chunk>, processor: &P) -> DispatchOutcome {
        let total_files: usize = chunks.iter().map(Chunk::len).sum();
        self.progress.start(total_files as u64);

        if total_files < self.parallel_threshold {
            tracing::debug!(files = total_files, "processing serially");
            return self.dispatch_serial(chunks, processor);
        }
        self.dispatch_parallel(chunks, processor, total_files)
    }

    fn dispatch_serial<P: FileProcessor>(&self, chunks: Vec<Chunk>, processor: &P) -> DispatchOutcome {
        let start = Instant::now();
        let mut outcome = DispatchOutcome {
            processing_method: ProcessingMethod::Serial,
            ..Default::default()
        };

        for chunk in chunks {
            if self.cancel.is_cancelled() {
                outcome.chunks_skipped += 1;
                continue;
            }
            for file in &chunk.files {
                outcome.records.push(processor.process(file));
                self.progress.increment(1);
            }
            outcome.chunks_completed += 1;
            outcome.bytes_processed += chunk.total_bytes;
        }

        outcome.cancelled = outcome.chunks_skipped > 0 || self.cancel.is_cancelled();
        outcome.files_per_worker = vec![outcome.records.len() as u64];
        outcome.elapsed = start.elapsed();
        outcome
    }

    fn dispatch_parallel<P: FileProcessor>(
        &self,
        chunks: Vec<Chunk>,
        processor: &P,
        total_files: usize,
    ) -> DispatchOutcome {
        let start = Instant::now();

        let per_worker: DashMap<usize, u64> = DashMap::new();
        let mut outcome = DispatchOutcome {
            records: Vec::with_capacity(total_files),
            processing_method: ProcessingMethod::Parallel,
            ..Default::default()
        };

        let (tx, rx) = mpsc::channel::<ChunkResult>();
        self.pool.in_place_scope(|scope| {
            for chunk in chunks {
                let tx = tx.clone();
                let per_worker = &per_worker;
                let progress = &self.progress;
                let cancel = &self.cancel;

                scope.spawn(move |_| {
                    if cancel.is_cancelled() {
                        let _ = tx.send(ChunkResult::Skipped { id: chunk.id });
                        return;
                    }

                    let mut records = Vec::with_capacity(chunk.len());
                    for file in &chunk.files {
                        records.push(processor.process(file));
                        progress.increment(1);
                    }

                    if let Some(worker) = rayon::current_thread_index() {
                        *per_worker.entry(worker).or_default() += records.len() as u64;
                    }

                    let _ = tx.send(ChunkResult::Done {
                        id: chunk.id,
                        records,
                        bytes: chunk.total_bytes,
                    });
                });
            }
            drop(tx);

            for result in rx.iter() {
                match result {
                    ChunkResult::Done { id, records, bytes } => {
                        tracing::debug!(chunk = id, files = records.len(), "chunk finished");
                        outcome.chunks_completed += 1;
                        outcome.bytes_processed += bytes;
                        outcome.records.extend(records);
                    }
                    ChunkResult::Skipped { id } => {
                        tracing::debug!(chunk = id, "chunk skipped after cancellation");
                        outcome.chunks_skipped += 1;
                    }
                }
            }
        });

        outcome.cancelled = outcome.chunks_skipped > 0 || self.cancel.is_cancelled();
        outcome.files_per_worker = (0..self.workers)
            .map(|i| per_worker.get(&i).map_or(0, |count| *count))
            .collect();
        outcome.elapsed = start.elapsed();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use smartsort_core::{Category, ContentFingerprint};

    use super::*;
    use crate::chunk::partition;

    fn files(n: usize) -> Vec<DiscoveredFile> {
        (0..n)
            .map(|i| DiscoveredFile {
                path: PathBuf::from(format!("/d/file{i}.txt")),
                size: (i % 7) as u64 * 100,
                modified: Utc::now(),
                created: None,
                error: None,
            })
            .collect()
    }

    fn fake_record(file: &DiscoveredFile) -> FileRecord {
        FileRecord {
            path: file.path.clone(),
            filename: file.path.file_name().unwrap().to_string_lossy().as_ref().into(),
            extension: ".txt".into(),
            size_bytes: file.size,
            created_at: file.created,
            modified_at: file.modified,
            content_fingerprint: ContentFingerprint::new("x"),
            detected_category: Category::School,
            type_confidence: 1.0 / 3.0,
            content_sample: String::new(),
            error: None,
        }
    }

    #[test]
    fn test_dispatch_aggregates_every_file() {
        let chunks = partition(files(150), 100);
        assert!(chunks.len() >= 2);

        let dispatcher = ChunkDispatcher::new(4).unwrap();
        let outcome = dispatcher.dispatch(chunks.clone(), &fake_record);

        assert_eq!(outcome.records.len(), 150);
        assert_eq!(outcome.chunks_completed, chunks.len());
        assert_eq!(outcome.chunks_skipped, 0);
        assert!(!outcome.cancelled);
        assert_eq!(outcome.files_per_worker.len(), 4);
        assert_eq!(outcome.files_per_worker.iter().sum::<u64>(), 150);
        assert_eq!(dispatcher.progress().processed(), 150);
    }

    #[test]
    fn test_cancelled_before_start_skips_everything() {
        let chunks = partition(files(20), 5);
        let n = chunks.len();

        let token = CancellationToken::new();
        token.cancel();
        let dispatcher = ChunkDispatcher::new(2).unwrap().with_cancellation(token);
        let outcome = dispatcher.dispatch(chunks, &fake_record);

        assert!(outcome.cancelled);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.chunks_skipped, n);
    }

    #[test]
    fn test_cancel_mid_run_finishes_in_flight_chunks() {
        let chunks = partition(files(40), 1);
        let token = CancellationToken::new();
        let dispatcher = ChunkDispatcher::new(1)
            .unwrap()
            .with_cancellation(token.clone());

        let seen = AtomicUsize::new(0);
        let processor = |file: &DiscoveredFile| {
            if seen.fetch_add(1, Ordering::SeqCst) == 2 {
                token.cancel();
            }
            fake_record(file)
        };
        let outcome = dispatcher.dispatch(chunks, &processor);

        assert!(outcome.cancelled);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.chunks_completed + outcome.chunks_skipped, 40);
    }

    #[test]
    fn test_small_runs_are_processed_serially() {
        let chunks = partition(files(5), 2);
        let dispatcher = ChunkDispatcher::new(4).unwrap();
        let caller = std::thread::current().id();

        let processor = |file: &DiscoveredFile| {
            assert_eq!(std::thread::current().id(), caller);
            fake_record(file)
        };
        let outcome = dispatcher.dispatch(chunks, &processor);

        assert_eq!(outcome.processing_method, ProcessingMethod::Serial);
        assert_eq!(outcome.records.len(), 5);
        assert_eq!(outcome.files_per_worker, vec![5]);
        assert_eq!(dispatcher.progress().processed(), 5);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_threshold_switches_to_pool() {
        let dispatcher = ChunkDispatcher::new(2).unwrap();
        let outcome = dispatcher.dispatch(partition(files(10), 4), &fake_record);
        assert_eq!(outcome.processing_method, ProcessingMethod::Parallel);
        assert_eq!(outcome.records.len(), 10);

        let serial = ChunkDispatcher::new(2)
            .unwrap()
            .with_parallel_threshold(11)
            .dispatch(partition(files(10), 4), &fake_record);
        assert_eq!(serial.processing_method, ProcessingMethod::Serial);
        assert_eq!(serial.records.len(), 10);
    }

    #[test]
    fn test_cancelled_serial_run_skips_chunks() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = ChunkDispatcher::new(2)
            .unwrap()
            .with_cancellation(token)
            .dispatch(partition(files(3), 1), &fake_record);

        assert!(outcome.cancelled);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.chunks_skipped, 3);
    }
}
