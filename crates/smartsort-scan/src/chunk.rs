//! Size-aware partitioning of discovered files into chunks.

use std::cmp::Reverse;

use crate::discover::DiscoveredFile;

/// A bounded unit of parallel work.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: usize,
    pub files: Vec<DiscoveredFile>,
    pub total_bytes: u64,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Split files into chunks bounded by `max_files` and by a byte target of
/// `total_bytes / ceil(n / max_files)`.
///
/// Files are packed largest first, so one huge file closes its chunk early
/// instead of starving a chunk of many small files. Never yields an empty
/// chunk.
pub fn partition(mut files: Vec<DiscoveredFile>, max_files: usize) -> Vec<Chunk> {
    if files.is_empty() {
        return Vec::new();
    }
    let max_files = max_files.max(1);

    files.sort_by(|a, b| {
        Reverse(a.size)
            .cmp(&Reverse(b.size))
            .then_with(|| a.path.cmp(&b.path))
    });

    let total: u64 = files.iter().map(|f| f.size).sum();
    let planned = files.len().div_ceil(max_files) as u64;
    let target = total / planned;

    let mut chunks = Vec::with_capacity(planned as usize);
    let mut current: Vec<DiscoveredFile> = Vec::new();
    let mut current_bytes = 0u64;

    for file in files {
        let full = current.len() >= max_files;
        let over = current_bytes.saturating_add(file.size) > target;
        if !current.is_empty() && (full || over) {
            chunks.push(Chunk {
                id: chunks.len(),
                files: std::mem::take(&mut current),
                total_bytes: current_bytes,
            });
            current_bytes = 0;
        }
        current_bytes += file.size;
        current.push(file);
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            id: chunks.len(),
            files: current,
            total_bytes: current_bytes,
        });
    }

    tracing::debug!(
        chunks = chunks.len(),
        target_bytes = target,
        "partitioned files"
    );

    chunks
}
