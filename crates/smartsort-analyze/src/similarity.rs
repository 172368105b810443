//! Pairwise similarity between file records.

use smartsort_core::FileRecord;

/// Number of leading sample characters compared by the content signal.
pub const CONTENT_PREFIX_CHARS: usize = 200;

/// Weight of each similarity signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub name: f64,
    pub size: f64,
    pub extension: f64,
    pub content: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            name: 0.4,
            size: 0.2,
            extension: 0.1,
            content: 0.3,
        }
    }
}

/// Weighted similarity over name, size, extension and content signals.
///
/// Signals that cannot be computed for a pair are dropped and the remaining
/// weights renormalized, so scores stay in [0, 1]. Scores are symmetric.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer {
    weights: SimilarityWeights,
}

impl SimilarityScorer {
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &SimilarityWeights {
        &self.weights
    }

    pub fn score(&self, a: &FileRecord, b: &FileRecord) -> f64 {
        let mut total = 0.0;
        let mut applied = 0.0;
        let mut apply = |score: f64, weight: f64| {
            total += score * weight;
            applied += weight;
        };

        apply(
            edit_similarity(&a.filename.to_lowercase(), &b.filename.to_lowercase()),
            self.weights.name,
        );

        if a.size_bytes > 0 && b.size_bytes > 0 {
            let (lo, hi) = if a.size_bytes <= b.size_bytes {
                (a.size_bytes, b.size_bytes)
            } else {
                (b.size_bytes, a.size_bytes)
            };
            apply(lo as f64 / hi as f64, self.weights.size);
        }

        apply(
            if a.extension == b.extension { 1.0 } else { 0.0 },
            self.weights.extension,
        );

        if !a.content_sample.is_empty() && !b.content_sample.is_empty() {
            apply(
                edit_similarity(
                    content_prefix(&a.content_sample),
                    content_prefix(&b.content_sample),
                ),
                self.weights.content,
            );
        }

        if applied > 0.0 {
            (total / applied).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Similarity of two records with the default weights.
pub fn similarity(a: &FileRecord, b: &FileRecord) -> f64 {
    SimilarityScorer::default().score(a, b)
}

/// `1 - levenshtein / max_len` over Unicode scalar values. Two empty strings
/// are identical.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Edit distance with unit costs, two rows of state.
pub fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn content_prefix(sample: &str) -> &str {
    match sample.char_indices().nth(CONTENT_PREFIX_CHARS) {
        Some((idx, _)) => &sample[..idx],
        None => sample,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        let d = |a: &str, b: &str| {
            levenshtein(
                &a.chars().collect::<Vec<_>>(),
                &b.chars().collect::<Vec<_>>(),
            )
        };
        assert_eq!(d("kitten", "sitting"), 3);
        assert_eq!(d("", "abc"), 3);
        assert_eq!(d("abc", ""), 3);
        assert_eq!(d("same", "same"), 0);
        assert_eq!(d("héllo", "hello"), 1);
    }

    #[test]
    fn test_edit_similarity() {
        assert_eq!(edit_similarity("", ""), 1.0);
        assert_eq!(edit_similarity("abc", "abc"), 1.0);
        assert_eq!(edit_similarity("abc", "xyz"), 0.0);
        assert!((edit_similarity("abcd", "abce") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_content_prefix() {
        let long = "é".repeat(300);
        assert_eq!(content_prefix(&long).chars().count(), CONTENT_PREFIX_CHARS);
        assert_eq!(content_prefix("short"), "short");
    }
}
