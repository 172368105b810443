//! Exact-duplicate and similar-file grouping.
//!
//! Runs once over the full aggregated record set, in two passes:
//!
//! 1. **Exact**: bucket by fingerprint and size. Buckets of sampled
//!    fingerprints are re-hashed in full and split by the full hash when
//!    verification is on.
//! 2. **Similar**: bucket by extension and cluster greedily by pairwise
//!    similarity. Clustering is order dependent: a different input order can
//!    produce a different, equally valid partition.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

use derive_builder::Builder;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use smartsort_core::{
    AnalyzeConfig, ContentFingerprint, DEFAULT_SAMPLE_THRESHOLD, DuplicateGroup, FileRecord,
    GroupKind,
};

use crate::fingerprint::full_hash;
use crate::naming::naming_score;
use crate::similarity::{SimilarityScorer, SimilarityWeights};

/// Configuration for grouping.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct GroupConfig {
    /// Minimum pairwise similarity (inclusive) for linking two files.
    #[builder(default = "0.7")]
    pub similarity_threshold: f64,

    /// Size at which fingerprints are sampled rather than full.
    #[builder(default = "DEFAULT_SAMPLE_THRESHOLD")]
    pub sample_threshold: u64,

    /// Re-hash sampled buckets in full before reporting them as exact.
    #[builder(default = "true")]
    pub verify_sampled: bool,

    /// Confidence reported for sampled buckets that were not verified.
    #[builder(default = "0.9")]
    pub unverified_confidence: f64,

    /// Signal weights for the similarity scorer.
    #[builder(default)]
    pub weights: SimilarityWeights,
}

impl GroupConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("unverified_confidence", self.unverified_confidence),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(format!("{name} must be within [0, 1], got {v}"));
                }
            }
        }
        Ok(())
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            sample_threshold: DEFAULT_SAMPLE_THRESHOLD,
            verify_sampled: true,
            unverified_confidence: 0.9,
            weights: SimilarityWeights::default(),
        }
    }
}

impl GroupConfig {
    /// Create a new config builder.
    pub fn builder() -> GroupConfigBuilder {
        GroupConfigBuilder::default()
    }

    pub fn from_config(config: &AnalyzeConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            sample_threshold: config.sample_threshold,
            verify_sampled: config.verify_sampled_duplicates,
            ..Self::default()
        }
    }
}

/// Output of a grouping run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupReport {
    /// Exact groups, largest wasted space first.
    pub exact: Vec<DuplicateGroup>,
    /// Similar groups, highest confidence first.
    pub similar: Vec<DuplicateGroup>,
}

impl GroupReport {
    /// Check if any group was found.
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.similar.is_empty()
    }

    /// Total reclaimable bytes across all groups.
    pub fn total_wasted_bytes(&self) -> u64 {
        self.exact
            .iter()
            .chain(&self.similar)
            .map(|g| g.wasted_bytes)
            .sum()
    }

    /// All groups, exact first.
    pub fn into_groups(self) -> Vec<DuplicateGroup> {
        let mut groups = self.exact;
        groups.extend(self.similar);
        groups
    }
}

/// Partitions records into exact and similar groups.
#[derive(Debug, Clone, Default)]
pub struct Grouper {
    config: GroupConfig,
    scorer: SimilarityScorer,
}

impl Grouper {
    pub fn new(config: GroupConfig) -> Self {
        let scorer = SimilarityScorer::new(config.weights);
        Self { config, scorer }
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Group a full record set.
    pub fn group(&self, records: &[FileRecord]) -> GroupReport {
        let exact = self.exact_groups(records);

        let shadowed: HashSet<&Path> = exact
            .iter()
            .flat_map(|g| g.redundant().map(|m| m.path.as_path()))
            .collect();
        let similar = self.similar_groups(records, &shadowed);

        tracing::debug!(
            exact = exact.len(),
            similar = similar.len(),
            "grouping finished"
        );

        GroupReport { exact, similar }
    }

    fn exact_groups(&self, records: &[FileRecord]) -> Vec<DuplicateGroup> {
        let mut buckets: HashMap<(&ContentFingerprint, u64), Vec<&FileRecord>> = HashMap::new();
        for record in records {
            if record.is_error() || record.content_fingerprint.is_empty() {
                continue;
            }
            buckets
                .entry((&record.content_fingerprint, record.size_bytes))
                .or_default()
                .push(record);
        }
        buckets.retain(|_, members| members.len() > 1);

        let mut groups: Vec<DuplicateGroup> = buckets
            .into_par_iter()
            .flat_map_iter(|((fingerprint, size), members)| {
                self.resolve_exact_bucket(fingerprint, size, members)
            })
            .collect();

        groups.sort_by(|a, b| {
            b.wasted_bytes
                .cmp(&a.wasted_bytes)
                .then_with(|| a.signature.cmp(&b.signature))
        });
        groups
    }

    fn resolve_exact_bucket(
        &self,
        fingerprint: &ContentFingerprint,
        size: u64,
        members: Vec<&FileRecord>,
    ) -> Vec<DuplicateGroup> {
        if size < self.config.sample_threshold {
            return exact_group(fingerprint.as_str(), members, 1.0)
                .into_iter()
                .collect();
        }

        if !self.config.verify_sampled {
            return exact_group(
                fingerprint.as_str(),
                members,
                self.config.unverified_confidence,
            )
            .into_iter()
            .collect();
        }

        let hashed: Vec<(ContentFingerprint, &FileRecord)> = members
            .par_iter()
            .filter_map(|record| match full_hash(&record.path) {
                Ok(hash) => Some((hash, *record)),
                Err(e) => {
                    tracing::debug!(path = %record.path.display(), error = %e, "verification hash failed");
                    None
                }
            })
            .collect();

        let mut verified: HashMap<ContentFingerprint, Vec<&FileRecord>> = HashMap::new();
        for (hash, record) in hashed {
            verified.entry(hash).or_default().push(record);
        }

        verified
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .filter_map(|(hash, members)| exact_group(hash.as_str(), members, 1.0))
            .collect()
    }

    fn similar_groups(
        &self,
        records: &[FileRecord],
        shadowed: &HashSet<&Path>,
    ) -> Vec<DuplicateGroup> {
        let mut buckets: BTreeMap<&str, Vec<&FileRecord>> = BTreeMap::new();
        for record in records {
            if record.is_error() || shadowed.contains(record.path.as_path()) {
                continue;
            }
            buckets
                .entry(record.extension.as_str())
                .or_default()
                .push(record);
        }

        let mut groups = Vec::new();
        for bucket in buckets.values().filter(|b| b.len() > 1) {
            for cluster in self.cluster(bucket) {
                groups.extend(self.similar_group(cluster));
            }
        }

        groups.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.signature.cmp(&b.signature))
        });
        groups
    }

    /// Greedy single-linkage clustering. A file joins the first cluster that
    /// reaches it and is never reconsidered.
    fn cluster<'a>(&self, bucket: &[&'a FileRecord]) -> Vec<Vec<&'a FileRecord>> {
        let threshold = self.config.similarity_threshold;
        let mut assigned = vec![false; bucket.len()];
        let mut clusters = Vec::new();

        for seed in 0..bucket.len() {
            if assigned[seed] {
                continue;
            }
            assigned[seed] = true;

            let mut cluster = vec![bucket[seed]];
            let mut frontier = VecDeque::from([seed]);
            while let Some(current) = frontier.pop_front() {
                for candidate in 0..bucket.len() {
                    if assigned[candidate] {
                        continue;
                    }
                    if self.scorer.score(bucket[current], bucket[candidate]) >= threshold {
                        assigned[candidate] = true;
                        cluster.push(bucket[candidate]);
                        frontier.push_back(candidate);
                    }
                }
            }

            if cluster.len() > 1 {
                clusters.push(cluster);
            }
        }

        clusters
    }

    fn similar_group(&self, members: Vec<&FileRecord>) -> Option<DuplicateGroup> {
        let keeper = choose_keeper(&members)?;
        let pairs: Vec<f64> = members
            .iter()
            .tuple_combinations()
            .map(|(a, b)| self.scorer.score(a, b))
            .collect();
        let confidence = if pairs.is_empty() {
            0.0
        } else {
            pairs.iter().sum::<f64>() / pairs.len() as f64
        };

        let signature = {
            let joined = members
                .iter()
                .map(|m| m.path.to_string_lossy())
                .sorted()
                .join("\n");
            format!("sim-{}", blake3::hash(joined.as_bytes()).to_hex())
        };

        let total: u64 = members.iter().map(|m| m.size_bytes).sum();
        let wasted_bytes = total.saturating_sub(keeper.size_bytes);
        let recommended_action = format!(
            "Review {} similar files; keep {}",
            members.len(),
            keeper.filename
        );

        Some(DuplicateGroup {
            signature,
            kind: GroupKind::Similar,
            keeper: keeper.path.clone(),
            members: members.into_iter().cloned().collect(),
            confidence: confidence.clamp(0.0, 1.0),
            recommended_action,
            wasted_bytes,
        })
    }
}

fn exact_group(
    signature: &str,
    members: Vec<&FileRecord>,
    confidence: f64,
) -> Option<DuplicateGroup> {
    let keeper = choose_keeper(&members)?;
    let size = keeper.size_bytes;
    let wasted_bytes = size * (members.len() as u64 - 1);
    let recommended_action = format!(
        "Keep {}; delete {} identical {}",
        keeper.filename,
        members.len() - 1,
        if members.len() == 2 { "copy" } else { "copies" }
    );

    Some(DuplicateGroup {
        signature: signature.to_owned(),
        kind: GroupKind::Exact,
        keeper: keeper.path.clone(),
        members: members.into_iter().cloned().collect(),
        confidence,
        recommended_action,
        wasted_bytes,
    })
}

/// Best-named member, then most recently modified, then smallest path.
/// `None` only for an empty slice.
pub fn choose_keeper<'a>(members: &[&'a FileRecord]) -> Option<&'a FileRecord> {
    let scored: Vec<(f64, &FileRecord)> = members.iter().map(|m| (naming_score(m), *m)).collect();
    scored
        .into_iter()
        .max_by(|(sa, a), (sb, b)| {
            sa.total_cmp(sb)
                .then_with(|| a.modified_at.cmp(&b.modified_at))
                .then_with(|| b.path.cmp(&a.path))
        })
        .map(|(_, m)| m)
}
