//! Duplicate and similar-file groups.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::record::FileRecord;

/// How members of a group relate to each other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupKind {
    /// Same fingerprint and same size.
    Exact,
    /// Pairwise similarity at or above the configured threshold.
    Similar,
}

/// A set of files believed to hold redundant content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    /// Fingerprint for exact groups, synthetic key for similar groups.
    pub signature: String,
    pub kind: GroupKind,
    /// At least two members. Order is insignificant.
    pub members: Vec<FileRecord>,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Directive naming the file to keep.
    pub recommended_action: String,
    /// Member recommended for keeping.
    pub keeper: PathBuf,
    /// Bytes reclaimable by removing every member but the keeper.
    pub wasted_bytes: u64,
}

impl DuplicateGroup {
    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if this is an exact-duplicate group.
    pub fn is_exact(&self) -> bool {
        self.kind == GroupKind::Exact
    }

    /// Combined size of all members.
    pub fn total_bytes(&self) -> u64 {
        self.members.iter().map(|m| m.size_bytes).sum()
    }

    /// Members other than the keeper.
    pub fn redundant(&self) -> impl Iterator<Item = &FileRecord> {
        self.members.iter().filter(move |m| m.path != self.keeper)
    }

    /// Check if a path belongs to this group.
    pub fn contains(&self, path: &std::path::Path) -> bool {
        self.members.iter().any(|m| m.path == path)
    }
}
