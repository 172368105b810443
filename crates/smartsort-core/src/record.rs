//! Per-file analysis records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Category assigned to a file.
///
/// Declaration order is significant: the classifier breaks score ties in
/// favour of the category declared first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    School,
    Work,
    Financial,
    Personal,
    Media,
    Code,
    Resume,
    /// No category scored above zero.
    Uncategorized,
    /// The file could not be analyzed.
    Errors,
}

impl Category {
    /// Categories that can be chosen by scoring, in tie-break order.
    pub const SCORED: [Category; 7] = [
        Category::School,
        Category::Work,
        Category::Financial,
        Category::Personal,
        Category::Media,
        Category::Code,
        Category::Resume,
    ];

    /// Position of this category in the scored table, if it is scorable.
    pub fn scored_index(self) -> Option<usize> {
        Self::SCORED.iter().position(|c| *c == self)
    }

    /// Textual tag used in storage and output.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Content-derived signature used for duplicate detection.
///
/// Hex-encoded BLAKE3 output. Deterministic for a given content and size,
/// independent of the file's path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Wrap an already-encoded fingerprint.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Build a fingerprint from a BLAKE3-sized digest.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Fingerprint of a record that could not be read.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if no fingerprint was computed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Analysis result for a single discovered file.
///
/// Records are never mutated after creation; re-analysis produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Absolute location.
    pub path: PathBuf,
    /// File name component.
    pub filename: CompactString,
    /// Lowercased extension with leading dot, empty if none.
    pub extension: CompactString,
    pub size_bytes: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: DateTime<Utc>,
    pub content_fingerprint: ContentFingerprint,
    pub detected_category: Category,
    /// Classifier confidence in [0, 1].
    pub type_confidence: f64,
    /// Leading decoded text, empty for binary or unreadable files.
    pub content_sample: String,
    /// Failure message for `Errors` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileRecord {
    /// Create an `Errors` record for a file that could not be analyzed.
    pub fn errored(
        path: impl Into<PathBuf>,
        size_bytes: u64,
        modified_at: DateTime<Utc>,
        created_at: Option<DateTime<Utc>>,
        message: impl Into<String>,
    ) -> Self {
        let path = path.into();
        Self {
            filename: filename_of(&path),
            extension: extension_of(&path),
            path,
            size_bytes,
            created_at,
            modified_at,
            content_fingerprint: ContentFingerprint::empty(),
            detected_category: Category::Errors,
            type_confidence: 0.0,
            content_sample: String::new(),
            error: Some(message.into()),
        }
    }

    /// Check if this record represents a failed analysis.
    pub fn is_error(&self) -> bool {
        self.detected_category == Category::Errors
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        let name = self.filename.as_str();
        match name.len().checked_sub(self.extension.len()) {
            Some(cut) if !self.extension.is_empty() && name.is_char_boundary(cut) => &name[..cut],
            _ => name,
        }
    }
}

/// Lowercased extension of a path with its leading dot, or empty.
pub fn extension_of(path: &Path) -> CompactString {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => {
            let mut out = CompactString::with_capacity(ext.len() + 1);
            out.push('.');
            out.push_str(&ext.to_lowercase());
            out
        }
        _ => CompactString::default(),
    }
}

pub(crate) fn filename_of(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::from(n.to_string_lossy().as_ref()))
        .unwrap_or_default()
}
