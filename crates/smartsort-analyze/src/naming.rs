//! Name quality: the keeper score for duplicates and the naming issues
//! reported for a run.

use std::collections::BTreeSet;

use itertools::Itertools;
use smartsort_core::{FileRecord, NamingIssues};

const GENERIC_STEMS: &[&str] = &[
    "untitled", "document", "file", "image", "download", "scan", "new folder",
];

const VERSION_MARKERS: &[&str] = &["copy", "final", "draft", "old", "new", "backup", "bak"];

// Narrower than VERSION_MARKERS: "new" and "old" are too common in real names
// to count as conflicts.
const CONFLICT_MARKERS: &[&str] = &["copy", "final", "draft", "backup", "bak"];

const GENERIC_PENALTY: f64 = 0.4;
const MARKER_PENALTY: f64 = 0.15;

/// Quality of a file stem in [0, 1]. Generic names and version or copy
/// markers lower it.
pub fn name_quality(stem: &str) -> f64 {
    let lower = stem.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let mut quality = 1.0;
    if is_generic(&tokens) {
        quality -= GENERIC_PENALTY;
    }

    let mut markers: BTreeSet<&str> = tokens
        .iter()
        .copied()
        .filter(|t| VERSION_MARKERS.contains(t) || is_version_token(t))
        .collect();
    if has_counter_suffix(&lower) {
        markers.insert("(n)");
    }
    quality -= MARKER_PENALTY * markers.len() as f64;

    quality.clamp(0.0, 1.0)
}

/// `0.75 × name quality + 0.25 × classifier confidence`.
pub fn naming_score(record: &FileRecord) -> f64 {
    0.75 * name_quality(record.stem()) + 0.25 * record.type_confidence.clamp(0.0, 1.0)
}

/// Count naming problems across the records of a run and derive cleanup
/// suggestions from them.
pub fn detect_naming_issues(records: &[FileRecord]) -> NamingIssues {
    let mut issues = NamingIssues::default();
    let mut bases = Vec::with_capacity(records.len());

    for record in records {
        let lower = record.stem().to_lowercase();
        let tokens = tokenize(&lower);

        if lower.contains("untitled") {
            issues.untitled_files += 1;
        } else if is_bare_generic(&tokens) {
            issues.generic_names += 1;
        }

        let conflict = has_counter_suffix(&lower)
            || tokens
                .iter()
                .any(|t| CONFLICT_MARKERS.contains(t) || is_version_token(t));
        if conflict {
            issues.version_conflicts += 1;
        }

        bases.push(base_name(&lower, &tokens));
    }

    let counts = bases.iter().counts();
    issues.shared_base_names = bases.iter().filter(|b| counts[b] > 1).count();
    issues.suggest();
    issues
}

fn tokenize(lower: &str) -> Vec<&str> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_noise(token: &str) -> bool {
    CONFLICT_MARKERS.contains(&token)
        || is_version_token(token)
        || token.chars().all(|c| c.is_ascii_digit())
}

// "document", "Image (2)", "file_001"
fn is_bare_generic(tokens: &[&str]) -> bool {
    let meaningful = tokens.iter().copied().filter(|t| !is_noise(t)).join(" ");
    GENERIC_STEMS.contains(&meaningful.as_str())
}

// Stem with version markers and counters removed: "Report_FINAL_v2" -> "report".
fn base_name(lower: &str, tokens: &[&str]) -> String {
    let base = tokens.iter().copied().filter(|t| !is_noise(t)).join(" ");
    if base.is_empty() {
        lower.to_string()
    } else {
        base
    }
}

fn is_generic(tokens: &[&str]) -> bool {
    let Some(first) = tokens.first() else {
        return true;
    };
    GENERIC_STEMS.iter().any(|generic| match generic.split_once(' ') {
        Some((a, b)) => *first == a && tokens.get(1) == Some(&b),
        None => first == generic,
    })
}

// v2, v10
fn is_version_token(token: &str) -> bool {
    token
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

// "name (1)", "name(2)"
fn has_counter_suffix(stem: &str) -> bool {
    let mut rest = stem;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        if let Some(close) = after.find(')') {
            let inner = &after[..close];
            if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                return true;
            }
        }
        rest = after;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_clean_name() {
        assert!(approx(name_quality("quarterly_report"), 1.0));
        assert!(approx(name_quality("a"), 1.0));
    }

    #[test]
    fn test_markers_are_penalized_once_each() {
        assert!(approx(name_quality("a_copy"), 0.85));
        assert!(approx(name_quality("a_v2"), 0.85));
        assert!(approx(name_quality("report_FINAL_v2"), 0.70));
        assert!(approx(name_quality("copy copy"), 0.85));
        assert!(approx(name_quality("notes (1)"), 0.85));
    }

    #[test]
    fn test_generic_names() {
        assert!(approx(name_quality("Untitled"), 0.6));
        assert!(approx(name_quality("document_copy"), 0.45));
        // "new" is also a version marker
        assert!(approx(name_quality("New Folder"), 0.45));
        assert!(approx(name_quality("profile"), 1.0));
    }

    #[test]
    fn test_quality_is_clamped() {
        let q = name_quality("untitled copy final draft old backup v3 (2)");
        assert_eq!(q, 0.0);
    }

    fn named(name: &str) -> FileRecord {
        FileRecord::errored(format!("/d/{name}"), 0, chrono::Utc::now(), None, "unused")
    }

    #[test]
    fn test_detect_naming_issues() {
        let records: Vec<_> = [
            "Untitled.docx",
            "Untitled (1).docx",
            "document.pdf",
            "image_001.jpg",
            "report.pdf",
            "report_FINAL_v2.pdf",
            "Report copy.txt",
            "holiday_plan.txt",
            "new_york_trip.jpg",
        ]
        .into_iter()
        .map(named)
        .collect();

        let issues = detect_naming_issues(&records);
        assert_eq!(issues.untitled_files, 2);
        assert_eq!(issues.generic_names, 2);
        // Untitled (1), report_FINAL_v2, Report copy
        assert_eq!(issues.version_conflicts, 3);
        // untitled x2, report x3
        assert_eq!(issues.shared_base_names, 5);
        assert_eq!(issues.suggestions.len(), 4);
        assert_eq!(
            issues.suggestions[0].action,
            smartsort_core::CleanupAction::RenameUntitled
        );
    }

    #[test]
    fn test_clean_names_have_no_issues() {
        let records: Vec<_> = ["budget.xlsx", "holiday_plan.txt", "profile.png"]
            .into_iter()
            .map(named)
            .collect();
        let issues = detect_naming_issues(&records);
        assert!(issues.is_empty());
        assert!(issues.suggestions.is_empty());
    }

    #[test]
    fn test_version_tokens() {
        assert!(is_version_token("v2"));
        assert!(is_version_token("v10"));
        assert!(!is_version_token("v"));
        assert!(!is_version_token("video"));
    }
}
