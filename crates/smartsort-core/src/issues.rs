//! Naming problems found across the files of a run.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How urgently a cleanup suggestion should be handled.
///
/// Ordered so that sorting ascending puts `High` first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

/// What a cleanup suggestion asks the user to do.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CleanupAction {
    RenameUntitled,
    RenameGeneric,
    ConsolidateVersions,
    ReviewSharedNames,
}

/// One suggested cleanup step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSuggestion {
    pub priority: SuggestionPriority,
    pub action: CleanupAction,
    pub description: String,
    pub affected_files: usize,
}

/// Counts of naming problems, with suggestions ordered by priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamingIssues {
    /// Names containing "untitled".
    pub untitled_files: usize,
    /// Names made only of a generic word such as "document" or "image".
    pub generic_names: usize,
    /// Names carrying version or copy markers ("final", "v2", "copy", "(1)").
    pub version_conflicts: usize,
    /// Files whose base name, markers removed, is shared with another file.
    pub shared_base_names: usize,
    pub suggestions: Vec<CleanupSuggestion>,
}

impl NamingIssues {
    pub fn is_empty(&self) -> bool {
        self.untitled_files == 0
            && self.generic_names == 0
            && self.version_conflicts == 0
            && self.shared_base_names == 0
    }

    /// Build the suggestion list from the counts, highest priority first.
    pub fn suggest(&mut self) {
        let mut suggestions = Vec::new();
        if self.untitled_files > 0 {
            suggestions.push(CleanupSuggestion {
                priority: SuggestionPriority::High,
                action: CleanupAction::RenameUntitled,
                description: format!("Rename {} 'Untitled' files", self.untitled_files),
                affected_files: self.untitled_files,
            });
        }
        if self.version_conflicts > 0 {
            suggestions.push(CleanupSuggestion {
                priority: SuggestionPriority::Medium,
                action: CleanupAction::ConsolidateVersions,
                description: format!(
                    "Review {} files with version conflicts",
                    self.version_conflicts
                ),
                affected_files: self.version_conflicts,
            });
        }
        if self.generic_names > 0 {
            suggestions.push(CleanupSuggestion {
                priority: SuggestionPriority::Medium,
                action: CleanupAction::RenameGeneric,
                description: format!(
                    "Give {} generically named files descriptive names",
                    self.generic_names
                ),
                affected_files: self.generic_names,
            });
        }
        if self.shared_base_names > 0 {
            suggestions.push(CleanupSuggestion {
                priority: SuggestionPriority::Low,
                action: CleanupAction::ReviewSharedNames,
                description: format!(
                    "Compare {} files that share a base name",
                    self.shared_base_names
                ),
                affected_files: self.shared_base_names,
            });
        }
        suggestions.sort_by_key(|s| s.priority);
        self.suggestions = suggestions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestions_follow_counts_and_priority() {
        let mut issues = NamingIssues {
            shared_base_names: 4,
            untitled_files: 2,
            version_conflicts: 3,
            ..Default::default()
        };
        issues.suggest();

        let actions: Vec<_> = issues.suggestions.iter().map(|s| s.action).collect();
        assert_eq!(
            actions,
            vec![
                CleanupAction::RenameUntitled,
                CleanupAction::ConsolidateVersions,
                CleanupAction::ReviewSharedNames,
            ]
        );
        assert_eq!(issues.suggestions[0].affected_files, 2);
        assert_eq!(issues.suggestions[0].priority, SuggestionPriority::High);
    }

    #[test]
    fn test_no_issues_no_suggestions() {
        let mut issues = NamingIssues::default();
        issues.suggest();
        assert!(issues.is_empty());
        assert!(issues.suggestions.is_empty());
    }
}
