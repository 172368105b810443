//! Rule-based file classification.
//!
//! Each scorable [`Category`] owns a rule of filename keywords and extensions.
//! A category scores 2 per keyword found in the lowercase filename plus 1 if
//! the extension is listed. The highest score wins, with ties going to the
//! category declared first. Text-like files get a second pass over their
//! content sample; a triggered content rule overrides the filename result.

use serde::{Deserialize, Serialize};

use smartsort_core::Category;

/// Score added per filename keyword hit.
pub const KEYWORD_WEIGHT: u32 = 2;
/// Score added for an extension match.
pub const EXTENSION_WEIGHT: u32 = 1;
/// Fixed normalization constant for confidence.
pub const CONFIDENCE_SCALE: f64 = 3.0;

/// Extensions whose content sample is inspected by content rules.
pub const TEXT_LIKE_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".rtf", ".csv", ".log", ".json", ".xml", ".yaml", ".yml", ".html", ".htm",
    ".pdf", ".docx", ".doc",
];

/// Filename keywords and extensions for one category.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
    pub extensions: &'static [&'static str],
}

/// Content markers that identify a category from a text sample.
#[derive(Debug, Clone)]
pub struct ContentRule {
    pub category: Category,
    /// Lowercase phrases searched for in the lowercase sample.
    pub markers: &'static [&'static str],
    /// Distinct markers required to trigger.
    pub min_hits: usize,
}

impl ContentRule {
    /// Number of distinct markers present in a lowercase sample.
    pub fn hits(&self, lowercase_sample: &str) -> usize {
        self.markers
            .iter()
            .filter(|m| lowercase_sample.contains(*m))
            .count()
    }
}

/// Rule table in tie-break order.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::School,
        keywords: &[
            "homework", "assignment", "essay", "study", "notes", "midterm", "final", "quiz",
        ],
        extensions: &[".pdf", ".docx", ".txt"],
    },
    CategoryRule {
        category: Category::Work,
        keywords: &["meeting", "presentation", "report", "proposal", "contract", "budget"],
        extensions: &[".pptx", ".xlsx", ".pdf", ".docx"],
    },
    CategoryRule {
        category: Category::Financial,
        keywords: &["invoice", "receipt", "bill", "tax", "statement", "payment", "bank"],
        extensions: &[".pdf", ".jpg", ".png"],
    },
    CategoryRule {
        category: Category::Personal,
        keywords: &["vacation", "family", "birthday", "wedding", "photo", "memory"],
        extensions: &[".jpg", ".png", ".mp4", ".mov"],
    },
    CategoryRule {
        category: Category::Media,
        keywords: &["photo", "video", "music", "image", "screenshot"],
        extensions: &[".jpg", ".png", ".mp4", ".mp3", ".mov", ".avi"],
    },
    CategoryRule {
        category: Category::Code,
        keywords: &["script", "app", "main", "index", "component"],
        extensions: &[".py", ".js", ".ts", ".html", ".css", ".java", ".cpp", ".c", ".rs"],
    },
    CategoryRule {
        category: Category::Resume,
        keywords: &["resume", "curriculum", "vitae", "cv"],
        extensions: &[],
    },
];

/// Content rules, evaluated in order; the first to trigger wins.
pub const CONTENT_RULES: &[ContentRule] = &[
    ContentRule {
        category: Category::Resume,
        markers: &[
            "experience",
            "employment history",
            "education",
            "skills",
            "qualifications",
            "objective",
            "core competencies",
            "about me",
            "bachelor",
            "university",
        ],
        min_hits: 2,
    },
    ContentRule {
        category: Category::Code,
        markers: &[
            "def ",
            "function ",
            "class ",
            "import ",
            "#include",
            "int main",
            "console.log",
            "return ",
            "<?php",
            "<!doctype",
            "<html",
            "<script",
        ],
        min_hits: 2,
    },
];

/// Per-category scores, indexed like [`Category::SCORED`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores([u32; Category::SCORED.len()]);

impl CategoryScores {
    /// Score for a category; zero for categories that are never scored.
    pub fn get(&self, category: Category) -> u32 {
        category.scored_index().map_or(0, |i| self.0[i])
    }

    fn add(&mut self, category: Category, amount: u32) {
        if let Some(i) = category.scored_index() {
            self.0[i] += amount;
        }
    }

    /// Check if no category scored.
    pub fn all_zero(&self) -> bool {
        self.0.iter().all(|s| *s == 0)
    }

    /// Highest-scoring category, earliest declared on ties.
    pub fn best(&self) -> Option<(Category, u32)> {
        let mut best: Option<(Category, u32)> = None;
        for (category, score) in self.iter() {
            if score > 0 && best.is_none_or(|(_, s)| score > s) {
                best = Some((category, score));
            }
        }
        best
    }

    /// Iterate `(category, score)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::SCORED.iter().copied().zip(self.0.iter().copied())
    }
}

/// Result of classifying one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    /// Always within [0, 1].
    pub confidence: f64,
    pub scores: CategoryScores,
}

/// Stateless classifier over fixed rule tables.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: &'static [CategoryRule],
    content_rules: &'static [ContentRule],
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            rules: CATEGORY_RULES,
            content_rules: CONTENT_RULES,
        }
    }

    /// Classify a file from its name, lowercase dotted extension and text sample.
    pub fn classify(&self, filename: &str, extension: &str, content_sample: &str) -> Classification {
        let name = filename.to_lowercase();
        let mut scores = CategoryScores::default();

        for rule in self.rules {
            let keyword_hits = rule.keywords.iter().filter(|k| name.contains(*k)).count() as u32;
            let extension_hit = rule.extensions.contains(&extension);
            scores.add(
                rule.category,
                KEYWORD_WEIGHT * keyword_hits + if extension_hit { EXTENSION_WEIGHT } else { 0 },
            );
        }

        if is_text_like(extension) && !content_sample.is_empty() {
            let sample = content_sample.to_lowercase();
            for rule in self.content_rules {
                let hits = rule.hits(&sample);
                if hits >= rule.min_hits {
                    scores.add(rule.category, hits as u32);
                    return Classification {
                        category: rule.category,
                        confidence: normalize(hits as u32),
                        scores,
                    };
                }
            }
        }

        match scores.best() {
            Some((category, score)) => Classification {
                category,
                confidence: normalize(score),
                scores,
            },
            None => Classification {
                category: Category::Uncategorized,
                confidence: 0.0,
                scores,
            },
        }
    }
}

/// Check if an extension's content is inspected by content rules.
pub fn is_text_like(extension: &str) -> bool {
    TEXT_LIKE_EXTENSIONS.contains(&extension)
}

fn normalize(score: u32) -> f64 {
    (score as f64 / CONFIDENCE_SCALE).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_and_extension_scoring() {
        let c = Classifier::new().classify("Invoice_March.pdf", ".pdf", "");
        assert_eq!(c.category, Category::Financial);
        assert_eq!(c.scores.get(Category::Financial), 3);
        assert_eq!(c.scores.get(Category::School), 1);
        assert_eq!(c.scores.get(Category::Work), 1);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn test_tie_goes_to_first_declared() {
        // School and Work both get 1 for .pdf.
        let c = Classifier::new().classify("zzz.pdf", ".pdf", "");
        assert_eq!(c.category, Category::School);
        assert!((c.confidence - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_uncategorized_iff_all_zero() {
        let c = Classifier::new().classify("qqq.xyz", ".xyz", "");
        assert_eq!(c.category, Category::Uncategorized);
        assert_eq!(c.confidence, 0.0);
        assert!(c.scores.all_zero());

        let c = Classifier::new().classify("qqq.txt", ".txt", "");
        assert_ne!(c.category, Category::Uncategorized);
        assert!(!c.scores.all_zero());
    }

    #[test]
    fn test_resume_content_override() {
        let sample = "Jane Doe\nEducation: BSc\nSkills: Rust, SQL\nExperience: 5 years";
        let c = Classifier::new().classify("jane.txt", ".txt", sample);
        assert_eq!(c.category, Category::Resume);
        assert_eq!(c.confidence, 1.0);
        assert_eq!(c.scores.get(Category::Resume), 3);
    }

    #[test]
    fn test_content_rules_need_two_markers() {
        let c = Classifier::new().classify("todo.txt", ".txt", "skills to learn");
        assert_eq!(c.category, Category::School);
    }

    #[test]
    fn test_content_rules_skip_non_text_extensions() {
        let sample = "education skills experience";
        let c = Classifier::new().classify("scan.jpg", ".jpg", sample);
        assert_ne!(c.category, Category::Resume);
        let c = Classifier::new().classify("setup.exe", ".exe", sample);
        assert_ne!(c.category, Category::Resume);
    }

    #[test]
    fn test_content_rules_cover_document_formats() {
        let sample = "education skills experience";
        for (name, ext) in [("scan.pdf", ".pdf"), ("cv2.docx", ".docx"), ("old.doc", ".doc")] {
            let c = Classifier::new().classify(name, ext, sample);
            assert_eq!(c.category, Category::Resume, "{name}");
        }
    }

    #[test]
    fn test_code_content_rule() {
        let sample = "import os\n\ndef main():\n    return 0\n";
        let c = Classifier::new().classify("snippet.txt", ".txt", sample);
        assert_eq!(c.category, Category::Code);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn test_confidence_in_range() {
        let names = [
            ("family_vacation_photo.jpg", ".jpg"),
            ("budget_report_meeting.xlsx", ".xlsx"),
            ("main.py", ".py"),
            ("song.mp3", ".mp3"),
            ("README", ""),
        ];
        let classifier = Classifier::new();
        for (name, ext) in names {
            let c = classifier.classify(name, ext, "");
            assert!((0.0..=1.0).contains(&c.confidence), "{name}");
        }
    }
}
