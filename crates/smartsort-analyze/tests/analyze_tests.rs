use std::fs;
use std::path::Path;

use chrono::Utc;
use smartsort_analyze::{FileAnalyzer, GroupConfig, Grouper, similarity};
use smartsort_core::{AnalyzeConfig, FileRecord, GroupKind};
use tempfile::TempDir;

fn analyze_all(analyzer: &FileAnalyzer, paths: &[&Path]) -> Vec<FileRecord> {
    paths
        .iter()
        .map(|p| {
            let size = fs::metadata(p).unwrap().len();
            analyzer.analyze(p, size, Utc::now(), None)
        })
        .collect()
}

fn alphabet_text(len: usize) -> String {
    (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect()
}

#[test]
fn test_identical_small_files_form_one_exact_group() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let names = ["a.txt", "a_copy.txt", "a_v2.txt"];
    for name in names {
        fs::write(root.join(name), "0123456789").unwrap();
    }

    let paths: Vec<_> = names.iter().map(|n| root.join(n)).collect();
    let path_refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
    let records = analyze_all(&FileAnalyzer::default(), &path_refs);

    let report = Grouper::default().group(&records);
    assert_eq!(report.exact.len(), 1);

    let group = &report.exact[0];
    assert_eq!(group.kind, GroupKind::Exact);
    assert_eq!(group.len(), 3);
    assert_eq!(group.confidence, 1.0);
    assert_eq!(group.keeper, root.join("a.txt"));
    assert_eq!(group.wasted_bytes, 20);
    assert!(group.recommended_action.contains("a.txt"));

    // Only the keeper takes part in the similar pass.
    assert!(report.similar.is_empty());
}

#[test]
fn test_near_identical_reports_are_similar() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    let original = alphabet_text(200);
    let edited: String = original
        .chars()
        .enumerate()
        .map(|(i, c)| if i % 20 == 0 { 'Z' } else { c })
        .collect();
    fs::write(root.join("report.pdf"), &original).unwrap();
    fs::write(root.join("report_FINAL_v2.pdf"), &edited).unwrap();

    let a = root.join("report.pdf");
    let b = root.join("report_FINAL_v2.pdf");
    let records = analyze_all(&FileAnalyzer::default(), &[a.as_path(), b.as_path()]);

    let report = Grouper::default().group(&records);
    assert!(report.exact.is_empty());
    assert_eq!(report.similar.len(), 1);

    let group = &report.similar[0];
    assert_eq!(group.kind, GroupKind::Similar);
    assert_eq!(group.len(), 2);
    assert!(group.confidence > 0.7, "confidence {}", group.confidence);
    assert!(group.signature.starts_with("sim-"));
    assert_eq!(group.keeper, a);
}

#[test]
fn test_different_extensions_are_never_similar() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::write(root.join("notes.txt"), "shared body text").unwrap();
    fs::write(root.join("notes.md"), "shared body text!").unwrap();

    let a = root.join("notes.txt");
    let b = root.join("notes.md");
    let records = analyze_all(&FileAnalyzer::default(), &[a.as_path(), b.as_path()]);

    let report = Grouper::default().group(&records);
    assert!(report.is_empty());
}

#[test]
fn test_similarity_is_symmetric_and_reflexive() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let files = [
        ("budget.xlsx", "q1 q2 q3 q4".to_string()),
        ("budget_old.xlsx", "q1 q2 q3".to_string()),
        ("empty.xlsx", String::new()),
        ("Résumé.txt", "education skills experience".to_string()),
    ];
    for (name, body) in &files {
        fs::write(root.join(name), body).unwrap();
    }

    let paths: Vec<_> = files.iter().map(|(n, _)| root.join(n)).collect();
    let path_refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
    let records = analyze_all(&FileAnalyzer::default(), &path_refs);

    for a in &records {
        assert_eq!(similarity(a, a), 1.0, "{}", a.filename);
        for b in &records {
            let ab = similarity(a, b);
            assert_eq!(ab, similarity(b, a));
            assert!((0.0..=1.0).contains(&ab));
        }
    }
}

fn large_file_config(verify: bool) -> AnalyzeConfig {
    AnalyzeConfig::builder()
        .sample_threshold(4096u64)
        .sample_window(512usize)
        .verify_sampled_duplicates(verify)
        .build()
        .unwrap()
}

fn write_large_pair(root: &Path, differ: bool) {
    let a = vec![b'x'; 16 * 1024];
    let mut b = a.clone();
    if differ {
        b[8 * 1024] = b'y';
    }
    fs::write(root.join("big_a.bin"), &a).unwrap();
    fs::write(root.join("big_b.bin"), &b).unwrap();
}

#[test]
fn test_sampled_collision_is_split_by_verification() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_large_pair(root, true);

    let config = large_file_config(true);
    let analyzer = FileAnalyzer::from_config(&config);
    let a = root.join("big_a.bin");
    let b = root.join("big_b.bin");
    let records = analyze_all(&analyzer, &[a.as_path(), b.as_path()]);

    // Same head, tail and size: the sampled fingerprints collide.
    assert_eq!(records[0].content_fingerprint, records[1].content_fingerprint);

    let report = Grouper::new(GroupConfig::from_config(&config)).group(&records);
    assert!(report.exact.is_empty());
    assert!(report.similar.iter().all(|g| g.kind == GroupKind::Similar));
}

#[test]
fn test_verified_large_duplicates_keep_full_confidence() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_large_pair(root, false);

    let config = large_file_config(true);
    let analyzer = FileAnalyzer::from_config(&config);
    let a = root.join("big_a.bin");
    let b = root.join("big_b.bin");
    let records = analyze_all(&analyzer, &[a.as_path(), b.as_path()]);

    let report = Grouper::new(GroupConfig::from_config(&config)).group(&records);
    assert_eq!(report.exact.len(), 1);
    assert_eq!(report.exact[0].confidence, 1.0);
    assert_eq!(report.exact[0].wasted_bytes, 16 * 1024);
}

#[test]
fn test_unverified_large_duplicates_report_lower_confidence() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_large_pair(root, true);

    let config = large_file_config(false);
    let analyzer = FileAnalyzer::from_config(&config);
    let a = root.join("big_a.bin");
    let b = root.join("big_b.bin");
    let records = analyze_all(&analyzer, &[a.as_path(), b.as_path()]);

    let report = Grouper::new(GroupConfig::from_config(&config)).group(&records);
    assert_eq!(report.exact.len(), 1);
    assert!(report.exact[0].confidence < 1.0);
}

#[test]
fn test_greedy_clustering_yields_a_valid_partition() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let names = ["plan.txt", "plan1.txt", "plan2.txt", "zzzzzzzzzzzz.txt"];
    for (i, name) in names.iter().enumerate() {
        fs::write(root.join(name), format!("meeting plan draft {i}")).unwrap();
    }

    let paths: Vec<_> = names.iter().map(|n| root.join(n)).collect();
    let mut path_refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
    let forward = analyze_all(&FileAnalyzer::default(), &path_refs);
    path_refs.reverse();
    let backward = analyze_all(&FileAnalyzer::default(), &path_refs);

    for records in [forward, backward] {
        let report = Grouper::default().group(&records);
        let mut seen = std::collections::HashSet::new();
        for group in &report.similar {
            assert!(group.len() >= 2);
            for member in &group.members {
                assert!(seen.insert(member.path.clone()), "file in two clusters");
            }
        }
    }
}
