//! Hygiene: source pattern budgets checked at test time
//!
//! These tests scan the library sources for antipatterns. Each pattern has a
//! budget (ideally zero). If you must add one, fix an existing one first; the
//! budget never grows.
#![allow(clippy::absurd_extreme_comparisons)]

use std::fs;
use std::path::{Path, PathBuf};

struct Budget {
    pattern: &'static str,
    max: usize,
    why: &'static str,
}

// Panics, silent loss, and stray output. The library logs through `tracing`.
const BUDGETS: &[Budget] = &[
    Budget { pattern: ".unwrap()", max: 0, why: "panics" },
    Budget { pattern: ".expect(", max: 0, why: "panics" },
    Budget { pattern: "panic!(", max: 0, why: "panics" },
    Budget { pattern: "unreachable!(", max: 0, why: "panics" },
    Budget { pattern: "todo!(", max: 0, why: "panics" },
    Budget { pattern: "unimplemented!(", max: 0, why: "panics" },
    Budget { pattern: "let _ =", max: 0, why: "discards a result unread" },
    Budget { pattern: ".ok()", max: 0, why: "discards an error unread" },
    Budget { pattern: "#[allow(dead_code)]", max: 0, why: "hides unused code" },
    Budget { pattern: "println!(", max: 0, why: "bypasses tracing" },
    Budget { pattern: "eprintln!(", max: 0, why: "bypasses tracing" },
    Budget { pattern: "dbg!(", max: 0, why: "debug leftover" },
];

struct SourceFile {
    path: PathBuf,
    content: String,
}

fn rs_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            rs_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            out.push(path);
        }
    }
}

fn is_test_file(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n.to_string_lossy().ends_with("_test.rs"))
}

/// Production sources under `src/`.
fn source_files() -> Vec<SourceFile> {
    let mut paths = Vec::new();
    rs_files(Path::new("src"), &mut paths);
    paths
        .into_iter()
        .filter(|p| !is_test_file(p))
        .filter_map(|path| fs::read_to_string(&path).map(|content| SourceFile { path, content }).ok())
        .collect()
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .map(|f| (f.path.display().to_string(), f.content.lines().filter(|l| l.contains(pattern)).count()))
        .filter(|(_, count)| *count > 0)
        .collect()
}

#[test]
fn source_tree_is_scanned() {
    let files = source_files();
    assert!(files.iter().any(|f| f.path.ends_with("engine.rs")), "run from the crate root");
}

#[test]
fn pattern_budgets() {
    let files = source_files();
    let mut failures = Vec::new();
    for budget in BUDGETS {
        let found = hits(&files, budget.pattern);
        let count: usize = found.iter().map(|(_, c)| c).sum();
        if count > budget.max {
            let listing = found.iter().map(|(path, c)| format!("    {path}: {c}")).collect::<Vec<_>>().join("\n");
            failures.push(format!("{} ({}) budget exceeded: found {count}, max {}\n{listing}", budget.pattern, budget.why, budget.max));
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn every_test_file_is_wired_in() {
    let mut paths = Vec::new();
    rs_files(Path::new("src"), &mut paths);
    let sources = source_files();
    let orphans: Vec<String> = paths
        .iter()
        .filter(|p| is_test_file(p))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .filter(|name| {
            let attr = format!("#[path = \"{name}\"]");
            !sources.iter().any(|s| s.content.contains(&attr))
        })
        .collect();
    assert!(orphans.is_empty(), "test files never compiled: {orphans:?}");
}
