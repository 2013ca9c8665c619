//! Snapshot tests of whole command outputs.
//!
//! Each case runs the binary from the workspace root with relative fixture
//! paths, so paths echoed in diff headers are stable. `UPDATE_GOLDEN=1`
//! rewrites the snapshots instead of checking them.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use similar::TextDiff;

struct GoldenCase {
    golden: &'static str,
    args: &'static [&'static str],
}

const CASES: &[GoldenCase] = &[
    GoldenCase {
        golden: "sydney_day.txt",
        args: &["analyze", "--input", "fixtures/sydney_day.json"],
    },
    GoldenCase {
        golden: "sydney_day_revised.txt",
        args: &["analyze", "--input", "fixtures/sydney_day_revised.json"],
    },
    GoldenCase {
        golden: "compare_sydney_day.txt",
        args: &[
            "compare",
            "--before",
            "fixtures/sydney_day.json",
            "--after",
            "fixtures/sydney_day_revised.json",
        ],
    },
    GoldenCase {
        golden: "compare_sydney_day.json",
        args: &[
            "compare",
            "--before",
            "fixtures/sydney_day.json",
            "--after",
            "fixtures/sydney_day_revised.json",
            "--output-format",
            "json",
        ],
    },
];

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn run_case(case: &GoldenCase) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_rosterbucket"))
        .current_dir(project_root())
        .env_remove("ROSTERBUCKET_REFERENCE_TIMEZONE")
        .args(case.args)
        .args(["--reference-tz", "Australia/Sydney"])
        .output()
        .expect("Failed to execute rosterbucket");

    assert!(
        output.status.success(),
        "rosterbucket {:?} failed: {}",
        case.args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("Output is not valid UTF-8")
}

#[test]
fn command_outputs_match_snapshots() {
    let golden_dir = project_root().join("golden");
    let update = std::env::var_os("UPDATE_GOLDEN").is_some();
    let mut mismatches = Vec::new();

    for case in CASES {
        let actual = run_case(case);
        let path = golden_dir.join(case.golden);

        if update {
            fs::write(&path, &actual).expect("Failed to write snapshot");
            continue;
        }

        let expected = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Missing snapshot {}: {}", path.display(), e));
        if expected != actual {
            let diff = TextDiff::from_lines(&expected, &actual)
                .unified_diff()
                .header(case.golden, "actual")
                .to_string();
            mismatches.push(diff);
        }
    }

    assert!(
        mismatches.is_empty(),
        "{} snapshot(s) differ; rerun with UPDATE_GOLDEN=1 to accept:\n{}",
        mismatches.len(),
        mismatches.join("\n")
    );
}

#[test]
fn every_snapshot_has_a_case() {
    let mut on_disk: Vec<String> = fs::read_dir(project_root().join("golden"))
        .expect("Failed to read golden directory")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    on_disk.sort();

    let mut covered: Vec<String> = CASES.iter().map(|c| c.golden.to_string()).collect();
    covered.sort();
    assert_eq!(on_disk, covered);
}
