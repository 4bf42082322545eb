use clap::Parser;
/// End-to-end tests for the command-line driver.
///
/// Prechecks are exercised directly; one test runs the whole binary path
/// (logging, signal handler, engine) since both the subscriber and the
/// Ctrl-C handler can only be installed once per process.
use dirledger_cli::precheck::{precheck, PrecheckError};
use dirledger_cli::{run_with, Args, EXIT_OK, EXIT_PRECHECK};
use dirledger_core::store::{AggregationState, RecordStore};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn args(path: &Path, store: &Path, extra: &[&str]) -> Args {
    let mut argv = vec![
        "dirledger".to_string(),
        "--path".into(),
        path.to_string_lossy().into_owned(),
        "--store".into(),
        store.to_string_lossy().into_owned(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    Args::try_parse_from(argv).unwrap()
}

// ── Prechecks ────────────────────────────────────────────────────────────────

#[test]
fn fresh_store_passes_and_gets_extension() {
    let tmp = TempDir::new().unwrap();
    let checked = precheck(&args(tmp.path(), &tmp.path().join("scan"), &[])).unwrap();
    assert_eq!(checked.store, tmp.path().join("scan.db"));
    assert_eq!(checked.root, tmp.path());
}

#[test]
fn missing_scan_path_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let problems = precheck(&args(&tmp.path().join("nope"), &tmp.path().join("s.db"), &[]))
        .unwrap_err();
    assert!(matches!(problems[..], [PrecheckError::PathUnreadable { .. }]));
}

#[test]
fn file_as_scan_path_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("f");
    fs::write(&file, b"x").unwrap();
    let problems = precheck(&args(&file, &tmp.path().join("s.db"), &[])).unwrap_err();
    assert!(matches!(problems[..], [PrecheckError::NotADirectory(_)]));
}

#[test]
fn existing_store_needs_replay_flag() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("s.db");
    RecordStore::open(&store).unwrap();

    let problems = precheck(&args(tmp.path(), &store, &[])).unwrap_err();
    assert!(matches!(problems[..], [PrecheckError::StoreExists(_)]));

    assert!(precheck(&args(tmp.path(), &store, &["--replay-errors-only"])).is_ok());
}

#[test]
fn replay_rejects_file_that_is_not_a_store() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("s.db");
    fs::write(&store, b"").unwrap();

    let problems = precheck(&args(tmp.path(), &store, &["--replay-errors-only"])).unwrap_err();
    assert!(matches!(problems[..], [PrecheckError::NotAStore { .. }]));
    assert_eq!(fs::metadata(&store).unwrap().len(), 0);
}

#[test]
fn replay_needs_existing_store() {
    let tmp = TempDir::new().unwrap();
    let problems = precheck(&args(
        tmp.path(),
        &tmp.path().join("s.db"),
        &["--replay-errors-only"],
    ))
    .unwrap_err();
    assert!(matches!(problems[..], [PrecheckError::StoreMissing(_)]));
}

#[test]
fn directory_as_store_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("s.db");
    fs::create_dir(&store).unwrap();
    let problems = precheck(&args(tmp.path(), &store, &[])).unwrap_err();
    assert!(matches!(problems[..], [PrecheckError::StoreIsDirectory(_)]));
}

#[test]
fn all_problems_are_reported_together() {
    let tmp = TempDir::new().unwrap();
    let store = tmp.path().join("s.db");
    fs::write(&store, b"").unwrap();
    let problems = precheck(&args(&tmp.path().join("nope"), &store, &[])).unwrap_err();
    assert_eq!(problems.len(), 2);
}

#[test]
fn precheck_failure_exits_with_code_two() {
    let tmp = TempDir::new().unwrap();
    let code = run_with(args(&tmp.path().join("nope"), &tmp.path().join("s.db"), &[]));
    assert_eq!(code, EXIT_PRECHECK);
    assert!(!tmp.path().join("s.db").exists());
}

// ── Full run ─────────────────────────────────────────────────────────────────

#[test]
fn full_run_writes_store_and_log() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    fs::create_dir_all(root.join("a")).unwrap();
    fs::write(root.join("ten"), [0u8; 10]).unwrap();
    fs::write(root.join("a").join("five"), [0u8; 5]).unwrap();
    let out = tmp.path().join("out");
    fs::create_dir(&out).unwrap();

    let code = run_with(args(&root, &out.join("scan"), &["--threads", "2", "--debug"]));
    assert_eq!(code, EXIT_OK);

    let store = RecordStore::open_existing(&out.join("scan.db")).unwrap();
    assert_eq!(store.entry_count().unwrap(), 4);
    assert_eq!(store.aggregation_state().unwrap(), AggregationState::Complete);
    let top = store.entry(&root.to_string_lossy()).unwrap().unwrap();
    assert_eq!(top.subtree_size, Some(15));

    let logs: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("scan_") && n.ends_with(".log"))
        .collect();
    assert_eq!(logs.len(), 1, "{logs:?}");
    let text = fs::read_to_string(out.join(&logs[0])).unwrap();
    assert!(text.contains("end of scan"));
}
