//! Timeout and isolation tests that drive `run_batch` with real `sh` children.
//!
//! Background descendants try to write a sentinel file after the item is
//! over; the file must never appear.
#![cfg(unix)]

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use batch_runner::batch::{ProcessExecutor, run_batch};
use batch_runner::core::types::RunResult;
use batch_runner::test_support::{capture_console, fixture_dir, shell_config};

fn late_writer(sentinel: &Path, foreground: &str) -> String {
    format!(
        "(sleep 2; echo alive > '{}') &\n{foreground}\n",
        sentinel.display()
    )
}

#[test]
fn timed_out_item_leaves_no_descendants() {
    let scratch = fixture_dir(&[]);
    let sentinel = scratch.path().join("sentinel");
    let script = late_writer(&sentinel, "sleep 30");
    let dir = fixture_dir(&[("slow.prog", script.as_str())]);
    let cfg = shell_config(Duration::from_millis(500));
    let executor = ProcessExecutor::from_config(&cfg).expect("executor");
    let console = capture_console();

    let started = Instant::now();
    let reports = run_batch(dir.path(), &cfg, &executor, &console).expect("batch");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(reports[0].result, RunResult::TimedOut);

    thread::sleep(Duration::from_secs(3));
    assert!(!sentinel.exists(), "descendant survived the timeout");

    let (stdout, _) = console.into_inner();
    assert_eq!(
        String::from_utf8(stdout).expect("utf8"),
        "[slow.prog]\nProgram execution killed after running for 500ms\n\n"
    );
}

#[test]
fn completed_item_leaves_no_descendants() {
    let scratch = fixture_dir(&[]);
    let sentinel = scratch.path().join("sentinel");
    let script = late_writer(&sentinel, "echo started");
    let dir = fixture_dir(&[("quick.prog", script.as_str())]);
    let cfg = shell_config(Duration::from_secs(10));
    let executor = ProcessExecutor::from_config(&cfg).expect("executor");
    let console = capture_console();

    let reports = run_batch(dir.path(), &cfg, &executor, &console).expect("batch");
    assert_eq!(
        reports[0].result,
        RunResult::Completed { exit_code: Some(0) }
    );

    thread::sleep(Duration::from_secs(3));
    assert!(!sentinel.exists(), "descendant outlived its item");
}

#[test]
fn every_entry_gets_exactly_one_label() {
    let dir = fixture_dir(&[
        ("e.prog", "exit 9\n"),
        ("d.prog", "sleep 30\n"),
        ("c.prog", "printf 'no newline'\n"),
        ("b.prog", "echo two; echo lines\n"),
        ("a.prog", "true\n"),
    ]);
    let cfg = shell_config(Duration::from_millis(700));
    let executor = ProcessExecutor::from_config(&cfg).expect("executor");
    let console = capture_console();

    let reports = run_batch(dir.path(), &cfg, &executor, &console).expect("batch");
    assert_eq!(reports.len(), 5);
    assert_eq!(reports[3].result, RunResult::TimedOut);
    assert_eq!(
        reports[4].result,
        RunResult::Completed { exit_code: Some(9) }
    );

    let (stdout, _) = console.into_inner();
    let text = String::from_utf8(stdout).expect("utf8");
    assert_eq!(
        text,
        "[a.prog]\n\n\
         [b.prog]\ntwo\nlines\n\n\
         [c.prog]\nno newline\n\n\
         [d.prog]\nProgram execution killed after running for 700ms\n\n\
         [e.prog]\n\n"
    );
    assert_eq!(text.matches("Program execution killed").count(), 1);
}

#[cfg(target_os = "linux")]
#[test]
fn session_escapee_does_not_stall_the_batch() {
    let dir = fixture_dir(&[
        ("a.prog", "setsid sleep 8 &\nsleep 30\n"),
        ("b.prog", "echo next\n"),
    ]);
    let cfg = shell_config(Duration::from_millis(500));
    let executor = ProcessExecutor::from_config(&cfg).expect("executor");
    let console = capture_console();

    let started = Instant::now();
    let reports = run_batch(dir.path(), &cfg, &executor, &console).expect("batch");
    assert!(
        started.elapsed() < Duration::from_secs(6),
        "batch waited on a process outside the item's group"
    );
    assert_eq!(reports[0].result, RunResult::TimedOut);
    assert_eq!(
        reports[1].result,
        RunResult::Completed { exit_code: Some(0) }
    );

    let (stdout, _) = console.into_inner();
    assert_eq!(
        String::from_utf8(stdout).expect("utf8"),
        "[a.prog]\nProgram execution killed after running for 500ms\n\n[b.prog]\nnext\n\n"
    );
}
