#![cfg(unix)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn bp_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("bp");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    fs::write(
        root.join("pods.txt"),
        "api-7d9f Running\nworker-1a2b CrashLoopBackOff\nweb-3c4d Running\ndb-5e6f Pending\n",
    )
    .unwrap();

    let config_content = r#"[shell]
program = "sh"
args = ["-c"]

[view]
max_visible = 2
preview_lines = 5

[log]
level = "error"
"#;
    let config_path = config_dir.join("bufpipe.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_bp(config_path: &Path, args: &[&str], stdin: &str) -> (String, String, bool) {
    let binary = bp_binary();
    let mut child = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to run bp binary at {:?}: {}", binary, e));

    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_run_chain_prints_final_stage() {
    let (tmp, config_path) = setup_test_env();
    let input = tmp.path().join("pods.txt");

    let (stdout, stderr, success) = run_bp(
        &config_path,
        &[
            "run",
            "--file",
            input.to_str().unwrap(),
            "-f",
            "grep Running",
            "-f",
            "cut -d' ' -f1",
        ],
        "",
    );
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(stdout, "api-7d9f\nweb-3c4d\n");
}

#[test]
fn test_run_list_output() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_bp(
        &config_path,
        &["run", "--cmd", "seq 1 142", "-f", "head -n 23", "--list"],
        "",
    );
    assert!(success, "run failed: stdout={}, stderr={}", stdout, stderr);
    let expected = concat!(
        " # │ Parent │ Lines │ Command\n",
        "───┼────────┼───────┼────────────────────────────────\n",
        " 1 │      - │   142 │ !seq 1 142\n",
        " 2 │      1 │    23 │ head -n 23\n",
    );
    assert_eq!(stdout, expected);
}

#[test]
fn test_run_reads_stdin_by_default() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_bp(&config_path, &["run", "-f", "tr a-z A-Z"], "hello\n");
    assert!(success);
    assert_eq!(stdout, "HELLO\n");
}

#[test]
fn test_run_failing_filter_exits_nonzero() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_bp(&config_path, &["run", "--cmd", "echo a", "-f", "exit 5"], "");
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("exit code 5"), "stderr: {}", stderr);
}

#[test]
fn test_run_empty_output_exits_nonzero() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) =
        run_bp(&config_path, &["run", "--cmd", "echo a", "-f", "sed -n /b/p"], "");
    assert!(!success);
    assert!(stderr.contains("produced no output"), "stderr: {}", stderr);
}

#[test]
fn test_run_json_output() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_bp(
        &config_path,
        &["run", "--cmd", "printf 'x\\ny\\n'", "-f", "grep y", "--json"],
        "",
    );
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let stages = parsed.as_array().unwrap();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[1]["parent_id"], 1);
    assert_eq!(stages[1]["command"], "grep y");
    assert_eq!(stages[1]["lines"], 1);
}

#[test]
fn test_session_load_filter_delete() {
    let (tmp, config_path) = setup_test_env();
    let input = tmp.path().join("pods.txt");

    let script = format!(
        "load {}\n| grep -v Running\n| wc -l\nlist\ndelete 2\nshow 3\nquit\n",
        input.display()
    );
    let (stdout, stderr, success) = run_bp(&config_path, &["session"], &script);
    assert!(success, "session failed: stdout={}, stderr={}", stdout, stderr);

    assert!(stdout.contains("── [1] (loaded) (4 lines) ──"));
    assert!(stdout.contains("── [2] grep -v Running (2 lines, parent 1) ──"));
    assert!(stdout.contains("deleted stage 2"));
    assert!(stdout.contains("parent:     2 (deleted)"));
}

#[test]
fn test_session_visible_pane_cap() {
    let (_tmp, config_path) = setup_test_env();

    let script = "!echo one\n!echo two\n!echo three\n";
    let (stdout, _, success) = run_bp(&config_path, &["session"], script);
    assert!(success);
    assert!(stdout.contains("(closed [1] !echo one)"));
    assert!(!stdout.contains("(closed [2]"));
}

#[test]
fn test_session_start_with_command() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) =
        run_bp(&config_path, &["session", "--cmd", "echo start"], "list\n");
    assert!(success);
    assert!(stdout.contains(">  1 │      - │     1 │ !echo start"));
}

#[test]
fn test_config_prints_effective_settings() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_bp(&config_path, &["config"], "");
    assert!(success);
    assert!(stdout.contains("max_visible = 2"));
    assert!(stdout.contains("name_max_len = 50"));
}

#[test]
fn test_invalid_config_fails() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "[view]\nmax_visible = 0\n").unwrap();

    let (_, stderr, success) = run_bp(&bad, &["config"], "");
    assert!(!success);
    assert!(stderr.contains("max_visible"));
}
