use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn seev_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("seev");
    path
}

/// A scratch directory used as both cwd and HOME, so no user config or
/// environment leaks into the run.
fn setup_test_env() -> TempDir {
    TempDir::new().unwrap()
}

fn seev_command(root: &Path) -> Command {
    let mut cmd = Command::new(seev_binary());
    cmd.current_dir(root)
        .env("HOME", root)
        .env_remove("SEEV_MD_PATH")
        .env_remove("SEEV_DB_PATH")
        .env_remove("SEEV_TRACK_EMAILS")
        .env_remove("SEEV_LOG");
    cmd
}

fn run_seev(root: &Path, args: &[&str]) -> (String, String, bool) {
    run_seev_stdin(root, args, None)
}

fn run_seev_stdin(root: &Path, args: &[&str], stdin: Option<&str>) -> (String, String, bool) {
    let binary = seev_binary();
    let mut child = seev_command(root)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("Failed to run seev binary at {:?}: {}", binary, e));

    {
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

const DAY_ONE: &str = "### 🎯 Goals & Context\n\
- Refactor auth module\n\
\n\
### 💻 Technical Work\n\
- Fix login redirect (`abc123f`, +12/-3, 2 files)\n";

#[test]
fn test_write_into_empty_file() {
    let tmp = setup_test_env();
    let (stdout, stderr, success) =
        run_seev_stdin(tmp.path(), &["write", "2025-10-22"], Some(DAY_ONE));
    assert!(success, "write failed: stdout={}, stderr={}", stdout, stderr);

    let report: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["heading_added"], true);
    assert_eq!(report["new_bullets_added"], 2);

    let text = fs::read_to_string(tmp.path().join("WORKLOG.md")).unwrap();
    assert_eq!(
        text,
        "## 2025-10-22\n\n\
         ### 🎯 Goals & Context\n\n\
         - Refactor auth module\n\n\
         ### 💻 Technical Work\n\n\
         - Fix login redirect (`abc123f`, +12/-3, 2 files)\n\n\
         ### 📊 Metrics\n\n\
         - **1 commits**\n\
         - **12 additions, 3 deletions**\n\
         - **2 files changed**\n"
    );
}

#[test]
fn test_write_is_idempotent() {
    let tmp = setup_test_env();
    let journal = tmp.path().join("WORKLOG.md");

    run_seev(tmp.path(), &["write", "2025-10-22", "--content", DAY_ONE]);
    let once = fs::read_to_string(&journal).unwrap();

    let (stdout, _, success) = run_seev(tmp.path(), &["write", "2025-10-22", "--content", DAY_ONE]);
    assert!(success);
    let report: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["new_bullets_added"], 0);
    assert_eq!(report["deduplicated_count"], 2);
    assert_eq!(fs::read_to_string(&journal).unwrap(), once);
}

#[test]
fn test_restatement_merges_new_commits_only() {
    let tmp = setup_test_env();
    run_seev(tmp.path(), &["write", "2025-10-22", "--content", DAY_ONE]);

    let restated = "### 💻 Technical Work\n\
- Fix login redirect (abc123f0deadbeef)\n\
- Add session tests (`def456a`, +40/-0, 1 file)\n";
    let (_, stderr, success) = run_seev(tmp.path(), &["write", "2025-10-22", "--content", restated]);
    assert!(success, "stderr={}", stderr);

    let (stdout, _, _) = run_seev(tmp.path(), &["read", "2025-10-22"]);
    let entry: Value = serde_json::from_str(&stdout).unwrap();
    let work = entry["sections"]["technical_work"].as_array().unwrap();
    assert_eq!(work.len(), 2);
    assert_eq!(entry["sections"]["metrics"]["commits"], 2);
    assert_eq!(entry["sections"]["metrics"]["additions"], 52);
}

#[test]
fn test_existing_entries_untouched() {
    let tmp = setup_test_env();
    let journal = tmp.path().join("WORKLOG.md");
    let before = "# Worklog\n\n## 2025-10-20\n\n- hand written note\n\n## 2025-10-21\n\n### Notes\n\nfree text\n";
    fs::write(&journal, before).unwrap();

    let (_, stderr, success) = run_seev(tmp.path(), &["write", "2025-10-22", "--content", DAY_ONE]);
    assert!(success, "stderr={}", stderr);

    let after = fs::read_to_string(&journal).unwrap();
    assert!(after.starts_with(before));
    assert!(after[before.len()..].starts_with("\n## 2025-10-22\n"));
}

#[test]
fn test_invalid_date_fails_without_touching_file() {
    let tmp = setup_test_env();
    let (_, stderr, success) = run_seev(tmp.path(), &["write", "2025-02-30", "--content", DAY_ONE]);
    assert!(!success);
    assert!(stderr.contains("invalid date"), "stderr={}", stderr);
    assert!(!tmp.path().join("WORKLOG.md").exists());

    let (_, _, success) = run_seev(tmp.path(), &["read", "22-10-2025"]);
    assert!(!success);
}

#[test]
fn test_empty_content_rejected() {
    let tmp = setup_test_env();
    let (_, stderr, success) = run_seev_stdin(tmp.path(), &["write", "2025-10-22"], Some("  \n\n"));
    assert!(!success);
    assert!(stderr.contains("must not be empty"), "stderr={}", stderr);
    assert!(!tmp.path().join("WORKLOG.md").exists());
}

#[test]
fn test_read_missing_entry() {
    let tmp = setup_test_env();
    let (stdout, stderr, success) = run_seev(tmp.path(), &["read", "2025-10-22"]);
    assert!(success, "stderr={}", stderr);
    let entry: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(entry["exists"], false);
    assert_eq!(entry["date"], "2025-10-22");
    assert!(entry["heading_line"].is_null());
}

#[test]
fn test_file_flag_and_config_markdown_path() {
    let tmp = setup_test_env();
    let explicit = tmp.path().join("other").join("log.md");
    let (_, stderr, success) = run_seev(
        tmp.path(),
        &["write", "2025-10-22", "--content", DAY_ONE, "--file", explicit.to_str().unwrap()],
    );
    assert!(success, "stderr={}", stderr);
    assert!(explicit.exists());
    assert!(!tmp.path().join("WORKLOG.md").exists());

    fs::write(tmp.path().join("seev.toml"), "markdown_path = \"notes/journal.md\"\n").unwrap();
    let (_, stderr, success) = run_seev(tmp.path(), &["write", "2025-10-22", "--content", DAY_ONE]);
    assert!(success, "stderr={}", stderr);
    assert!(tmp.path().join("notes").join("journal.md").exists());
}

#[test]
fn test_append_under_date() {
    let tmp = setup_test_env();
    let journal = tmp.path().join("WORKLOG.md");

    let (stdout, stderr, success) = run_seev(
        tmp.path(),
        &["append", "Reviewed PR\nPaired on CI", "--date", "2025-10-22"],
    );
    assert!(success, "stderr={}", stderr);
    let report: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["heading_added"], true);
    assert_eq!(report["line_numbers_added"], serde_json::json!([3, 4]));

    run_seev(tmp.path(), &["append", "Reviewed PR", "--date", "2025-10-22"]);
    assert_eq!(
        fs::read_to_string(&journal).unwrap(),
        "## 2025-10-22\n\n- Reviewed PR\n- Paired on CI\n- Reviewed PR\n"
    );
}

#[test]
fn test_init_and_conversations() {
    let tmp = setup_test_env();
    let db = tmp.path().join("data").join("seev.sqlite3");
    fs::write(
        tmp.path().join("seev.toml"),
        format!("db_path = \"{}\"\n", db.display()),
    )
    .unwrap();

    let (stdout, stderr, success) = run_seev(tmp.path(), &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(db.exists());

    let (_, _, success) = run_seev(tmp.path(), &["init"]);
    assert!(success, "Second init failed (not idempotent)");

    let (stdout, _, success) = run_seev(tmp.path(), &["conversation", "add", "--title", "Auth"]);
    assert!(success);
    let id = stdout.trim().to_string();

    let (_, stderr, success) = run_seev(
        tmp.path(),
        &["conversation", "message", &id, "user", "Why does login loop?"],
    );
    assert!(success, "stderr={}", stderr);

    let (_, stderr, success) = run_seev(tmp.path(), &["conversation", "message", "999", "user", "hi"]);
    assert!(!success);
    assert!(stderr.contains("not found"));

    let (stdout, _, success) = run_seev(tmp.path(), &["conversation", "show", &id]);
    assert!(success);
    let shown: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(shown["conversation"]["title"], "Auth");
    assert_eq!(shown["messages"][0]["role"], "user");

    let (stdout, _, success) = run_seev(tmp.path(), &["conversation", "list", "--title", "auth"]);
    assert!(success);
    let listed: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn test_generate_outside_repository_fails() {
    let tmp = setup_test_env();
    let (_, _, success) = run_seev(
        tmp.path(),
        &["generate", "2025-10-22", "--repo", tmp.path().to_str().unwrap()],
    );
    assert!(!success);
    assert!(!tmp.path().join("WORKLOG.md").exists());
}
