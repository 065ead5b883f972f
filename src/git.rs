//! Git history queries.
//!
//! Shells out to the `git` binary. Commit records are requested with ASCII
//! record/unit separators (`%x1e`, `%x1f`) so subjects containing `|` or
//! tabs parse cleanly, followed by `--numstat` lines for per-commit stats.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use std::process::Command;

use seev_core::EntryDate;

const RECORD_SEP: char = '\u{1e}';
const FIELD_SEP: char = '\u{1f}';
const LOG_FORMAT: &str = "--pretty=format:%x1e%H%x1f%an%x1f%ae%x1f%aI%x1f%s";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub author: String,
    pub email: String,
    /// Author date, ISO 8601.
    pub date: String,
    pub message: String,
    pub additions: u64,
    pub deletions: u64,
    pub files: u64,
}

impl CommitInfo {
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(7)]
    }
}

fn git(workdir: Option<&Path>) -> Command {
    let mut cmd = Command::new("git");
    if let Some(dir) = workdir {
        cmd.arg("-C").arg(dir);
    }
    cmd
}

/// Commits authored on `date` (local time, whole day), oldest first.
///
/// `authors` are passed as `--author` patterns; git matches any of them.
/// An empty list includes every author.
pub fn commits_for_date(
    date: &EntryDate,
    authors: &[String],
    workdir: Option<&Path>,
) -> Result<Vec<CommitInfo>> {
    let mut cmd = git(workdir);
    cmd.args(["log", "--reverse", "--numstat", LOG_FORMAT])
        .arg(format!("--since={date} 00:00:00"))
        .arg(format!("--until={date} 23:59:59"));
    for author in authors {
        cmd.arg(format!("--author={author}"));
    }

    tracing::debug!(date = %date, authors = authors.len(), "running git log");
    let output = cmd
        .output()
        .with_context(|| "Failed to execute 'git log'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git log failed: {}", stderr.trim());
    }

    Ok(parse_log_output(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `git log` output produced with [`LOG_FORMAT`] and `--numstat`.
pub fn parse_log_output(stdout: &str) -> Vec<CommitInfo> {
    stdout
        .split(RECORD_SEP)
        .filter(|record| !record.trim().is_empty())
        .filter_map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Option<CommitInfo> {
    let mut lines = record.lines();
    let header = lines.next()?;
    let mut fields = header.split(FIELD_SEP);
    let hash = fields.next()?.trim().to_string();
    if hash.is_empty() {
        return None;
    }
    let mut commit = CommitInfo {
        hash,
        author: fields.next().unwrap_or_default().to_string(),
        email: fields.next().unwrap_or_default().to_string(),
        date: fields.next().unwrap_or_default().to_string(),
        message: fields.next().unwrap_or_default().trim().to_string(),
        additions: 0,
        deletions: 0,
        files: 0,
    };

    for line in lines.filter(|l| !l.trim().is_empty()) {
        let mut cols = line.split('\t');
        let (Some(adds), Some(dels), Some(_path)) = (cols.next(), cols.next(), cols.next()) else {
            continue;
        };
        // Binary files report "-" for both counts.
        commit.additions += adds.parse::<u64>().unwrap_or(0);
        commit.deletions += dels.parse::<u64>().unwrap_or(0);
        commit.files += 1;
    }
    Some(commit)
}

fn git_config_value(key: &str, workdir: Option<&Path>) -> Option<String> {
    let output = git(workdir).args(["config", "--get", key]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// The local git identity to filter commits by: `user.email`, falling back
/// to `user.name`.
pub fn git_author_pattern(workdir: Option<&Path>) -> Option<String> {
    git_config_value("user.email", workdir).or_else(|| git_config_value("user.name", workdir))
}
