//! Worklog generation from git history and recorded conversations.
//!
//! Produces *incoming* Markdown for one day, in the same section layout the
//! journal uses, so it can be fed straight into [`journal::write_date_entry`]
//! and merged like hand-written content. No Metrics section is emitted; the
//! merge engine derives it from the Technical Work items.
//!
//! [`journal::write_date_entry`]: crate::journal::write_date_entry

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

use seev_core::{EntryDate, SectionKind};

use crate::config::Config;
use crate::conversations::{first_user_excerpt, list_messages, query_conversations, ConversationQuery};
use crate::git::{commits_for_date, CommitInfo};
use crate::journal::{write_date_entry, WriteReport};

const EXCERPT_CHARS: usize = 200;
const DEFAULT_TITLE: &str = "Coding session";

/// A conversation reduced to what the Goals section quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationDigest {
    pub title: Option<String>,
    pub excerpt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorklogMetadata {
    pub commit_count: usize,
    pub conversation_count: usize,
    pub files_touched: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedWorklog {
    pub date: EntryDate,
    pub markdown: String,
    pub metadata: WorklogMetadata,
}

impl GeneratedWorklog {
    pub fn is_empty(&self) -> bool {
        self.markdown.trim().is_empty()
    }
}

fn plural(n: u64, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// One Technical Work bullet: `- <subject> (`<sha7>`, +A/-D, N files)`.
pub fn commit_line(commit: &CommitInfo) -> String {
    format!(
        "- {} (`{}`, +{}/-{}, {})",
        commit.message,
        commit.short_hash(),
        commit.additions,
        commit.deletions,
        plural(commit.files, "file")
    )
}

/// Render incoming Markdown. Sections with nothing to say are omitted, so
/// an idle day renders as an empty string.
pub fn render_worklog(
    commits: &[CommitInfo],
    conversations: &[ConversationDigest],
    conversation_limit: usize,
) -> String {
    let mut blocks = Vec::new();

    let goals: Vec<String> = conversations
        .iter()
        .take(conversation_limit)
        .map(|c| {
            let title = c
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_TITLE);
            format!("- **{}:** \"{}\"", title, c.excerpt)
        })
        .collect();
    if !goals.is_empty() {
        blocks.push(format!("{}\n\n{}", SectionKind::Goals.heading(), goals.join("\n")));
    }

    if !commits.is_empty() {
        let lines: Vec<String> = commits.iter().map(commit_line).collect();
        blocks.push(format!(
            "{}\n\n{}",
            SectionKind::TechnicalWork.heading(),
            lines.join("\n")
        ));
    }

    if blocks.is_empty() {
        String::new()
    } else {
        format!("{}\n", blocks.join("\n\n"))
    }
}

/// Conversations created on `date` that have a user message to quote, most
/// recently updated first.
async fn conversation_digests(config: &Config, date: &EntryDate) -> Result<Vec<ConversationDigest>> {
    let conversations = query_conversations(config, &ConversationQuery::created_on(&date.to_string())).await?;
    let mut digests = Vec::new();
    for conv in conversations {
        let messages = list_messages(config, conv.id).await?;
        if let Some(excerpt) = first_user_excerpt(&messages, EXCERPT_CHARS) {
            digests.push(ConversationDigest {
                title: conv.title,
                excerpt,
            });
        }
    }
    Ok(digests)
}

/// Collect the day's commits and conversations and render them.
///
/// Git failures are errors. The conversation store is optional: a missing
/// database is skipped and a failing one is logged and skipped.
pub async fn generate_worklog(
    config: &Config,
    date: &EntryDate,
    workdir: Option<&Path>,
) -> Result<GeneratedWorklog> {
    let authors = config.tracked_emails();
    let commits = commits_for_date(date, &authors, workdir)?;

    let db_path = config.db_path();
    let digests = if db_path.exists() {
        match conversation_digests(config, date).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "skipping conversations");
                Vec::new()
            }
        }
    } else {
        tracing::debug!(path = %db_path.display(), "no conversation database");
        Vec::new()
    };

    let limit = config.generate.conversation_limit;
    let markdown = render_worklog(&commits, &digests, limit);
    let metadata = WorklogMetadata {
        commit_count: commits.len(),
        conversation_count: digests.len().min(limit),
        files_touched: commits.iter().map(|c| c.files).sum(),
        generated_at: Utc::now(),
    };
    tracing::info!(
        date = %date,
        commits = metadata.commit_count,
        conversations = metadata.conversation_count,
        "generated worklog"
    );

    Ok(GeneratedWorklog {
        date: *date,
        markdown,
        metadata,
    })
}

/// Merge a generated worklog into the journal at `path`.
pub fn write_generated(path: &Path, generated: &GeneratedWorklog) -> Result<WriteReport> {
    if generated.is_empty() {
        anyhow::bail!(
            "nothing to write for {}: no commits or conversations found",
            generated.date
        );
    }
    Ok(write_date_entry(path, &generated.date.to_string(), &generated.markdown)?)
}
