//! The whole journal as an in-memory list of lines, and the two write paths
//! that splice into it: [`write_entry`] (section-aware merge) and
//! [`append_lines`] (plain append under a date heading).

use std::ops::Range;

use serde::Serialize;

use crate::date::EntryDate;
use crate::error::{WorklogError, WorklogResult};
use crate::merge::{merge, MergeStats, WeeklySummaryOutcome};
use crate::parse::{entry_end, find_heading, heading_level, locate, parse_entry_block};
use crate::render::render;
use crate::section::{weekly_marker_week, SectionModel};

/// Convert CRLF and lone CR line endings to LF.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// A Markdown journal held as LF-separated lines.
///
/// The final newline of the source text is not represented as an empty
/// trailing line; [`Document::to_text`] adds it back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        let normalized = normalize_newlines(text);
        if normalized.is_empty() {
            return Self::default();
        }
        let mut lines: Vec<String> = normalized.split('\n').map(str::to_string).collect();
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Serialize with LF endings and exactly one trailing newline.
    pub fn to_text(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    fn splice(&mut self, range: Range<usize>, replacement: Vec<String>) {
        self.lines.splice(range, replacement);
    }

    /// Append a block at EOF, separated from existing content by one blank
    /// line. Returns the index of the first appended line.
    fn push_block(&mut self, block: Vec<String>) -> usize {
        if self.lines.last().is_some_and(|l| !l.trim().is_empty()) {
            self.lines.push(String::new());
        }
        let start = self.lines.len();
        self.lines.extend(block);
        start
    }

    /// True if a weekly-summary marker for `week` appears outside `skip`.
    fn has_weekly_marker(&self, week: &str, skip: Option<Range<usize>>) -> bool {
        self.lines.iter().enumerate().any(|(i, line)| {
            !skip.as_ref().is_some_and(|r| r.contains(&i))
                && weekly_marker_week(line).as_deref() == Some(week)
        })
    }
}

/// Inclusive 1-based line span of a written entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub date: EntryDate,
    pub heading_added: bool,
    #[serde(flatten)]
    pub stats: MergeStats,
    /// `None` when nothing was written.
    pub lines: Option<LineRange>,
}

/// Merge `content` into the entry for `date`, creating the entry at the end
/// of the document if it does not exist yet.
///
/// Lines outside the target entry are never modified. Writing the same
/// content twice leaves the document byte-identical after the first write.
/// When the content reduces to nothing for a date that has no entry (its
/// weekly summary was skipped, for example) the document is left untouched.
pub fn write_entry(doc: &mut Document, date: &EntryDate, content: &str) -> WorklogResult<EntryReport> {
    if content.trim().is_empty() {
        return Err(WorklogError::EmptyContent);
    }
    let mut incoming = parse_entry_block(content, date)?;
    if incoming == SectionModel::default() {
        return Err(WorklogError::EmptyContent);
    }

    let week = date.iso_week();
    incoming.stamp_week(&week);

    let located = locate(doc, date);
    let own_range = located.as_ref().map(|e| e.start_line..e.end_line);

    // A week is summarized once per document, not once per entry.
    let incoming_week = incoming.weekly_summary.as_ref().and_then(|s| s.week.clone());
    let weekly_elsewhere = incoming_week
        .is_some_and(|w| doc.has_weekly_marker(&w, own_range.clone()));
    if weekly_elsewhere {
        incoming.weekly_summary = None;
    }

    let mut existing = located
        .as_ref()
        .map(|entry| entry.sections.clone())
        .unwrap_or_default();
    existing.stamp_week(&week);

    let mut outcome = merge(&existing, &incoming);
    if weekly_elsewhere {
        outcome.stats.weekly_summary = WeeklySummaryOutcome::Skipped;
    }

    let body = render(&outcome.sections);
    if located.is_none() && body.is_empty() {
        if outcome.stats.weekly_summary == WeeklySummaryOutcome::Skipped {
            return Ok(EntryReport {
                date: *date,
                heading_added: false,
                stats: outcome.stats,
                lines: None,
            });
        }
        return Err(WorklogError::EmptyContent);
    }

    let mut block = vec![date.heading()];
    if !body.is_empty() {
        block.push(String::new());
        block.extend(body.split('\n').map(str::to_string));
    }
    let entry_len = block.len();

    let start = match own_range {
        Some(range) => {
            if range.end < doc.lines.len() {
                block.push(String::new());
            }
            let start = range.start;
            doc.splice(range, block);
            start
        }
        None => doc.push_block(block),
    };

    Ok(EntryReport {
        date: *date,
        heading_added: located.is_none(),
        stats: outcome.stats,
        lines: Some(LineRange {
            start: start + 1,
            end: start + entry_len,
        }),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendReport {
    pub date: EntryDate,
    pub heading_added: bool,
    /// 1-based line number of the `## date` heading after the write.
    pub heading_line: usize,
    pub content_added: Vec<String>,
    /// 1-based line numbers of `content_added`.
    pub line_numbers_added: Vec<usize>,
}

/// Append `content` at the end of the entry for `date` without any merging.
///
/// Each non-blank line becomes a `- ` bullet, or is written as-is when
/// `preserve_lines` is set (useful for writing `###` headings). The heading
/// is created at the end of the document when missing.
pub fn append_lines(
    doc: &mut Document,
    date: &EntryDate,
    content: &str,
    preserve_lines: bool,
) -> WorklogResult<AppendReport> {
    let added: Vec<String> = normalize_newlines(content)
        .split('\n')
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            if preserve_lines {
                line.to_string()
            } else {
                format!("- {}", line.trim())
            }
        })
        .collect();
    if added.is_empty() {
        return Err(WorklogError::EmptyContent);
    }

    let existing = find_heading(&doc.lines, date);

    let (heading_idx, first) = match existing {
        None => {
            let mut block = vec![date.heading(), String::new()];
            block.extend(added.iter().cloned());
            let heading_idx = doc.push_block(block);
            (heading_idx, heading_idx + 2)
        }
        Some(heading_idx) => {
            let end = entry_end(&doc.lines, heading_idx);
            let mut insert_at = end;
            while insert_at > heading_idx + 1 && doc.lines[insert_at - 1].trim().is_empty() {
                insert_at -= 1;
            }

            let mut block = Vec::new();
            if heading_level(&doc.lines[insert_at - 1]).is_some() {
                block.push(String::new());
            }
            let first = insert_at + block.len();
            block.extend(added.iter().cloned());
            if doc.lines.get(insert_at).is_some_and(|l| !l.trim().is_empty()) {
                block.push(String::new());
            }
            doc.splice(insert_at..insert_at, block);
            (heading_idx, first)
        }
    };

    Ok(AppendReport {
        date: *date,
        heading_added: existing.is_none(),
        heading_line: heading_idx + 1,
        line_numbers_added: (first + 1..=first + added.len()).collect(),
        content_added: added,
    })
}
