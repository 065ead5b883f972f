//! Markdown parser: locates date entries and decomposes them into a
//! [`SectionModel`].
//!
//! The parser is a line classifier. Each line is one of: a known level-3
//! section heading, an unknown level-3 heading (starts a raw block), a bullet
//! (`- ` / `* ` at column zero), a blank, or anything else. Fenced code
//! blocks are opaque: nothing inside them is treated as a heading or bullet.
//!
//! Parsing never fails. Content that does not fit the model is kept in
//! [`RawBlock`]s or section notes so a rewrite never drops text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::date::{date_heading, EntryDate};
use crate::document::Document;
use crate::error::{WorklogError, WorklogResult};
use crate::section::{
    weekly_marker_week, RawBlock, SectionKind, SectionModel, WeeklySummary, WorkItem,
};

/// One date's block within a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateEntry {
    pub date: EntryDate,
    /// Index of the `## YYYY-MM-DD` heading line (0-based).
    pub start_line: usize,
    /// One past the last line of the entry (0-based, exclusive).
    pub end_line: usize,
    pub sections: SectionModel,
    /// Body text under the heading, verbatim.
    pub raw_content: String,
}

impl DateEntry {
    /// 1-based line number of the heading.
    pub fn heading_line(&self) -> usize {
        self.start_line + 1
    }
}

/// Find the entry for `date`. Returns `None` when the document has no
/// heading for that date; this is the normal first-write case.
pub fn locate(doc: &Document, date: &EntryDate) -> Option<DateEntry> {
    let lines = doc.lines();
    let start = find_heading(lines, date)?;
    let end = entry_end(lines, start);
    let body = &lines[start + 1..end];

    Some(DateEntry {
        date: *date,
        start_line: start,
        end_line: end,
        sections: scan(body.iter().map(String::as_str)),
        raw_content: body.join("\n"),
    })
}

/// Parse caller-supplied content into a model.
///
/// A leading `## YYYY-MM-DD` heading (as produced by generators that emit a
/// whole entry) is skipped. Any other level-1 or level-2 heading, including
/// a later date heading, is demoted to level 3 so the content can never
/// split the journal into extra entries.
pub fn parse_block(text: &str) -> SectionModel {
    let (lines, _) = prepare_block(text, DateHeadings::Leading);
    scan(lines.iter().map(String::as_str))
}

/// Parse content written to the entry for `date`.
///
/// Headings for `date` itself are skipped wherever they appear. A heading
/// for any other date is rejected with [`WorklogError::ForeignDate`].
pub fn parse_entry_block(text: &str, date: &EntryDate) -> WorklogResult<SectionModel> {
    let (lines, foreign) = prepare_block(text, DateHeadings::Only(date));
    match foreign {
        Some(found) => Err(WorklogError::ForeignDate {
            expected: *date,
            found,
        }),
        None => Ok(scan(lines.iter().map(String::as_str))),
    }
}

#[derive(Clone, Copy)]
enum DateHeadings<'a> {
    /// Skip a date heading before any content; demote later ones.
    Leading,
    /// Skip headings for this date; report the first other date.
    Only(&'a EntryDate),
}

/// Normalize newlines and rewrite level-1/2 headings outside code fences.
fn prepare_block(text: &str, dates: DateHeadings<'_>) -> (Vec<String>, Option<EntryDate>) {
    let normalized = crate::document::normalize_newlines(text);
    let mut in_fence = false;
    let mut lines: Vec<String> = Vec::new();
    let mut foreign = None;

    for line in normalized.split('\n') {
        if is_fence(line) {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some(found) = date_heading(line) {
                let skip = match dates {
                    DateHeadings::Leading => lines.iter().all(|l| l.trim().is_empty()),
                    DateHeadings::Only(date) => {
                        if found != *date && foreign.is_none() {
                            foreign = Some(found);
                        }
                        true
                    }
                };
                if skip {
                    continue;
                }
            }
            if let Some(level @ (1 | 2)) = heading_level(line) {
                let title = line.trim_start()[level..].trim();
                lines.push(format!("### {title}"));
                continue;
            }
        }
        lines.push(line.to_string());
    }
    (lines, foreign)
}

pub(crate) fn find_heading(lines: &[String], date: &EntryDate) -> Option<usize> {
    let heading = date.heading();
    let mut in_fence = false;
    for (i, line) in lines.iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence && heading_level(line) == Some(2) && line.trim() == heading {
            return Some(i);
        }
    }
    None
}

/// The entry that starts at `start` runs until the next level-1 or level-2
/// heading, or the end of the document.
pub(crate) fn entry_end(lines: &[String], start: usize) -> usize {
    let mut in_fence = false;
    for (offset, line) in lines[start + 1..].iter().enumerate() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence && matches!(heading_level(line), Some(1 | 2)) {
            return start + 1 + offset;
        }
    }
    lines.len()
}

/// ATX heading level of `line`, if it is one.
///
/// More than three columns of indentation (a tab counts as four) makes the
/// line an indented code block, not a heading.
pub(crate) fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let indent: usize = line[..line.len() - trimmed.len()]
        .bytes()
        .map(|b| if b == b'\t' { 4 } else { 1 })
        .sum();
    if indent > 3 {
        return None;
    }
    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
        Some(hashes)
    } else {
        None
    }
}

pub(crate) fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Text of a top-level bullet line, without its marker.
fn bullet_text(line: &str) -> Option<&str> {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .map(str::trim)
}

static COMMITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+commits?\b").expect("valid commits regex"));
static ADD_DEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s+additions?\b.*?(\d+)\s+deletions?\b").expect("valid additions regex")
});
static FILES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+files?\b").expect("valid files regex"));

#[derive(Clone, Copy)]
enum Cursor {
    Preamble,
    Known(SectionKind),
    Weekly,
    Raw(Option<SectionKind>),
}

struct Scanner {
    model: SectionModel,
    cursor: Cursor,
    last_known: Option<SectionKind>,
    pending: Vec<String>,
    in_fence: bool,
    /// A blank line was seen since the last entry of the current section.
    gap: bool,
}

fn scan<'a>(lines: impl Iterator<Item = &'a str>) -> SectionModel {
    let mut scanner = Scanner {
        model: SectionModel::default(),
        cursor: Cursor::Preamble,
        last_known: None,
        pending: Vec::new(),
        in_fence: false,
        gap: false,
    };
    for line in lines {
        scanner.line(line.trim_end());
    }
    scanner.flush();
    scanner.model
}

impl Scanner {
    fn line(&mut self, line: &str) {
        if !self.in_fence {
            if let Some(kind) = SectionKind::from_heading(line) {
                self.flush();
                if kind == SectionKind::WeeklySummary {
                    self.pending.push(line.to_string());
                    self.cursor = Cursor::Weekly;
                } else {
                    self.cursor = Cursor::Known(kind);
                }
                self.last_known = Some(kind);
                return;
            }
            if heading_level(line) == Some(3) {
                self.flush();
                self.cursor = Cursor::Raw(self.last_known);
                self.pending.push(line.to_string());
                return;
            }
        }

        let fence_line = is_fence(line);
        if fence_line {
            self.in_fence = !self.in_fence;
        }
        let verbatim = fence_line || self.in_fence;

        match self.cursor {
            Cursor::Preamble | Cursor::Raw(_) | Cursor::Weekly => {
                self.pending.push(line.to_string());
            }
            Cursor::Known(kind) => self.absorb(kind, line, verbatim),
        }
    }

    fn absorb(&mut self, kind: SectionKind, line: &str, verbatim: bool) {
        if verbatim {
            self.push_note(kind, line);
            return;
        }
        if line.trim().is_empty() {
            self.gap = true;
            return;
        }
        if kind == SectionKind::Metrics {
            self.absorb_metric(line);
            return;
        }
        match bullet_text(line) {
            Some("") => {}
            Some(text) => {
                self.gap = false;
                if kind == SectionKind::TechnicalWork {
                    self.model.technical_work.push_item(WorkItem::new(text));
                } else if let Some(section) = self.model.prose_mut(kind) {
                    section.push_item(text.to_string());
                }
            }
            None => self.push_note(kind, line),
        }
    }

    /// Metrics are derived data: only the recognised counters are read,
    /// everything else in the section is discarded on rewrite.
    fn absorb_metric(&mut self, line: &str) {
        let metrics = &mut self.model.metrics;
        if let Some(caps) = ADD_DEL_RE.captures(line) {
            metrics.additions = caps[1].parse().unwrap_or(0);
            metrics.deletions = caps[2].parse().unwrap_or(0);
        } else if let Some(caps) = COMMITS_RE.captures(line) {
            metrics.commits = caps[1].parse().unwrap_or(0);
        } else if let Some(caps) = FILES_RE.captures(line) {
            metrics.files = caps[1].parse().unwrap_or(0);
        }
    }

    /// A note that followed a blank line inside the section keeps it as a
    /// leading `\n`, so separate paragraphs stay separate on rewrite.
    fn push_note(&mut self, kind: SectionKind, line: &str) {
        let gap = std::mem::take(&mut self.gap);
        let note = |empty: bool| {
            if gap && !empty {
                format!("\n{line}")
            } else {
                line.to_string()
            }
        };
        if kind == SectionKind::TechnicalWork {
            let empty = self.model.technical_work.is_empty();
            self.model.technical_work.push_note(note(empty));
        } else if let Some(section) = self.model.prose_mut(kind) {
            let empty = section.is_empty();
            section.push_note(note(empty));
        }
    }

    fn flush(&mut self) {
        let lines = trim_blank_edges(std::mem::take(&mut self.pending));
        match self.cursor {
            Cursor::Known(_) => {}
            Cursor::Preamble => self.push_raw(None, lines),
            Cursor::Raw(anchor) => self.push_raw(anchor, lines),
            Cursor::Weekly => self.flush_weekly(lines),
        }
        self.in_fence = false;
        self.gap = false;
    }

    fn push_raw(&mut self, anchor: Option<SectionKind>, lines: Vec<String>) {
        if !lines.is_empty() {
            self.model.raw.push(RawBlock { anchor, lines });
        }
    }

    /// `lines[0]` is the heading. A second weekly block in the same entry
    /// is kept as raw text rather than overwriting the first.
    fn flush_weekly(&mut self, lines: Vec<String>) {
        if self.model.weekly_summary.is_some() {
            self.push_raw(Some(SectionKind::WeeklySummary), lines);
            return;
        }
        let mut week = None;
        let mut body = Vec::new();
        for line in lines.into_iter().skip(1) {
            match weekly_marker_week(&line) {
                Some(w) if week.is_none() => week = Some(w),
                _ => body.push(line),
            }
        }
        let text = trim_blank_edges(body).join("\n");
        if week.is_some() || !text.is_empty() {
            self.model.weekly_summary = Some(WeeklySummary { week, text });
        }
    }
}

pub(crate) fn trim_blank_edges(mut lines: Vec<String>) -> Vec<String> {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.trim().is_empty()).count();
    lines.drain(..leading);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{Entry, Metrics};

    fn doc(text: &str) -> Document {
        Document::parse(text)
    }

    fn date(s: &str) -> EntryDate {
        EntryDate::parse(s).unwrap()
    }

    #[test]
    fn test_locate_not_found() {
        let d = doc("# Worklog\n\n## 2025-10-21\n\n- a\n");
        assert!(locate(&d, &date("2025-10-22")).is_none());
        assert!(locate(&Document::default(), &date("2025-10-22")).is_none());
    }

    #[test]
    fn test_locate_range_stops_at_next_entry() {
        let d = doc("## 2025-10-21\n\n### Goals\n\n- a\n\n## 2025-10-22\n\n- b\n");
        let entry = locate(&d, &date("2025-10-21")).unwrap();
        assert_eq!(entry.start_line, 0);
        assert_eq!(entry.end_line, 6);
        assert_eq!(entry.heading_line(), 1);
        assert_eq!(entry.sections.goals.items().collect::<Vec<_>>(), vec!["a"]);

        let last = locate(&d, &date("2025-10-22")).unwrap();
        assert_eq!(last.start_line, 6);
        assert_eq!(last.end_line, d.lines().len());
        assert!(last.start_line < last.end_line);
    }

    #[test]
    fn test_locate_ignores_headings_in_code_fences() {
        let d = doc("## 2025-10-22\n\n### Notes\n\n```md\n## 2025-10-23\n```\n\n## 2025-10-23\n");
        let entry = locate(&d, &date("2025-10-22")).unwrap();
        assert_eq!(entry.end_line, 8);
        let next = locate(&d, &date("2025-10-23")).unwrap();
        assert_eq!(next.start_line, 8);
    }

    #[test]
    fn test_sections_and_bullets() {
        let d = doc(
            "## 2025-10-22\n\n\
             ### 🎯 Goals & Context\n\n- Refactor auth module\n* Second goal\n\n\
             ### 💻 Technical Work\n\n- Fix login (`abc123f`, +3/-1, 1 file)\n  - nested detail\n\n\
             ### 📊 Metrics\n\n- **1 commits**\n- **3 additions, 1 deletions**\n- **1 files changed**\n- **Languages:** Rust\n\n\
             ### 📚 Learnings\n\n-   spaced   out  \n",
        );
        let s = locate(&d, &date("2025-10-22")).unwrap().sections;
        assert_eq!(s.goals.items().collect::<Vec<_>>(), vec!["Refactor auth module", "Second goal"]);
        let work: Vec<_> = s.technical_work.items().collect();
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].id.as_deref(), Some("abc123f"));
        assert_eq!(s.technical_work.entries[1], Entry::Note("  - nested detail".into()));
        assert_eq!(s.metrics, Metrics { commits: 1, additions: 3, deletions: 1, files: 1 });
        assert_eq!(s.learnings.items().collect::<Vec<_>>(), vec!["spaced   out"]);
        assert!(s.raw.is_empty());
    }

    #[test]
    fn test_unknown_subsection_kept_with_anchor() {
        let d = doc(
            "## 2025-10-22\n\nfree text under heading\n\n### Goals\n\n- g\n\n### Retro\n\nwent well\n\n- kept bullet\n\n### Learnings\n\n- l\n",
        );
        let s = locate(&d, &date("2025-10-22")).unwrap().sections;
        assert_eq!(s.raw.len(), 2);
        assert_eq!(s.raw[0].anchor, None);
        assert_eq!(s.raw[0].lines, vec!["free text under heading"]);
        assert_eq!(s.raw[1].anchor, Some(SectionKind::Goals));
        assert_eq!(s.raw[1].lines, vec!["### Retro", "", "went well", "", "- kept bullet"]);
        assert_eq!(s.learnings.item_count(), 1);
    }

    #[test]
    fn test_heading_without_subsections_degrades_to_raw() {
        let d = doc("## 2025-10-22\n\nJust some notes.\n- a loose bullet\n");
        let entry = locate(&d, &date("2025-10-22")).unwrap();
        assert!(!entry.sections.has_known_content());
        assert_eq!(entry.sections.raw.len(), 1);
        assert_eq!(entry.sections.raw[0].lines, vec!["Just some notes.", "- a loose bullet"]);
        assert_eq!(entry.raw_content, "\nJust some notes.\n- a loose bullet");
    }

    #[test]
    fn test_weekly_summary_marker() {
        let d = doc(
            "## 2025-10-24\n\n### 🗓️ Weekly Summary\n\n<!-- seev:weekly-summary 2025-W43 -->\nShipped auth.\n\nNext: billing.\n",
        );
        let s = locate(&d, &date("2025-10-24")).unwrap().sections;
        let weekly = s.weekly_summary.unwrap();
        assert_eq!(weekly.week.as_deref(), Some("2025-W43"));
        assert_eq!(weekly.text, "Shipped auth.\n\nNext: billing.");
    }

    #[test]
    fn test_weekly_summary_without_marker() {
        let s = parse_block("### Weekly Summary\n\nA quiet week.\n");
        let weekly = s.weekly_summary.unwrap();
        assert_eq!(weekly.week, None);
        assert_eq!(weekly.text, "A quiet week.");
    }

    #[test]
    fn test_parse_block_skips_date_heading_and_demotes_others() {
        let s = parse_block("## 2025-10-22\n\n### Goals\n- g\n\n## Side quest\n- s\n");
        assert_eq!(s.goals.item_count(), 1);
        assert_eq!(s.raw.len(), 1);
        assert_eq!(s.raw[0].lines, vec!["### Side quest", "- s"]);
    }

    #[test]
    fn test_parse_block_demotes_later_date_heading() {
        let s = parse_block("### Goals\n- g\n\n## 2025-10-23\n- x\n");
        assert_eq!(s.goals.items().collect::<Vec<_>>(), vec!["g"]);
        assert_eq!(s.raw[0].lines, vec!["### 2025-10-23", "- x"]);
    }

    #[test]
    fn test_parse_entry_block_checks_dates() {
        let s = parse_entry_block("## 2025-10-22\n### Goals\n- g\n", &date("2025-10-22")).unwrap();
        assert_eq!(s.goals.item_count(), 1);
        assert!(s.raw.is_empty());

        let err = parse_entry_block("### Goals\n- g\n## 2025-10-23\n- x\n", &date("2025-10-22")).unwrap_err();
        assert!(matches!(err, WorklogError::ForeignDate { .. }));

        let fenced = parse_entry_block("### Learnings\n```md\n## 2025-10-23\n```\n", &date("2025-10-22"));
        assert!(fenced.is_ok());
    }

    #[test]
    fn test_indented_headings_are_text() {
        let d = doc("## 2025-10-21\n\nExample format:\n\n    ## 2025-10-22\n    ### Goals\n\n- real bullet of 21\n");
        assert!(locate(&d, &date("2025-10-22")).is_none());
        let entry = locate(&d, &date("2025-10-21")).unwrap();
        assert_eq!(entry.end_line, d.lines().len());
        assert!(!entry.sections.has_known_content());

        let s = parse_block("### Learnings\n- a\n    ### Goals\n");
        assert_eq!(s.learnings.entries[1], Entry::Note("    ### Goals".into()));
        assert!(s.goals.is_empty());
    }

    #[test]
    fn test_blank_line_before_note_is_kept() {
        let s = parse_block("### Learnings\n\n- a\n\nPara one.\n\nPara two.\n- b\n\n");
        assert_eq!(
            s.learnings.entries,
            vec![
                Entry::Item("a".to_string()),
                Entry::Note("\nPara one.".into()),
                Entry::Note("\nPara two.".into()),
                Entry::Item("b".to_string()),
            ]
        );
        let lead = parse_block("### Learnings\n\nJust prose.\n");
        assert_eq!(lead.learnings.entries, vec![Entry::Note("Just prose.".into())]);
    }

    #[test]
    fn test_parse_block_crlf() {
        let s = parse_block("### Goals\r\n- one\r\n- two\r\n");
        assert_eq!(s.goals.items().collect::<Vec<_>>(), vec!["one", "two"]);
    }

    #[test]
    fn test_fenced_code_in_section_kept_verbatim() {
        let s = parse_block("### Learnings\n\n- use fences\n```sh\n- not a bullet\n\n### not a heading\n```\n");
        assert_eq!(s.learnings.item_count(), 1);
        let notes: Vec<_> = s
            .learnings
            .entries
            .iter()
            .filter_map(|e| match e {
                Entry::Note(n) => Some(n.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(notes, vec!["```sh", "- not a bullet", "", "### not a heading", "```"]);
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level("## x"), Some(2));
        assert_eq!(heading_level("###"), Some(3));
        assert_eq!(heading_level("   ### x"), Some(3));
        assert_eq!(heading_level("#hashtag"), None);
        assert_eq!(heading_level("    ## code"), None);
        assert_eq!(heading_level("\t## code"), None);
    }
}
