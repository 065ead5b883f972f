//! Journal file access.
//!
//! This is the only module that touches the worklog file. Each operation
//! reads the whole document, runs the pure pipeline from `seev_core`, and
//! writes the result back atomically (temp file in the same directory,
//! fsync, rename). A failed write leaves the original file intact.

use chrono::Local;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use seev_core::{
    append_lines, locate, write_entry, AppendReport, Document, EntryDate, EntryReport, Metrics,
    Section, SectionModel, WeeklySummaryOutcome, WorklogError, WorklogResult,
};

/// Result of a section-aware write.
#[derive(Debug, Clone, Serialize)]
pub struct WriteReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub entry: EntryReport,
}

/// Result of a plain append.
#[derive(Debug, Clone, Serialize)]
pub struct AppendResult {
    pub path: PathBuf,
    #[serde(flatten)]
    pub append: AppendReport,
}

/// JSON view of one date entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub exists: bool,
    pub date: EntryDate,
    pub heading_line: Option<usize>,
    pub sections: SectionsView,
    pub raw_content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SectionsView {
    pub goals: Vec<String>,
    pub technical_work: Vec<String>,
    pub metrics: Metrics,
    pub decisions: Vec<String>,
    pub impact: Vec<String>,
    pub open_items: Vec<String>,
    pub learnings: Vec<String>,
    pub weekly_summary: Option<WeeklySummaryView>,
    /// Unclassified blocks, verbatim.
    pub raw: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummaryView {
    pub week: Option<String>,
    pub text: String,
}

impl From<&SectionModel> for SectionsView {
    fn from(model: &SectionModel) -> Self {
        let bullets =
            |section: &Section<String>| -> Vec<String> { section.items().cloned().collect() };
        Self {
            goals: bullets(&model.goals),
            technical_work: model.technical_work.items().map(|i| i.text.clone()).collect(),
            metrics: model.metrics,
            decisions: bullets(&model.decisions),
            impact: bullets(&model.impact),
            open_items: bullets(&model.open_items),
            learnings: bullets(&model.learnings),
            weekly_summary: model.weekly_summary.as_ref().map(|w| WeeklySummaryView {
                week: w.week.clone(),
                text: w.text.clone(),
            }),
            raw: model.raw.iter().map(|b| b.lines.join("\n")).collect(),
        }
    }
}

/// Read the journal. A missing file is an empty document.
pub fn load_document(path: &Path) -> WorklogResult<Document> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Document::parse(&text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
        Err(err) => Err(WorklogError::io(path, err)),
    }
}

/// Persist `doc` to `path` atomically, creating parent directories.
pub fn save_document(path: &Path, doc: &Document) -> WorklogResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| WorklogError::io(&parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| WorklogError::io(&parent, e))?;
    tmp.write_all(doc.to_text().as_bytes())
        .map_err(|e| WorklogError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| WorklogError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| WorklogError::io(path, e.error))?;
    Ok(())
}

/// Parsed view of the entry for `date`. An absent entry (or absent file)
/// is reported with `exists: false`; an invalid date is an error.
pub fn read_date_entry(path: &Path, date: &str) -> WorklogResult<EntrySnapshot> {
    let date = EntryDate::parse(date)?;
    let doc = load_document(path)?;

    Ok(match locate(&doc, &date) {
        Some(entry) => EntrySnapshot {
            exists: true,
            date,
            heading_line: Some(entry.heading_line()),
            sections: SectionsView::from(&entry.sections),
            raw_content: Some(entry.raw_content),
        },
        None => EntrySnapshot {
            exists: false,
            date,
            heading_line: None,
            sections: SectionsView::default(),
            raw_content: None,
        },
    })
}

/// Merge `content` into the entry for `date` and persist the journal.
///
/// Validation (date format, non-empty content) happens before the file is
/// touched.
pub fn write_date_entry(path: &Path, date: &str, content: &str) -> WorklogResult<WriteReport> {
    let date = EntryDate::parse(date)?;
    if content.trim().is_empty() {
        return Err(WorklogError::EmptyContent);
    }

    let mut doc = load_document(path)?;
    let entry = write_entry(&mut doc, &date, content)?;
    if entry.lines.is_none() {
        tracing::info!(date = %date, week = %date.iso_week(), "weekly summary already present, nothing written");
        return Ok(WriteReport {
            path: path.to_path_buf(),
            entry,
        });
    }
    save_document(path, &doc)?;

    tracing::info!(
        path = %path.display(),
        date = %date,
        heading_added = entry.heading_added,
        added = entry.stats.new_bullets_added,
        deduplicated = entry.stats.deduplicated_count,
        "wrote worklog entry"
    );
    if entry.stats.weekly_summary == WeeklySummaryOutcome::Skipped {
        tracing::info!(week = %date.iso_week(), "weekly summary already present, skipped");
    }

    Ok(WriteReport {
        path: path.to_path_buf(),
        entry,
    })
}

/// Append lines under `date` (today when `None`) without merging.
pub fn append_to_markdown(
    path: &Path,
    date: Option<&str>,
    content: &str,
    preserve_lines: bool,
) -> WorklogResult<AppendResult> {
    let date = match date {
        Some(d) => EntryDate::parse(d)?,
        None => today(),
    };
    if content.trim().is_empty() {
        return Err(WorklogError::EmptyContent);
    }

    let mut doc = load_document(path)?;
    let append = append_lines(&mut doc, &date, content, preserve_lines)?;
    save_document(path, &doc)?;

    tracing::debug!(
        path = %path.display(),
        date = %date,
        lines = append.content_added.len(),
        "appended to worklog"
    );

    Ok(AppendResult {
        path: path.to_path_buf(),
        append,
    })
}

/// The current local date.
pub fn today() -> EntryDate {
    EntryDate::from_naive(Local::now().date_naive())
}
