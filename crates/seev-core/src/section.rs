//! The typed section model for one date entry.
//!
//! An entry is decomposed into a fixed set of [`SectionKind`]s. Prose
//! sections hold plain bullet text; Technical Work holds [`WorkItem`]s that
//! carry an extracted commit identifier and optional line stats; Metrics is
//! a derived [`Metrics`] record; the weekly summary is an opaque text blob
//! tagged with its ISO week. Anything the parser cannot classify is kept in
//! [`RawBlock`]s so it survives a rewrite.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Named subdivisions of a date entry, in canonical render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Goals,
    TechnicalWork,
    Metrics,
    Decisions,
    Impact,
    OpenItems,
    Learnings,
    WeeklySummary,
}

impl SectionKind {
    /// Daily sections in the order they are rendered.
    pub const DAILY: [SectionKind; 7] = [
        SectionKind::Goals,
        SectionKind::TechnicalWork,
        SectionKind::Metrics,
        SectionKind::Decisions,
        SectionKind::Impact,
        SectionKind::OpenItems,
        SectionKind::Learnings,
    ];

    /// Sections whose body is a plain list of prose bullets.
    pub const PROSE: [SectionKind; 5] = [
        SectionKind::Goals,
        SectionKind::Decisions,
        SectionKind::Impact,
        SectionKind::OpenItems,
        SectionKind::Learnings,
    ];

    /// Canonical `###` heading written by the renderer.
    pub fn heading(self) -> &'static str {
        match self {
            SectionKind::Goals => "### 🎯 Goals & Context",
            SectionKind::TechnicalWork => "### 💻 Technical Work",
            SectionKind::Metrics => "### 📊 Metrics",
            SectionKind::Decisions => "### 🔍 Key Decisions",
            SectionKind::Impact => "### ⚠️ Impact Assessment",
            SectionKind::OpenItems => "### 🚧 Open Items",
            SectionKind::Learnings => "### 📚 Learnings",
            SectionKind::WeeklySummary => "### 🗓️ Weekly Summary",
        }
    }

    /// Classify a level-3 heading line.
    ///
    /// Matching ignores case, any leading emoji or icon glyphs, a trailing
    /// colon, and a trailing parenthesized qualifier such as `(2025-W43)`.
    /// Returns `None` for unknown labels, for headings of other levels and
    /// for lines indented as code.
    pub fn from_heading(line: &str) -> Option<SectionKind> {
        if crate::parse::heading_level(line) != Some(3) {
            return None;
        }
        let rest = line.trim().strip_prefix("###")?;
        let mut label = rest.trim_start_matches(|c: char| !c.is_alphanumeric());
        if let Some(idx) = label.find('(') {
            label = &label[..idx];
        }
        let label = normalize_key(label.trim_end().trim_end_matches(':'));

        let kind = match label.as_str() {
            "goal" | "goals" | "goal & context" | "goals & context" | "goals and context"
            | "context" => SectionKind::Goals,
            "technical work" | "technical" => SectionKind::TechnicalWork,
            "metric" | "metrics" => SectionKind::Metrics,
            "key decision" | "key decisions" | "decision" | "decisions" => SectionKind::Decisions,
            "impact" | "impact assessment" => SectionKind::Impact,
            "open item" | "open items" => SectionKind::OpenItems,
            "learning" | "learnings" => SectionKind::Learnings,
            "weekly summary" => SectionKind::WeeklySummary,
            _ => return None,
        };
        Some(kind)
    }
}

/// Collapse internal whitespace, trim, and case-fold. Used only for
/// equality checks, never for display.
pub fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One line of a section body: either a bullet item or a verbatim note
/// (indented sub-bullets, emphasis lines, sub-headings) that the parser
/// keeps in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry<T> {
    Item(T),
    Note(String),
}

/// An ordered section body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<T> {
    pub entries: Vec<Entry<T>>,
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Section<T> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Item(item) => Some(item),
            Entry::Note(_) => None,
        })
    }

    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    pub fn push_item(&mut self, item: T) {
        self.entries.push(Entry::Item(item));
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.entries.push(Entry::Note(note.into()));
    }
}

/// Per-commit line statistics attached to a Technical Work item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemStats {
    pub additions: u64,
    pub deletions: u64,
    pub files: u64,
}

static STATS_DIFF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+(\d+)\s*/\s*[-−](\d+)").expect("valid diff stats regex"));
static STATS_FILES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)\s+files?\b").expect("valid file count regex"));

impl ItemStats {
    /// Read `+A/-D` and `N files` annotations from item text. Missing parts
    /// default to zero.
    ///
    /// The last occurrence of each wins, so numbers in a commit subject do
    /// not shadow the trailing `(sha, +A/-D, N files)` annotation.
    pub fn parse(text: &str) -> Self {
        let mut stats = ItemStats::default();
        if let Some(caps) = STATS_DIFF_RE.captures_iter(text).last() {
            stats.additions = caps[1].parse().unwrap_or(0);
            stats.deletions = caps[2].parse().unwrap_or(0);
        }
        if let Some(caps) = STATS_FILES_RE.captures_iter(text).last() {
            stats.files = caps[1].parse().unwrap_or(0);
        }
        stats
    }
}

static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // [abc123f](https://...) link text
        r"\[([0-9A-Fa-f]{7,40})\]",
        // `abc123f` inline code span
        r"`([0-9A-Fa-f]{7,40})`",
        // (https://host/org/repo/commit/abc123f...) link target
        r"/commits?/([0-9A-Fa-f]{7,40})\b",
        // abc123f - message / abc123f: message
        r"^([0-9A-Fa-f]{7,40})\s*[-:]",
        // Commit abc123f
        r"(?i)\bcommit\s+([0-9a-f]{7,40})\b",
        // message (abc123f)
        r"\(([0-9A-Fa-f]{7,40})[),]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid commit id regex"))
    .collect()
});

/// Extract a commit-hash-like identifier from item text.
///
/// The first pattern that yields a 7–40 character hex token containing at
/// least one digit wins. The result is lowercased.
pub fn extract_identifier(text: &str) -> Option<String> {
    for re in ID_PATTERNS.iter() {
        for caps in re.captures_iter(text) {
            let token = &caps[1];
            if token.bytes().any(|b| b.is_ascii_digit()) {
                return Some(token.to_ascii_lowercase());
            }
        }
    }
    None
}

/// Two identifiers refer to the same commit when one is a prefix of the
/// other (short and full hashes of one commit compare equal).
pub fn identifiers_match(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// A Technical Work bullet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Display text, exactly as written (without the bullet marker).
    pub text: String,
    pub id: Option<String>,
    pub stats: ItemStats,
}

impl WorkItem {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let id = extract_identifier(&text);
        let stats = ItemStats::parse(&text);
        Self { text, id, stats }
    }

    pub fn key(&self) -> String {
        normalize_key(&self.text)
    }

    /// Identifier match when both items carry one, normalized text
    /// otherwise.
    pub fn same_work(&self, other: &WorkItem) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => identifiers_match(a, b),
            _ => self.key() == other.key(),
        }
    }
}

/// Derived aggregate over the Technical Work items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
    pub files: u64,
}

impl Metrics {
    pub fn from_work(work: &Section<WorkItem>) -> Self {
        work.items().fold(Metrics::default(), |mut acc, item| {
            acc.commits = acc.commits.saturating_add(1);
            acc.additions = acc.additions.saturating_add(item.stats.additions);
            acc.deletions = acc.deletions.saturating_add(item.stats.deletions);
            acc.files = acc.files.saturating_add(item.stats.files);
            acc
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Metrics::default()
    }
}

/// Marker comment embedded in a rendered weekly summary.
pub const WEEKLY_MARKER_PREFIX: &str = "<!-- seev:weekly-summary";

static WEEKLY_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<!--\s*seev:weekly-summary\s+(\d{4}-W\d{2})\s*-->$")
        .expect("valid weekly marker regex")
});

/// If `line` is a weekly-summary marker, return its ISO week label.
pub fn weekly_marker_week(line: &str) -> Option<String> {
    WEEKLY_MARKER_RE
        .captures(line.trim())
        .map(|caps| caps[1].to_string())
}

pub fn weekly_marker(week: &str) -> String {
    format!("{WEEKLY_MARKER_PREFIX} {week} -->")
}

/// Opaque weekly summary text, written at most once per ISO week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySummary {
    /// ISO week label (`2025-W43`). `None` for summaries written without a
    /// marker; the journal stamps those with the entry's week.
    pub week: Option<String>,
    pub text: String,
}

/// Content the parser could not classify, kept verbatim.
///
/// `anchor` is the known section that preceded the block in the source
/// (`None` for text directly under the date heading). The renderer emits
/// the block immediately after that section's slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub anchor: Option<SectionKind>,
    pub lines: Vec<String>,
}

impl RawBlock {
    pub fn key(&self) -> String {
        normalize_key(&self.lines.join("\n"))
    }
}

/// The full decomposition of one date entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionModel {
    pub goals: Section<String>,
    pub technical_work: Section<WorkItem>,
    pub metrics: Metrics,
    pub decisions: Section<String>,
    pub impact: Section<String>,
    pub open_items: Section<String>,
    pub learnings: Section<String>,
    pub weekly_summary: Option<WeeklySummary>,
    pub raw: Vec<RawBlock>,
}

impl SectionModel {
    /// The prose section for `kind`, or `None` for kinds that are not plain
    /// bullet lists.
    pub fn prose(&self, kind: SectionKind) -> Option<&Section<String>> {
        match kind {
            SectionKind::Goals => Some(&self.goals),
            SectionKind::Decisions => Some(&self.decisions),
            SectionKind::Impact => Some(&self.impact),
            SectionKind::OpenItems => Some(&self.open_items),
            SectionKind::Learnings => Some(&self.learnings),
            _ => None,
        }
    }

    pub fn prose_mut(&mut self, kind: SectionKind) -> Option<&mut Section<String>> {
        match kind {
            SectionKind::Goals => Some(&mut self.goals),
            SectionKind::Decisions => Some(&mut self.decisions),
            SectionKind::Impact => Some(&mut self.impact),
            SectionKind::OpenItems => Some(&mut self.open_items),
            SectionKind::Learnings => Some(&mut self.learnings),
            _ => None,
        }
    }

    /// Bullets across prose sections and Technical Work.
    pub fn bullet_count(&self) -> usize {
        SectionKind::PROSE
            .iter()
            .filter_map(|k| self.prose(*k))
            .map(Section::item_count)
            .sum::<usize>()
            + self.technical_work.item_count()
    }

    /// True when nothing but raw passthrough (or nothing at all) was found.
    pub fn has_known_content(&self) -> bool {
        SectionKind::PROSE
                .iter()
                .filter_map(|k| self.prose(*k))
                .any(|s| !s.is_empty())
            || !self.technical_work.is_empty()
            || !self.metrics.is_empty()
            || self.weekly_summary.is_some()
    }

    pub fn recompute_metrics(&mut self) {
        self.metrics = Metrics::from_work(&self.technical_work);
    }

    /// Fill in the ISO week of an unmarked weekly summary.
    pub fn stamp_week(&mut self, week: &str) {
        if let Some(summary) = self.weekly_summary.as_mut() {
            if summary.week.is_none() {
                summary.week = Some(week.to_string());
            }
        }
    }
}
