//! # seev core
//!
//! Pure logic for the seev worklog journal: the per-date section model,
//! the Markdown parser that locates and decomposes date entries, the merge
//! engine that reconciles an existing entry with newly generated content,
//! the canonical renderer, and the document splicer.
//!
//! This crate performs no filesystem, process, or database I/O. Everything
//! operates on an in-memory [`Document`] so the parse → merge → render →
//! splice pipeline can be exercised without touching disk.
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │  parse   │──▶│  merge   │──▶│  render  │──▶│  splice  │
//! │ locate() │   │ merge()  │   │ render() │   │ Document │
//! └──────────┘   └──────────┘   └──────────┘   └──────────┘
//! ```

pub mod date;
pub mod document;
pub mod error;
pub mod merge;
pub mod parse;
pub mod render;
pub mod section;

pub use date::EntryDate;
pub use document::{append_lines, write_entry, AppendReport, Document, EntryReport, LineRange};
pub use error::{WorklogError, WorklogResult};
pub use merge::{merge, MergeOutcome, MergeStats, WeeklySummaryOutcome};
pub use parse::{locate, parse_block, parse_entry_block, DateEntry};
pub use render::render;
pub use section::{
    Entry, ItemStats, Metrics, RawBlock, Section, SectionKind, SectionModel, WeeklySummary,
    WorkItem,
};
