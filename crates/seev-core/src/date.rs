//! Calendar dates that key journal entries.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{WorklogError, WorklogResult};

/// A validated `YYYY-MM-DD` date identifying one journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct EntryDate(NaiveDate);

impl EntryDate {
    /// Parse a strict ISO date. Anything other than exactly `YYYY-MM-DD`
    /// (after trimming) is rejected.
    pub fn parse(value: &str) -> WorklogResult<Self> {
        let trimmed = value.trim();
        let well_shaped = trimmed.len() == 10
            && trimmed
                .bytes()
                .enumerate()
                .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
        if !well_shaped {
            return Err(WorklogError::InvalidDate(value.to_string()));
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(EntryDate)
            .map_err(|_| WorklogError::InvalidDate(value.to_string()))
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        EntryDate(date)
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    /// The level-2 heading that introduces this date's entry.
    pub fn heading(&self) -> String {
        format!("## {}", self)
    }

    /// ISO week label such as `2025-W43`.
    pub fn iso_week(&self) -> String {
        let week = self.0.iso_week();
        format!("{:04}-W{:02}", week.year(), week.week())
    }
}

impl fmt::Display for EntryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for EntryDate {
    type Err = WorklogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryDate::parse(s)
    }
}

impl From<EntryDate> for String {
    fn from(date: EntryDate) -> Self {
        date.to_string()
    }
}

/// If `line` is a date heading (`## YYYY-MM-DD`), return the date. Lines
/// indented as code are not headings.
pub fn date_heading(line: &str) -> Option<EntryDate> {
    if crate::parse::heading_level(line) != Some(2) {
        return None;
    }
    let rest = line.trim().strip_prefix("## ")?;
    EntryDate::parse(rest).ok()
}
