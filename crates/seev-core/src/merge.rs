//! Reconciles an existing entry with newly supplied content.
//!
//! Every rule keeps existing content first, in its original order, and
//! appends only what is new. Running [`merge`] with the same incoming model
//! a second time therefore adds nothing, which is what makes journal writes
//! idempotent.

use std::collections::HashSet;

use serde::Serialize;

use crate::render::weekly_lines;
use crate::section::{normalize_key, Entry, RawBlock, Section, SectionKind, SectionModel, WorkItem};

/// What happened to the weekly summary during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeeklySummaryOutcome {
    /// Neither side had a summary.
    Absent,
    /// The existing summary was kept and incoming had none.
    Kept,
    /// The incoming summary was adopted.
    Written,
    /// Incoming summary ignored: the week is already summarized.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub existing_bullets_preserved: usize,
    pub new_bullets_added: usize,
    pub deduplicated_count: usize,
    pub weekly_summary: WeeklySummaryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub sections: SectionModel,
    pub stats: MergeStats,
}

#[derive(Default)]
struct Tally {
    added: usize,
    deduplicated: usize,
}

/// Merge `incoming` into `existing`. Never fails.
pub fn merge(existing: &SectionModel, incoming: &SectionModel) -> MergeOutcome {
    let mut merged = existing.clone();
    let mut tally = Tally::default();

    for kind in SectionKind::PROSE {
        if let (Some(target), Some(source)) = (merged.prose_mut(kind), incoming.prose(kind)) {
            merge_prose(target, source, &mut tally);
        }
    }
    merge_work(&mut merged.technical_work, &incoming.technical_work, &mut tally);
    merged.recompute_metrics();

    let weekly = match (&existing.weekly_summary, &incoming.weekly_summary) {
        (None, None) => WeeklySummaryOutcome::Absent,
        (Some(_), None) => WeeklySummaryOutcome::Kept,
        (Some(old), Some(new))
            if old.week == new.week && (old.week.is_some() || old.text == new.text) =>
        {
            WeeklySummaryOutcome::Skipped
        }
        (old, Some(new)) => {
            // A summary for another week stays in the entry as raw text.
            if let Some(old) = old {
                merged.raw.push(RawBlock {
                    anchor: Some(SectionKind::WeeklySummary),
                    lines: weekly_lines(old),
                });
            }
            merged.weekly_summary = Some(new.clone());
            WeeklySummaryOutcome::Written
        }
    };

    merge_raw(&mut merged.raw, &incoming.raw);

    MergeOutcome {
        sections: merged,
        stats: MergeStats {
            existing_bullets_preserved: existing.bullet_count(),
            new_bullets_added: tally.added,
            deduplicated_count: tally.deduplicated,
            weekly_summary: weekly,
        },
    }
}

fn merge_prose(target: &mut Section<String>, source: &Section<String>, tally: &mut Tally) {
    merge_entries(target, source, |have, item| normalize_key(have) == normalize_key(item), tally);
}

fn merge_work(target: &mut Section<WorkItem>, source: &Section<WorkItem>, tally: &mut Tally) {
    merge_entries(target, source, WorkItem::same_work, tally);
}

/// Order-preserving merge of one section.
///
/// A note belongs to the item before it. Incoming notes are placed at the
/// end of their owner's group in the target, skipping any already in that
/// group, so a sub-bullet under a deduplicated item lands under the existing
/// copy. Notes ahead of every incoming item have no owner: they are checked
/// against the whole section and appended at its end.
fn merge_entries<T: Clone>(
    target: &mut Section<T>,
    source: &Section<T>,
    same: impl Fn(&T, &T) -> bool,
    tally: &mut Tally,
) {
    let mut owner: Option<usize> = None;
    let mut known = group_note_keys(target, owner);

    for entry in &source.entries {
        match entry {
            Entry::Item(item) => {
                let found = target
                    .entries
                    .iter()
                    .position(|e| matches!(e, Entry::Item(have) if same(have, item)));
                match found {
                    Some(pos) => {
                        tally.deduplicated += 1;
                        owner = Some(pos);
                    }
                    None => {
                        tally.added += 1;
                        target.push_item(item.clone());
                        owner = Some(target.entries.len() - 1);
                    }
                }
                known = group_note_keys(target, owner);
            }
            Entry::Note(text) => {
                if known.contains(&normalize_key(text)) {
                    continue;
                }
                let at = group_end(target, owner);
                target.entries.insert(at, Entry::Note(text.clone()));
            }
        }
    }
}

/// Index one past the notes owned by `owner`.
fn group_end<T>(section: &Section<T>, owner: Option<usize>) -> usize {
    let len = section.entries.len();
    match owner {
        None => len,
        Some(pos) => section.entries[pos + 1..]
            .iter()
            .position(|e| matches!(e, Entry::Item(_)))
            .map_or(len, |offset| pos + 1 + offset),
    }
}

fn group_note_keys<T>(section: &Section<T>, owner: Option<usize>) -> HashSet<String> {
    let from = owner.map_or(0, |pos| pos + 1);
    section.entries[from..group_end(section, owner)]
        .iter()
        .filter_map(|e| match e {
            Entry::Note(text) => Some(normalize_key(text)),
            Entry::Item(_) => None,
        })
        .collect()
}

fn merge_raw(target: &mut Vec<RawBlock>, source: &[RawBlock]) {
    let mut seen: HashSet<String> = target.iter().map(RawBlock::key).collect();
    for block in source {
        if seen.insert(block.key()) {
            target.push(block.clone());
        }
    }
}
