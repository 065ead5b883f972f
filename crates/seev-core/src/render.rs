//! Canonical Markdown rendering of a [`SectionModel`].

use crate::section::{
    weekly_marker, Entry, Metrics, RawBlock, Section, SectionKind, SectionModel, WeeklySummary,
    WorkItem,
};

/// Render the body of a date entry (everything below the `## date` line).
///
/// Blocks are separated by exactly one blank line and the result has no
/// trailing newline. Empty sections are omitted. Raw blocks follow the
/// section they were anchored to, in their original order.
pub fn render(model: &SectionModel) -> String {
    let mut blocks: Vec<String> = Vec::new();
    push_raw(&mut blocks, &model.raw, None);

    for kind in SectionKind::DAILY {
        if let Some(body) = section_body(model, kind) {
            blocks.push(format!("{}\n\n{}", kind.heading(), body));
        }
        push_raw(&mut blocks, &model.raw, Some(kind));
    }

    if let Some(summary) = &model.weekly_summary {
        blocks.push(weekly_lines(summary).join("\n"));
    }
    push_raw(&mut blocks, &model.raw, Some(SectionKind::WeeklySummary));

    blocks.join("\n\n")
}

/// The weekly summary block, heading first.
pub(crate) fn weekly_lines(summary: &WeeklySummary) -> Vec<String> {
    let mut lines = vec![SectionKind::WeeklySummary.heading().to_string(), String::new()];
    if let Some(week) = &summary.week {
        lines.push(weekly_marker(week));
    }
    if !summary.text.is_empty() {
        lines.extend(summary.text.split('\n').map(str::to_string));
    }
    lines
}

fn section_body(model: &SectionModel, kind: SectionKind) -> Option<String> {
    match kind {
        SectionKind::TechnicalWork => render_entries(&model.technical_work, |item: &WorkItem| {
            item.text.as_str()
        }),
        SectionKind::Metrics => render_metrics(&model.metrics),
        SectionKind::WeeklySummary => None,
        _ => model
            .prose(kind)
            .and_then(|section| render_entries(section, String::as_str)),
    }
}

fn render_entries<T>(section: &Section<T>, text: impl Fn(&T) -> &str) -> Option<String> {
    if section.is_empty() {
        return None;
    }
    let lines: Vec<String> = section
        .entries
        .iter()
        .map(|entry| match entry {
            Entry::Item(item) => format!("- {}", text(item)),
            Entry::Note(note) => note.clone(),
        })
        .collect();
    // The heading is already followed by a blank line.
    Some(lines.join("\n").trim_start_matches('\n').to_string())
}

fn render_metrics(metrics: &Metrics) -> Option<String> {
    if metrics.is_empty() {
        return None;
    }
    Some(format!(
        "- **{} commits**\n- **{} additions, {} deletions**\n- **{} files changed**",
        metrics.commits, metrics.additions, metrics.deletions, metrics.files
    ))
}

fn push_raw(blocks: &mut Vec<String>, raw: &[RawBlock], anchor: Option<SectionKind>) {
    blocks.extend(
        raw.iter()
            .filter(|block| block.anchor == anchor)
            .map(|block| block.lines.join("\n")),
    );
}
