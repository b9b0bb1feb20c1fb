//! Plain-text layout of message attachments, shared by the TUI transcript
//! and the one-shot CLI output.

use mednexa_core::state::{cell_text, ChartPoint};
use mednexa_core::Agent;
use serde_json::{Map, Value};

/// Widest a single table column may grow before it is truncated.
const MAX_COLUMN_WIDTH: usize = 32;

/// Lay out a table as a header row, a rule, and one line per row.
pub fn table_lines(columns: &[&str], rows: &[&Map<String, Value>]) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| columns.iter().map(|c| cell_text(row.get(*c))).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join_row(columns.iter().map(|c| c.to_string()), &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("─┼─"),
    );
    for row in cells {
        lines.push(join_row(row.into_iter(), &widths));
    }
    lines
}

fn join_row(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| pad(&truncate(&cell, *width), *width))
        .collect::<Vec<_>>()
        .join(" │ ")
        .trim_end()
        .to_string()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}

/// Horizontal bar chart: `label │█████ value`, bars scaled to `bar_width`.
pub fn chart_lines(points: &[ChartPoint], bar_width: usize) -> Vec<String> {
    let label_width = points
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_COLUMN_WIDTH);
    let max = points.iter().map(|p| p.value).fold(0.0_f64, f64::max);

    points
        .iter()
        .map(|p| {
            let filled = if max > 0.0 && p.value > 0.0 {
                ((p.value / max) * bar_width as f64).round().max(1.0) as usize
            } else {
                0
            };
            format!(
                "{} │{} {}",
                pad(&truncate(&p.name, label_width), label_width),
                "█".repeat(filled),
                format_value(p.value)
            )
        })
        .collect()
}

/// `Sources: IQVIA Agent, Patent Agent`, or nothing when no agent is named.
pub fn sources_line(agents: &[Agent]) -> Option<String> {
    if agents.is_empty() {
        return None;
    }
    let names: Vec<&str> = agents.iter().map(Agent::display_name).collect();
    Some(format!("Sources: {}", names.join(", ")))
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
