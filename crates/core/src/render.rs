//! Plain-text display of views: aligned tables and a small line chart.

use crate::dashboard::{ChartSeries, DashboardError, View};
use crate::endpoint::Layout;
use crate::normalize::{Cell, NormalizedTable};
use std::fmt::Write as _;

const MAX_CELL_WIDTH: usize = 40;
pub const CHART_WIDTH: usize = 60;
pub const CHART_HEIGHT: usize = 12;

pub fn view(view: &View) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", "-".repeat(view.title.chars().count()));
    let _ = writeln!(out, "{}\n", view.subtitle);

    out.push_str(&table(&view.table, view.layout, view.index_label));
    if view.table.len() < view.total_rows {
        let _ = writeln!(out, "({} of {} rows)", view.table.len(), view.total_rows);
    }

    if let Some(chart) = &view.chart {
        out.push('\n');
        out.push_str(&line_chart(chart, CHART_WIDTH, CHART_HEIGHT));
    }
    if let Some(description) = &view.description {
        let _ = writeln!(out, "\nCompany Description:\n{description}");
    }
    if let Some(caption) = &view.caption {
        let _ = writeln!(out, "\n{caption}");
    }
    out
}

/// Warning text for a failed action, with the raw payload when there is one.
pub fn error(err: &DashboardError) -> String {
    let mut out = format!("Error: {err}\n");
    if let Some(hint) = err.hint() {
        let _ = writeln!(out, "{hint}");
    }
    if let Some(notice) = err.notice() {
        let _ = writeln!(out, "API says: {notice}");
    }
    if let Some(raw) = err.raw() {
        let pretty = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
        let _ = writeln!(out, "Raw response:\n{pretty}");
    }
    out
}

pub fn table(table: &NormalizedTable, layout: Layout, index_label: &str) -> String {
    let transposed;
    let table = match layout {
        Layout::Rows => table,
        Layout::Transposed => {
            transposed = table.transpose();
            &transposed
        }
    };

    let header: Vec<String> = std::iter::once(index_label.to_string())
        .chain(table.columns().iter().map(|c| truncate(c)))
        .collect();
    let body: Vec<Vec<(String, bool)>> = table
        .rows()
        .iter()
        .map(|row| {
            std::iter::once((truncate(&row.key), false))
                .chain(row.cells.iter().map(|c| (truncate(&c.to_string()), is_numeric(c))))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (w, (text, _)) in widths.iter_mut().zip(row) {
            *w = (*w).max(text.chars().count());
        }
    }

    let mut out = String::new();
    let head: Vec<String> = header
        .iter()
        .zip(widths.iter().copied())
        .map(|(h, w)| format!("{h:<w$}"))
        .collect();
    let _ = writeln!(out, "{}", head.join(" | ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));

    for row in &body {
        let line: Vec<String> = row
            .iter()
            .zip(widths.iter().copied())
            .map(|((text, numeric), w)| {
                if *numeric {
                    format!("{text:>w$}")
                } else {
                    format!("{text:<w$}")
                }
            })
            .collect();
        let _ = writeln!(out, "{}", line.join(" | ").trim_end());
    }
    out
}

fn is_numeric(cell: &Cell) -> bool {
    matches!(cell, Cell::Number(_) | Cell::Missing)
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_WIDTH {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_CELL_WIDTH - 1).collect();
    out.push('…');
    out
}

/// ASCII plot of `series`, one column per point (down-sampled to `width`).
/// Missing values leave a gap.
pub fn line_chart(series: &ChartSeries, width: usize, height: usize) -> String {
    let width = width.max(2);
    let height = height.max(2);

    let present: Vec<f64> = series.points.iter().filter_map(|(_, v)| *v).collect();
    if present.is_empty() {
        return format!("{}: no numeric data to chart\n", series.column);
    }
    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let n = series.points.len();
    let cols = n.min(width);
    let sampled: Vec<Option<f64>> = (0..cols)
        .map(|i| series.points[i * n / cols].1)
        .collect();

    let mut grid = vec![vec![' '; cols]; height];
    for (x, value) in sampled.iter().enumerate() {
        let Some(v) = value else { continue };
        let y = if max > min {
            ((max - v) / (max - min) * (height - 1) as f64).round() as usize
        } else {
            height / 2
        };
        grid[y.min(height - 1)][x] = '*';
    }

    let max_label = format_value(max);
    let min_label = format_value(min);
    let label_width = max_label.len().max(min_label.len());

    let mut out = format!("{}\n", series.column);
    for (y, line) in grid.iter().enumerate() {
        let label = if y == 0 {
            max_label.as_str()
        } else if y == height - 1 {
            min_label.as_str()
        } else {
            ""
        };
        let line: String = line.iter().collect();
        let _ = writeln!(out, "{label:>label_width$} |{}", line.trim_end());
    }
    let _ = writeln!(out, "{:>label_width$} +{}", "", "-".repeat(cols));

    let first = &series.points[0].0;
    let last = &series.points[n - 1].0;
    let gap = cols.saturating_sub(first.chars().count() + last.chars().count()).max(1);
    let _ = writeln!(out, "{:>label_width$}  {first}{}{last}", "", " ".repeat(gap));
    out
}

fn format_value(v: f64) -> String {
    if v.abs() >= 1000.0 || v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}
