//! Text rendering of result tables.
//!
//! Produces box-drawn tables with auto-sized columns and dimmed NULL values.

use super::ResultTable;
use crate::db::Value;
use crossterm::style::Stylize;

/// Maximum width for any column.
pub const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Renders the table to lines of text.
///
/// Columns are scaled down proportionally when the table is wider than
/// `available_width`. With `styled` set, headers and NULLs carry ANSI styling.
pub fn render_text(table: &ResultTable, available_width: usize, styled: bool) -> Vec<String> {
    let mut lines = Vec::new();

    if table.column_count() == 0 {
        lines.push("(empty result)".to_string());
        return lines;
    }

    let widths = calculate_column_widths(table);

    let total_width: usize = widths.iter().sum::<usize>() + widths.len() * 3 + 1;
    let scale_factor = if total_width > available_width && available_width > 0 {
        available_width as f64 / total_width as f64
    } else {
        1.0
    };

    let widths: Vec<usize> = widths
        .iter()
        .map(|&w| ((w as f64 * scale_factor) as usize).max(MIN_COLUMN_WIDTH))
        .collect();

    lines.push(render_border(&widths, '┌', '┬', '┐'));

    let header: Vec<String> = table
        .columns()
        .iter()
        .zip(&widths)
        .map(|(col, &width)| {
            let cell = pad(&truncate(&col.name, width), width);
            if styled {
                cell.cyan().bold().to_string()
            } else {
                cell
            }
        })
        .collect();
    lines.push(join_cells(&header));

    lines.push(render_border(&widths, '├', '┼', '┤'));

    for row in table.rows() {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(value, &width)| render_cell(value, width, styled))
            .collect();
        lines.push(join_cells(&cells));
    }

    lines.push(render_border(&widths, '└', '┴', '┘'));

    lines.push(format!(
        "{} row{} returned ({}ms)",
        table.row_count(),
        if table.row_count() == 1 { "" } else { "s" },
        table.execution_time().as_millis()
    ));

    lines
}

/// Calculates the optimal width for each column.
fn calculate_column_widths(table: &ResultTable) -> Vec<usize> {
    let mut widths: Vec<usize> = table
        .columns()
        .iter()
        .map(|col| col.name.chars().count().max(MIN_COLUMN_WIDTH))
        .collect();

    for row in table.rows() {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(value.to_display_string().chars().count());
        }
    }

    widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
}

fn render_cell(value: &Value, width: usize, styled: bool) -> String {
    let cell = pad(&truncate(&value.to_display_string(), width), width);
    if styled && value.is_null() {
        cell.dark_grey().italic().to_string()
    } else {
        cell
    }
}

/// Truncates a string to fit within the given width, adding ellipsis if needed.
fn truncate(s: &str, max_width: usize) -> String {
    let len = s.chars().count();
    if len <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let mut out: String = s.chars().take(max_width - 3).collect();
        out.push_str("...");
        out
    }
}

fn pad(s: &str, width: usize) -> String {
    format!(" {:width$} ", s, width = width)
}

fn join_cells(cells: &[String]) -> String {
    format!("│{}│", cells.join("│"))
}

fn render_border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let segments: Vec<String> = widths.iter().map(|&w| "─".repeat(w + 2)).collect();
    format!("{left}{}{right}", segments.join(&mid.to_string()))
}
