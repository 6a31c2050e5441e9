//! Status, search and sort commands - print a page of a table.

use colored::{ColoredString, Colorize};

use bookshelf::status::RowStyle;
use bookshelf::{Bookshelf, CatalogFilter, TableId, TableView};

use super::{runtime, CommandResult, Context};

/// Widest a column is printed before truncation.
const MAX_COLUMN_WIDTH: usize = 28;

pub fn run(
    ctx: &Context,
    table: TableId,
    page: usize,
    (on_loan, recent, newest): (bool, bool, bool),
    json_output: bool,
) -> CommandResult {
    let rt = runtime()?;
    let mut shelf = ctx.shelf(&rt)?;

    let filter = CatalogFilter {
        on_loan_only: on_loan,
        recent_only: recent,
        newest_first: newest,
    };
    if filter.is_active() {
        if table != TableId::Catalog {
            return Err("Filters apply to the catalog table only".into());
        }
        shelf.apply_filter(filter)?;
    }

    shelf.go_to_page(table, page);
    print_view(&shelf, table, json_output)
}

pub fn search(ctx: &Context, table: TableId, query: &str, page: usize, json_output: bool) -> CommandResult {
    let rt = runtime()?;
    let mut shelf = ctx.shelf(&rt)?;

    let matches = shelf.search(table, query);
    shelf.go_to_page(table, page);

    if !json_output {
        println!(
            "{} {} in {}",
            matches.to_string().white().bold(),
            if matches == 1 { "match" } else { "matches" },
            table.to_string().cyan()
        );
        println!();
    }
    print_view(&shelf, table, json_output)
}

pub fn sort(
    ctx: &Context,
    table: TableId,
    column: &str,
    descending: bool,
    page: usize,
    json_output: bool,
) -> CommandResult {
    let rt = runtime()?;
    let mut shelf = ctx.shelf(&rt)?;

    let index = resolve_column(shelf.table(table).header(), column).ok_or_else(|| {
        format!(
            "Unknown column '{}'. Columns: {}",
            column,
            shelf.table(table).header().join(", ")
        )
    })?;

    // Sorting toggles: a second sort on the same column flips it.
    shelf.sort(table, index);
    if descending {
        shelf.sort(table, index);
    }

    shelf.go_to_page(table, page);
    print_view(&shelf, table, json_output)
}

/// A column given by zero-based index or by header text.
pub fn resolve_column(header: &[String], column: &str) -> Option<usize> {
    let column = column.trim();
    if let Ok(index) = column.parse::<usize>() {
        return (index < header.len()).then_some(index);
    }
    let wanted = column.to_lowercase();
    header.iter().position(|h| h.trim().to_lowercase() == wanted)
}

fn print_view(shelf: &Bookshelf, table: TableId, json_output: bool) -> CommandResult {
    let view = shelf.view(table);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    print_table(&view);
    println!();
    println!(
        "Page {} of {} ({} rows)",
        view.pagination.current.to_string().white().bold(),
        view.pagination.total_pages,
        view.pagination.total_items
    );

    if table == TableId::Catalog {
        let summary = shelf.summary();
        println!(
            "On loan: {}  Overdue: {}",
            summary.unreturned_count().to_string().yellow(),
            summary.overdue_count().to_string().red()
        );
    }
    Ok(())
}

/// Print the rows of `view` as aligned columns, colored by loan state.
pub fn print_table(view: &TableView) {
    let width = view.rows.first().map_or(view.header.len(), |r| r.cells.len());
    let header = &view.header[..width.min(view.header.len())];

    let mut widths: Vec<usize> = header.iter().map(|h| display_width(h)).collect();
    for row in &view.rows {
        for (i, cell) in row.cells.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }
    for w in &mut widths {
        *w = (*w).min(MAX_COLUMN_WIDTH);
    }

    let line: Vec<String> = header
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .collect();
    println!("{}", line.join("  ").bold());

    if view.rows.is_empty() {
        println!("{}", "(no rows)".dimmed());
        return;
    }

    for row in &view.rows {
        let line: Vec<String> = row
            .cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(c, *w))
            .collect();
        println!("{}", styled(&line.join("  "), row.style));
    }
}

fn styled(text: &str, style: RowStyle) -> ColoredString {
    match style {
        RowStyle::Overdue => text.red(),
        RowStyle::Borrowed => text.yellow(),
        RowStyle::Plain => text.normal(),
    }
}

/// Terminal columns taken by `text`; wide (CJK) characters count double.
fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

fn char_width(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFF00..=0xFF60 => 2,
        _ => 1,
    }
}

/// Truncate or pad `text` to exactly `width` terminal columns.
fn pad(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;

    if display_width(text) > width {
        for c in text.chars() {
            if used + char_width(c) + 1 > width {
                break;
            }
            out.push(c);
            used += char_width(c);
        }
        out.push('…');
        used += 1;
    } else {
        out.push_str(text);
        used = display_width(text);
    }

    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}
