//! Colored terminal output for the `hab-client` binary.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use crate::hab::{BinaryVersion, ServiceStatus};

/// Maximum width of a status table cell.
const MAX_CELL_LEN: usize = 48;

/// Truncate a string to a maximum length, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Render status records as an aligned table, one line per row.
///
/// Columns are ordered as in the first record.
#[must_use]
pub fn format_status_table(rows: &[ServiceStatus]) -> Vec<String> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let headers: Vec<&str> = first.keys().collect();
    let widths: Vec<usize> = headers
        .iter()
        .map(|h| {
            rows.iter()
                .filter_map(|row| row.get(h))
                .map(|cell| truncate(cell, MAX_CELL_LEN).chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render(headers.iter().map(|h| (*h).to_string()).collect())];
    for row in rows {
        let cells = headers
            .iter()
            .map(|h| truncate(row.get(h).unwrap_or_default(), MAX_CELL_LEN))
            .collect();
        lines.push(render(cells));
    }
    lines
}

/// Print the binary's version.
pub fn print_version(version: Option<&BinaryVersion>) {
    match version {
        Some(v) => println!(
            "{} {} {}",
            "[HAB]".blue().bold(),
            v.version.cyan(),
            format!("build {}", v.build).dimmed()
        ),
        None => println!("{} {}", "[HAB]".blue().bold(), "version unavailable".yellow()),
    }
    let _ = io::stdout().flush();
}

/// Print the outcome of a version requirement check.
pub fn print_requirement_met(range: &str, version: Option<&BinaryVersion>) {
    println!(
        "{} {} satisfies {}",
        "[OK]".green().bold(),
        version.map_or("unknown", |v| v.version.as_str()).cyan(),
        range
    );
    let _ = io::stdout().flush();
}

/// Print service status records.
pub fn print_status(rows: &[ServiceStatus]) {
    if rows.is_empty() {
        println!("{} no services loaded", "[SVC]".blue().bold());
    } else {
        let mut lines = format_status_table(rows).into_iter();
        if let Some(header) = lines.next() {
            println!("{}", header.bold());
        }
        for line in lines {
            println!("{line}");
        }
    }
    let _ = io::stdout().flush();
}

/// Print a JSON body.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
    let _ = io::stdout().flush();
}

/// Print captured command output.
pub fn print_output(output: &str) {
    if !output.is_empty() {
        println!("{output}");
    }
    let _ = io::stdout().flush();
}

/// Print a null result from a suppressed failure.
pub fn print_null() {
    println!("{} {}", "[NULL]".yellow().bold(), "command failed".dimmed());
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stderr().flush();
}
