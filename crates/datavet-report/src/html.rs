//! `output.log` rendering
//!
//! One `<li>` per event, one event per line. Attributes carry the fields
//! needed to match an entry against `report.json`.

use crate::entry::LogEntry;
use crate::report::Report;
use std::fmt::Write;

const STYLE: &str = "\
body { font-family: monospace; font-size: 13px; }
ol { list-style: none; padding: 0; }
li { padding: 2px 6px; border-left: 4px solid transparent; }
li.success { color: #1b5e20; border-color: #2e7d32; }
li.info { color: #37474f; border-color: #90a4ae; }
li.warning { color: #8a6d00; background: #fff8e1; border-color: #f9a825; }
li.error { color: #b71c1c; background: #ffebee; border-color: #c62828; }
li.critical { font-weight: bold; }
.loc { color: #555; }
.detail { color: #666; font-style: italic; }
";

/// Escape text for use in HTML content and attribute values
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("&#10;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn render(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, "<html><head><meta charset=\"utf-8\">");
    let _ = writeln!(out, "<title>datavet run {}</title>", escape(&report.run.run_id));
    let _ = writeln!(out, "<style>\n{STYLE}</style></head><body>");
    let _ = writeln!(
        out,
        "<h1>Run {} <small>{}</small></h1>",
        escape(&report.run.run_id),
        report.status
    );
    let _ = writeln!(out, "<ol>");
    for entry in &report.events {
        let _ = writeln!(out, "{}", render_entry(entry));
    }
    let _ = writeln!(out, "</ol>");
    let _ = writeln!(out, "</body></html>");
    out
}

fn render_entry(entry: &LogEntry) -> String {
    let mut class = entry.level.as_str().to_string();
    if entry.category == crate::Category::Critical {
        class.push_str(" critical");
    }

    let mut li = format!(
        "<li class=\"{}\" data-seq=\"{}\" data-level=\"{}\" data-category=\"{}\"",
        class, entry.seq, entry.level, entry.category
    );
    if let Some(file) = &entry.file {
        let _ = write!(li, " data-file=\"{}\"", escape(file));
    }
    if let Some(line) = entry.line {
        let _ = write!(li, " data-line=\"{line}\"");
    }
    if let Some(rule) = &entry.rule {
        let _ = write!(li, " data-rule=\"{}\"", escape(rule));
    }
    let _ = write!(
        li,
        "><time>{}</time> [{}] ",
        entry.timestamp.format("%H:%M:%S%.3f"),
        entry.level.as_str().to_uppercase()
    );
    if let Some(location) = entry.location() {
        let _ = write!(li, "<span class=\"loc\">{}</span> ", escape(&location));
    }
    let _ = write!(li, "<span class=\"msg\">{}</span>", escape(&entry.message));
    if let Some(value) = &entry.value {
        let _ = write!(li, " <span class=\"value\">(value: '{}')</span>", escape(value));
    }
    if let Some(detail) = &entry.detail {
        let _ = write!(li, " <span class=\"detail\">{}</span>", escape(detail));
    }
    li.push_str("</li>");
    li
}
