//! `results.txt` rendering

use crate::entry::LogEntry;
use crate::report::Report;
use std::fmt::Write;

pub(crate) fn render(report: &Report) -> String {
    let mut out = String::new();
    let run = &report.run;

    heading(&mut out, "datavet validation results", '=');
    field(&mut out, "Run ID", &run.run_id);
    let schema = match (&run.schema_name, &run.schema_version) {
        (Some(name), Some(version)) => format!("{} ({} {})", run.schema_file, name, version),
        (Some(name), None) => format!("{} ({})", run.schema_file, name),
        _ => run.schema_file.clone(),
    };
    field(&mut out, "Schema", &schema);
    field(&mut out, "Data file", &run.data_file);
    for (label, value) in [
        ("Box ID", &run.box_id),
        ("Sender ID", &run.sender_id),
        ("Channel", &run.channel),
    ] {
        if let Some(value) = value {
            field(&mut out, label, value);
        }
    }
    field(&mut out, "Started", &run.started_at.to_rfc3339());
    if let Some(finished) = run.finished_at {
        field(&mut out, "Finished", &finished.to_rfc3339());
    }
    field(&mut out, "Duration", &format!("{} ms", report.duration_ms));
    field(&mut out, "Status", report.status.as_str());
    out.push('\n');

    let totals = &report.totals;
    heading(&mut out, "Totals", '-');
    field(&mut out, "Records", &totals.records.to_string());
    field(&mut out, "Records with errors", &totals.records_with_errors.to_string());
    field(&mut out, "Errors", &totals.errors.to_string());
    field(&mut out, "Warnings", &totals.warnings.to_string());
    field(&mut out, "Success rate", &format!("{:.2}%", totals.success_rate));
    out.push('\n');

    heading(&mut out, "Datasets", '-');
    if report.datasets.is_empty() {
        out.push_str("(none)\n");
    }
    for stats in &report.datasets {
        let _ = writeln!(
            out,
            "{} ({}): {} record(s), {} error(s), {} warning(s), {} ms",
            stats.dataset, stats.source, stats.records, stats.errors, stats.warnings, stats.duration_ms
        );
    }
    out.push('\n');

    section(&mut out, "Format errors", &report.format_errors);
    section(&mut out, "Missing files", &report.missing_files);
    section(&mut out, "Skipped rules", &report.skipped_rules);
    section(&mut out, "Rule faults", &report.rule_faults);
    out
}

fn heading(out: &mut String, title: &str, underline: char) {
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", underline.to_string().repeat(title.chars().count()));
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{:<21}{}", format!("{label}:"), value);
}

fn section(out: &mut String, title: &str, entries: &[LogEntry]) {
    heading(out, title, '-');
    if entries.is_empty() {
        out.push_str("(none)\n");
    }
    for entry in entries {
        let _ = writeln!(out, "{entry}");
    }
    out.push('\n');
}
