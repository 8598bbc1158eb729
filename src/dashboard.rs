// src/dashboard.rs

//! Human-readable stats dashboard printed by `buildmon stats`.

use std::fmt::Write as _;

use colored::Colorize;

use crate::build::BuildRecord;
use crate::persist::BuildHistory;
use crate::stats::RunningStats;

/// How many of the newest records the dashboard lists.
pub const RECENT_BUILDS: usize = 10;

/// Render totals followed by the newest `recent` history entries, newest
/// first.
pub fn render(stats: &RunningStats, history: &BuildHistory, recent: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", "Build statistics".bold());
    let _ = writeln!(out, "  total builds:     {}", stats.total_builds);
    let _ = writeln!(
        out,
        "  successful:       {}",
        stats.successful_builds.to_string().green()
    );
    let failed = stats.failed_builds.to_string();
    let failed = if stats.failed_builds > 0 {
        failed.red()
    } else {
        failed.normal()
    };
    let _ = writeln!(out, "  failed:           {failed}");
    let _ = writeln!(
        out,
        "  success rate:     {}",
        stats
            .success_rate()
            .map(|r| format!("{r:.1}%"))
            .unwrap_or_else(|| "n/a".to_string())
    );
    let _ = writeln!(
        out,
        "  average time:     {}",
        stats
            .average_build_time()
            .map(|t| format!("{t:.2}s"))
            .unwrap_or_else(|| "n/a".to_string())
    );
    let _ = writeln!(
        out,
        "  last build:       {}",
        stats
            .last_build_timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    );

    if history.is_empty() {
        let _ = writeln!(out, "\n{}", "No builds recorded yet.".dimmed());
        return out;
    }

    let _ = writeln!(
        out,
        "\n{} (newest first, {} of {} kept)",
        "Recent builds".bold(),
        recent.min(history.len()),
        history.len()
    );
    for record in history.iter().rev().take(recent) {
        let _ = writeln!(out, "  {}", render_record(record));
    }

    out
}

fn render_record(record: &BuildRecord) -> String {
    let status = if record.success() {
        "ok  ".green()
    } else {
        "FAIL".red().bold()
    };

    let mut line = format!(
        "{status} {} {:<7} {:>6.2}s",
        record.start_time().format("%Y-%m-%d %H:%M:%S"),
        record.mode().as_str(),
        record.duration_secs(),
    );

    if record.success() {
        let _ = write!(
            line,
            "  js {:.1} KB  wasm {:.1} KB",
            record.output_size_primary() as f64 / 1024.0,
            record.output_size_binary() as f64 / 1024.0
        );
    } else if let Some(first) = record.error_message().lines().next() {
        let _ = write!(line, "  {}", first.dimmed());
    }

    if !record.warnings().is_empty() {
        let _ = write!(
            line,
            "  {}",
            format!("{} warning(s)", record.warnings().len()).yellow()
        );
    }
    if !record.files_changed().is_empty() {
        let _ = write!(line, "  [{} file(s)]", record.files_changed().len());
    }

    line
}
