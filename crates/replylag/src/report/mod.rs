use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ReportSettings;
use crate::models::{PipelineStats, REPORT_SCHEMA_VERSION, ReportArtifact, ReportRow};
use crate::pipeline::ReportOutcome;
use crate::utils::time::{format_unix_seconds_utc, format_utc_offset, unix_timestamp_seconds};

const HEADERS: [&str; 3] = ["SUPERVISOR", "MANAGER", "AVG_MINUTES"];

#[must_use]
pub fn build_report_artifact(outcome: &ReportOutcome, settings: &ReportSettings) -> ReportArtifact {
    ReportArtifact {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        generated_at_utc: format_unix_seconds_utc(unix_timestamp_seconds()),
        business_start: settings.window.business_start.to_string(),
        day_end: settings.window.day_end.to_string(),
        utc_offset: format_utc_offset(settings.utc_offset),
        stats: outcome.stats,
        rows: outcome.rows.clone(),
    }
}

pub fn write_report_artifact(path: &Path, artifact: &ReportArtifact) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("failed to create report directory: {}", parent.display())
        })?;
    }
    let encoded =
        serde_json::to_string_pretty(artifact).context("failed to encode report artifact")?;
    std::fs::write(path, format!("{encoded}\n"))
        .with_context(|| format!("failed to write report artifact: {}", path.display()))
}

/// Fixed-width table: names left-aligned, averages right-aligned with one
/// decimal.
#[must_use]
pub fn render_text_report(rows: &[ReportRow]) -> String {
    let averages = rows
        .iter()
        .map(|row| format!("{:.1}", row.avg_minutes))
        .collect::<Vec<_>>();

    let supervisor_width = column_width(HEADERS[0], rows.iter().map(|row| &row.supervisor_name));
    let manager_width = column_width(HEADERS[1], rows.iter().map(|row| &row.manager_name));
    let average_width = column_width(HEADERS[2], averages.iter());

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_line(
        HEADERS[0],
        supervisor_width,
        HEADERS[1],
        manager_width,
        HEADERS[2],
        average_width,
    ));
    for (row, average) in rows.iter().zip(&averages) {
        lines.push(format_line(
            &row.supervisor_name,
            supervisor_width,
            &row.manager_name,
            manager_width,
            average,
            average_width,
        ));
    }

    lines.join("\n")
}

#[must_use]
pub fn render_stats_line(stats: &PipelineStats) -> String {
    format!(
        "messages={} replies={} managers={} rows={} unresolved={}",
        stats.messages,
        stats.client_replies,
        stats.managers_averaged,
        stats.rows_emitted,
        stats.averages_without_reference
    )
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a String>) -> usize {
    values
        .map(|value| value.chars().count())
        .fold(header.chars().count(), usize::max)
}

fn format_line(
    supervisor: &str,
    supervisor_width: usize,
    manager: &str,
    manager_width: usize,
    average: &str,
    average_width: usize,
) -> String {
    format!(
        "{}  {}  {}",
        pad_right(supervisor, supervisor_width),
        pad_right(manager, manager_width),
        pad_left(average, average_width)
    )
}

fn pad_right(value: &str, width: usize) -> String {
    let padding = width.saturating_sub(value.chars().count());
    format!("{value}{}", " ".repeat(padding))
}

fn pad_left(value: &str, width: usize) -> String {
    let padding = width.saturating_sub(value.chars().count());
    format!("{}{value}", " ".repeat(padding))
}
