use std::fmt::Write;

use anyhow::Context;
use clap::ValueEnum;
use serde::Serialize;

use crate::config::{CompletionMetric, ReportConfig, WindowMode};
use crate::models::{ReportWindow, SummaryRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Markdown,
    Csv,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    week_start: chrono::NaiveDate,
    week_end: chrono::NaiveDate,
    manager: &'a str,
    window_mode: WindowMode,
    rows: &'a [SummaryRow],
}

pub fn render(
    rows: &[SummaryRow],
    window: &ReportWindow,
    config: &ReportConfig,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Table => Ok(build_table(rows, window, config)),
        OutputFormat::Markdown => Ok(build_markdown(rows, window, config)),
        OutputFormat::Csv => build_csv(rows, config.completion_metric),
        OutputFormat::Json => {
            let report = JsonReport {
                week_start: window.week_start,
                week_end: window.week_end,
                manager: config.manager.label(),
                window_mode: config.window_mode,
                rows,
            };
            let mut output =
                serde_json::to_string_pretty(&report).context("failed to encode summary")?;
            output.push('\n');
            Ok(output)
        }
    }
}

fn headers(metric: CompletionMetric) -> [&'static str; 7] {
    [
        "manager",
        "agent",
        "modules_assigned",
        "completed",
        metric.column_name(),
        "avg_score",
        "attempts",
    ]
}

fn cells(row: &SummaryRow, metric: CompletionMetric) -> [String; 7] {
    let metric_value = match metric {
        CompletionMetric::NotCompleted => row.not_completed,
        CompletionMetric::WithinWeek => row.completed_within_week,
    };
    [
        row.manager_name.clone(),
        row.agent_name.clone(),
        row.modules_assigned.to_string(),
        row.completed.to_string(),
        metric_value.to_string(),
        row.avg_score
            .map(|score| format!("{score:.2}"))
            .unwrap_or_default(),
        row.attempts.to_string(),
    ]
}

fn caption(window: &ReportWindow, config: &ReportConfig) -> String {
    format!(
        "Week {} → {} | {} | {}",
        window.week_start,
        window.week_end,
        config.manager.label(),
        config.window_mode
    )
}

pub fn build_table(rows: &[SummaryRow], window: &ReportWindow, config: &ReportConfig) -> String {
    let metric = config.completion_metric;
    let header = headers(metric);
    let body: Vec<[String; 7]> = rows.iter().map(|row| cells(row, metric)).collect();

    let mut widths = header.map(str::len);
    for line in &body {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    // Names align left, counts align right.
    let format_line = |values: &[String]| {
        values
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(col, (value, width))| {
                if col < 2 {
                    format!("{value:<width$}")
                } else {
                    format!("{value:>width$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut output = String::new();
    let _ = writeln!(output, "{}", caption(window, config));
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", format_line(&header.map(String::from)));
    let _ = writeln!(
        output,
        "{}",
        widths.map(|width| "-".repeat(width)).join("  ")
    );
    for line in &body {
        let _ = writeln!(output, "{}", format_line(line));
    }
    output
}

pub fn build_markdown(rows: &[SummaryRow], window: &ReportWindow, config: &ReportConfig) -> String {
    let metric = config.completion_metric;
    let mut output = String::new();

    let _ = writeln!(output, "# Weekly Performance Summary");
    let _ = writeln!(
        output,
        "Week {} → {} for {} ({})",
        window.week_start,
        window.week_end,
        config.manager.label(),
        config.window_mode
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "| {} |", headers(metric).join(" | "));
    let _ = writeln!(output, "|{}", " --- |".repeat(7));
    for row in rows {
        let _ = writeln!(output, "| {} |", cells(row, metric).join(" | "));
    }

    output
}

pub fn build_csv(rows: &[SummaryRow], metric: CompletionMetric) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers(metric))?;
    for row in rows {
        writer.write_record(cells(row, metric))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush csv output: {}", err.error()))?;
    String::from_utf8(bytes).context("csv output was not valid utf-8")
}
