use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::loader::{excel_serial_to_datetime, RawTable};
use crate::models::{CellValue, NormalizedRecord, RawRecord};

const WITHIN_WEEK_DAYS: i64 = 7;

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

#[derive(Debug, Default)]
struct CoercionCounts {
    submitted_date: usize,
    start_date: usize,
    score: usize,
    attempts: usize,
}

pub fn normalize_table(table: &RawTable) -> Vec<NormalizedRecord> {
    let columns = table.columns;
    let mut dropped = CoercionCounts::default();

    let records: Vec<NormalizedRecord> = table
        .rows
        .iter()
        .map(|row| {
            let cell = |column| table.cell(row, column);

            let submitted_date = track(
                &mut dropped.submitted_date,
                cell(columns.submitted_date),
                parse_datetime,
            );
            let start_date =
                track(&mut dropped.start_date, cell(columns.start_date), parse_datetime);
            let overall_score = track(&mut dropped.score, cell(columns.score), parse_score);
            let attempt_count =
                track(&mut dropped.attempts, cell(columns.attempts), parse_attempts);

            normalize_record(RawRecord {
                manager_name: text_value(cell(columns.manager)),
                agent_name: text_value(cell(columns.agent)).unwrap_or_default(),
                assessment_id: text_value(cell(columns.assessment_id)),
                submitted_date,
                start_date,
                submitted_flag: text_value(cell(columns.submitted)),
                overall_score,
                attempt_count,
            })
        })
        .collect();

    debug!(
        records = records.len(),
        submitted_date = dropped.submitted_date,
        start_date = dropped.start_date,
        score = dropped.score,
        attempts = dropped.attempts,
        "cells coerced to empty during normalization"
    );
    records
}

fn track<T>(
    counter: &mut usize,
    cell: &CellValue,
    parse: fn(&CellValue) -> Option<T>,
) -> Option<T> {
    let value = parse(cell);
    if value.is_none() && *cell != CellValue::Empty {
        *counter += 1;
    }
    value
}

pub fn normalize_record(raw: RawRecord) -> NormalizedRecord {
    let completed = is_completed(raw.submitted_flag.as_deref());
    let completed_within_week = completed && within_week(raw.submitted_date, raw.start_date);
    NormalizedRecord {
        raw,
        completed,
        completed_within_week,
    }
}

pub fn is_completed(flag: Option<&str>) -> bool {
    flag.is_some_and(|value| value.eq_ignore_ascii_case("YES"))
}

/// Submission on the start day up to seven calendar days later. A
/// submission dated before the start does not count.
pub fn within_week(submitted: Option<NaiveDateTime>, started: Option<NaiveDateTime>) -> bool {
    match (submitted, started) {
        (Some(submitted), Some(started)) => {
            let days = (submitted.date() - started.date()).num_days();
            (0..=WITHIN_WEEK_DAYS).contains(&days)
        }
        _ => false,
    }
}

/// All-zero placeholders such as `0000-00-00 00:00:00` mean "no date".
pub fn is_sentinel_date(text: &str) -> bool {
    let mut digits = text.chars().filter(|c| c.is_ascii_digit()).peekable();
    digits.peek().is_some() && digits.all(|c| c == '0')
}

pub fn parse_datetime(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Empty => None,
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Number(serial) => excel_serial_to_datetime(*serial),
        CellValue::Text(text) => parse_datetime_text(text),
    }
}

pub fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() || is_sentinel_date(text) {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn parse_score(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

pub fn parse_attempts(cell: &CellValue) -> Option<i64> {
    match cell {
        CellValue::Number(n) => integral(*n),
        CellValue::Text(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

// 2^63; casting anything at or past it would clamp to i64::MAX.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < I64_BOUND).then_some(n as i64)
}

/// Identifiers and names as text; numeric ids lose the trailing `.0` that
/// spreadsheets add.
fn text_value(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Empty => None,
        CellValue::Text(text) => Some(text.clone()),
        CellValue::Number(n) => Some(match integral(*n) {
            Some(whole) => whole.to_string(),
            None => n.to_string(),
        }),
        CellValue::DateTime(dt) => Some(dt.to_string()),
    }
}
