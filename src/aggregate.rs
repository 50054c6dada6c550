use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use crate::config::{ManagerFilter, ReportConfig, WeekBound, WindowMode, ALL_MANAGERS};
use crate::error::ReportError;
use crate::models::{NormalizedRecord, ReportWindow, SummaryRow, WeeklyOutcome};

pub fn report_window(week_start: NaiveDate) -> Result<ReportWindow, ReportError> {
    let week_end = week_start
        .checked_add_signed(Duration::days(6))
        .ok_or(ReportError::InvalidWeek { week_start })?;
    Ok(ReportWindow {
        week_start,
        week_end,
    })
}

pub fn in_window(record: &NormalizedRecord, window: &ReportWindow, mode: WindowMode) -> bool {
    match (record.submitted_on(), mode) {
        (Some(submitted), _) => window.contains(submitted),
        (None, WindowMode::InclusiveOfPending) => {
            record.started_on().is_some_and(|started| window.contains(started))
        }
        (None, WindowMode::SubmissionOnly) => false,
    }
}

/// Window selection followed by the manager filter.
pub fn select_records<'a>(
    records: &'a [NormalizedRecord],
    window: &ReportWindow,
    mode: WindowMode,
    manager: &ManagerFilter,
) -> Vec<&'a NormalizedRecord> {
    let in_week: Vec<&NormalizedRecord> = records
        .iter()
        .filter(|record| in_window(record, window, mode))
        .collect();
    debug!(
        total = records.len(),
        in_window = in_week.len(),
        mode = %mode,
        "applied reporting window"
    );

    in_week
        .into_iter()
        .filter(|record| manager.matches(record.raw.manager_name.as_deref()))
        .collect()
}

#[derive(Default)]
struct GroupTotals<'a> {
    assessment_ids: HashSet<&'a str>,
    completed: usize,
    not_completed: usize,
    completed_within_week: usize,
    score_sum: f64,
    score_count: usize,
    attempts: i64,
}

/// Groups records by (manager, agent). Records with no manager or agent
/// name belong to no group and are left out.
pub fn summarize_records(records: &[&NormalizedRecord]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(&str, &str), GroupTotals> = BTreeMap::new();
    let mut unattributed = 0usize;

    for record in records {
        let manager = match record.raw.manager_name.as_deref() {
            Some(manager) => manager,
            None => {
                unattributed += 1;
                continue;
            }
        };
        if record.raw.agent_name.is_empty() {
            unattributed += 1;
            continue;
        }

        let entry = groups
            .entry((manager, record.raw.agent_name.as_str()))
            .or_default();
        if let Some(id) = record.raw.assessment_id.as_deref() {
            entry.assessment_ids.insert(id);
        }
        if record.completed {
            entry.completed += 1;
        } else {
            entry.not_completed += 1;
        }
        if record.completed_within_week {
            entry.completed_within_week += 1;
        }
        if let Some(score) = record.raw.overall_score {
            entry.score_sum += score;
            entry.score_count += 1;
        }
        entry.attempts = entry
            .attempts
            .saturating_add(record.raw.attempt_count.unwrap_or(0));
    }

    if unattributed > 0 {
        debug!(unattributed, "skipped records without manager or agent name");
    }

    groups
        .into_iter()
        .map(|((manager, agent), totals)| SummaryRow {
            manager_name: manager.to_string(),
            agent_name: agent.to_string(),
            modules_assigned: totals.assessment_ids.len(),
            completed: totals.completed,
            not_completed: totals.not_completed,
            completed_within_week: totals.completed_within_week,
            avg_score: if totals.score_count == 0 {
                None
            } else {
                Some(totals.score_sum / totals.score_count as f64)
            },
            attempts: totals.attempts,
        })
        .collect()
}

pub fn weekly_summary(
    records: &[NormalizedRecord],
    config: &ReportConfig,
) -> Result<WeeklyOutcome, ReportError> {
    let window = report_window(config.week_start)?;
    let selected = select_records(records, &window, config.window_mode, &config.manager);
    let rows = summarize_records(&selected);

    if rows.is_empty() {
        warn!(
            week_start = %window.week_start,
            manager = config.manager.label(),
            "no records for this week/manager selection"
        );
        return Ok(WeeklyOutcome::NoData);
    }

    info!(
        week_start = %window.week_start,
        week_end = %window.week_end,
        records = selected.len(),
        groups = rows.len(),
        "built weekly summary"
    );
    Ok(WeeklyOutcome::Summary(rows))
}

/// Dropdown entries: the all-managers sentinel, then each manager once.
pub fn manager_options(records: &[NormalizedRecord]) -> Vec<String> {
    let names: BTreeSet<&str> = records
        .iter()
        .filter_map(|record| record.raw.manager_name.as_deref())
        .collect();

    std::iter::once(ALL_MANAGERS)
        .chain(names)
        .map(str::to_string)
        .collect()
}

/// Earliest and latest calendar date across submitted and start dates.
pub fn observed_date_range(records: &[NormalizedRecord]) -> Option<(NaiveDate, NaiveDate)> {
    records
        .iter()
        .flat_map(|record| [record.submitted_on(), record.started_on()])
        .flatten()
        .fold(None, |range, date| match range {
            None => Some((date, date)),
            Some((min, max)) => Some((min.min(date), max.max(date))),
        })
}

pub fn check_week_bound(
    records: &[NormalizedRecord],
    config: &ReportConfig,
) -> Result<(), ReportError> {
    report_window(config.week_start)?;
    if config.week_bound == WeekBound::Free {
        return Ok(());
    }

    let week_start = config.week_start;
    match observed_date_range(records) {
        None => Err(ReportError::NoObservedDates { week_start }),
        Some((min, max)) if week_start < min || week_start > max => {
            Err(ReportError::WeekOutOfRange {
                week_start,
                min,
                max,
            })
        }
        Some(_) => Ok(()),
    }
}
