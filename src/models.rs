use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// A single spreadsheet cell as read from the input file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub manager_name: Option<String>,
    pub agent_name: String,
    pub assessment_id: Option<String>,
    pub submitted_date: Option<NaiveDateTime>,
    pub start_date: Option<NaiveDateTime>,
    pub submitted_flag: Option<String>,
    pub overall_score: Option<f64>,
    pub attempt_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub raw: RawRecord,
    pub completed: bool,
    pub completed_within_week: bool,
}

impl NormalizedRecord {
    pub fn submitted_on(&self) -> Option<NaiveDate> {
        self.raw.submitted_date.map(|dt| dt.date())
    }

    pub fn started_on(&self) -> Option<NaiveDate> {
        self.raw.start_date.map(|dt| dt.date())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub manager_name: String,
    pub agent_name: String,
    pub modules_assigned: usize,
    pub completed: usize,
    pub not_completed: usize,
    pub completed_within_week: usize,
    pub avg_score: Option<f64>,
    pub attempts: i64,
}

/// The inclusive seven-day reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

impl ReportWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.week_start && date <= self.week_end
    }
}

/// Result of a summary request. An empty selection is a normal outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum WeeklyOutcome {
    Summary(Vec<SummaryRow>),
    NoData,
}
