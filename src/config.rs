use std::fmt;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

pub const ALL_MANAGERS: &str = "All Managers";

/// Which records a reporting window picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowMode {
    /// Submitted in the window, or not yet submitted and started in it
    #[default]
    InclusiveOfPending,
    /// Submitted in the window only
    SubmissionOnly,
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowMode::InclusiveOfPending => write!(f, "inclusive-of-pending"),
            WindowMode::SubmissionOnly => write!(f, "submission-only"),
        }
    }
}

/// How the chosen week start is validated against the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum WeekBound {
    /// Any valid date
    #[default]
    Free,
    /// Must fall between the earliest and latest date seen in the data
    DataRange,
}

/// The column shown next to the completed count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CompletionMetric {
    #[default]
    NotCompleted,
    WithinWeek,
}

impl CompletionMetric {
    pub fn column_name(&self) -> &'static str {
        match self {
            CompletionMetric::NotCompleted => "not_completed",
            CompletionMetric::WithinWeek => "completed_within_week",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ManagerFilter {
    #[default]
    All,
    Named(String),
}

impl ManagerFilter {
    /// Maps an omitted name or the dropdown's "All Managers" entry to `All`.
    pub fn from_arg(name: Option<&str>) -> Self {
        match name {
            None => ManagerFilter::All,
            Some(name) if name == ALL_MANAGERS => ManagerFilter::All,
            Some(name) => ManagerFilter::Named(name.to_string()),
        }
    }

    pub fn matches(&self, manager_name: Option<&str>) -> bool {
        match self {
            ManagerFilter::All => true,
            ManagerFilter::Named(name) => manager_name == Some(name.as_str()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ManagerFilter::All => ALL_MANAGERS,
            ManagerFilter::Named(name) => name,
        }
    }
}

/// Everything one summary request needs besides the records themselves.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub week_start: NaiveDate,
    pub manager: ManagerFilter,
    pub window_mode: WindowMode,
    pub week_bound: WeekBound,
    pub completion_metric: CompletionMetric,
}

impl ReportConfig {
    pub fn new(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            manager: ManagerFilter::All,
            window_mode: WindowMode::default(),
            week_bound: WeekBound::default(),
            completion_metric: CompletionMetric::default(),
        }
    }
}
