use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Failures that stop a report request. Cell-level parse problems never end
/// up here; they degrade to missing values during normalization.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unsupported file type '{extension}' (expected xlsx, xlsm, xls or csv)")]
    UnsupportedFormat { extension: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no worksheet with a header row")]
    EmptySheet { path: PathBuf },

    #[error("missing expected column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("week start {week_start} is outside the data range {min} to {max}")]
    WeekOutOfRange {
        week_start: NaiveDate,
        min: NaiveDate,
        max: NaiveDate,
    },

    #[error("week starting {week_start} ends past the last representable date")]
    InvalidWeek { week_start: NaiveDate },

    #[error("week start {week_start} cannot be checked: the file has no dates")]
    NoObservedDates { week_start: NaiveDate },
}

impl ReportError {
    /// Schema problems mean the file is the wrong export, not a broken one.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, ReportError::MissingColumns(_))
    }
}
