use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::error::ReportError;
use crate::models::CellValue;

pub const COL_SUBMITTED_DATE: &str = "Submitted date";
pub const COL_START_DATE: &str = "Start date";
pub const COL_SUBMITTED: &str = "Submitted";
pub const COL_MANAGER: &str = "L1 name";
pub const COL_AGENT: &str = "User name";
pub const COL_ASSESSMENT_ID: &str = "Assessment id";
pub const COL_SCORE: &str = "Overall score";
pub const COL_ATTEMPTS: &str = "No of attempts";

pub const EXPECTED_COLUMNS: [&str; 8] = [
    COL_SUBMITTED_DATE,
    COL_START_DATE,
    COL_SUBMITTED,
    COL_MANAGER,
    COL_AGENT,
    COL_ASSESSMENT_ID,
    COL_SCORE,
    COL_ATTEMPTS,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Spreadsheet,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xls" => Ok(InputFormat::Spreadsheet),
            "csv" => Ok(InputFormat::Csv),
            _ => Err(ReportError::UnsupportedFormat { extension }),
        }
    }
}

/// Position of each expected column in the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub submitted_date: usize,
    pub start_date: usize,
    pub submitted: usize,
    pub manager: usize,
    pub agent: usize,
    pub assessment_id: usize,
    pub score: usize,
    pub attempts: usize,
}

impl ColumnIndex {
    pub fn from_headers(headers: &[String]) -> Result<Self, ReportError> {
        let position = |name: &str| headers.iter().position(|header| header.trim() == name);

        let missing: Vec<String> = EXPECTED_COLUMNS
            .iter()
            .filter(|name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ReportError::MissingColumns(missing));
        }

        let find = |name: &str| position(name).unwrap_or_default();
        Ok(ColumnIndex {
            submitted_date: find(COL_SUBMITTED_DATE),
            start_date: find(COL_START_DATE),
            submitted: find(COL_SUBMITTED),
            manager: find(COL_MANAGER),
            agent: find(COL_AGENT),
            assessment_id: find(COL_ASSESSMENT_ID),
            score: find(COL_SCORE),
            attempts: find(COL_ATTEMPTS),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub columns: ColumnIndex,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Builds a table from a header row and data rows, dropping rows with no
    /// content at all.
    pub fn from_parts(headers: &[String], rows: Vec<Vec<CellValue>>) -> Result<Self, ReportError> {
        let columns = ColumnIndex::from_headers(headers)?;
        let rows = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| *cell != CellValue::Empty))
            .collect();
        Ok(RawTable { columns, rows })
    }

    /// Short rows (ragged CSV lines) read as empty cells.
    pub fn cell<'a>(&self, row: &'a [CellValue], column: usize) -> &'a CellValue {
        row.get(column).unwrap_or(&CellValue::Empty)
    }
}

pub fn load_table(path: &Path) -> Result<RawTable, ReportError> {
    let format = InputFormat::from_path(path)?;
    std::fs::metadata(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table = match format {
        InputFormat::Spreadsheet => load_spreadsheet(path)?,
        InputFormat::Csv => load_csv(path)?,
    };
    info!(path = %path.display(), rows = table.rows.len(), "loaded assessment export");
    Ok(table)
}

fn load_spreadsheet(path: &Path) -> Result<RawTable, ReportError> {
    let workbook_error = |source| ReportError::Workbook {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| empty_sheet(path))?;
    debug!(sheet = %sheet_name, "reading first worksheet");

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(workbook_error)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or_else(|| empty_sheet(path))?
        .iter()
        .map(header_text)
        .collect();
    let data = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    RawTable::from_parts(&headers, data)
}

fn load_csv(path: &Path) -> Result<RawTable, ReportError> {
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();
    if headers.iter().all(|header| header.is_empty()) {
        return Err(empty_sheet(path));
    }

    let mut data = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        data.push(record.iter().map(cell_from_text).collect());
    }

    RawTable::from_parts(&headers, data)
}

fn empty_sheet(path: &Path) -> ReportError {
    ReportError::EmptySheet {
        path: PathBuf::from(path),
    }
}

fn header_text(cell: &Data) -> String {
    match cell_from_data(cell) {
        CellValue::Text(text) => text,
        CellValue::Number(n) => n.to_string(),
        CellValue::DateTime(dt) => dt.to_string(),
        CellValue::Empty => String::new(),
    }
}

fn cell_from_text(text: &str) -> CellValue {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(trimmed.to_string())
    }
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => cell_from_text(s),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        // Error cells (#N/A, #VALUE!) carry no usable value.
        Data::Error(_) => CellValue::Empty,
        Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Empty,
        },
        Data::DateTimeIso(s) => cell_from_text(s),
        Data::DurationIso(_) => CellValue::Empty,
    }
}

/// Converts a 1900-system serial date. Serials below 1 carry no calendar
/// date (a zeroed cell or a bare time of day) and yield `None`.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
    use tempfile::tempdir;

    use crate::normalize::normalize_table;

    fn headers() -> Vec<String> {
        EXPECTED_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            InputFormat::from_path(Path::new("week.XLSX")).unwrap(),
            InputFormat::Spreadsheet
        );
        assert_eq!(
            InputFormat::from_path(Path::new("week.xls")).unwrap(),
            InputFormat::Spreadsheet
        );
        assert_eq!(
            InputFormat::from_path(Path::new("week.csv")).unwrap(),
            InputFormat::Csv
        );
        let err = InputFormat::from_path(Path::new("week.pdf")).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat { extension } if extension == "pdf"));
    }

    #[test]
    fn unsupported_extension_fails_before_opening() {
        let err = load_table(Path::new("/nonexistent/report.txt")).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat { .. }));
    }

    #[test]
    fn header_order_does_not_matter() {
        let mut shuffled = headers();
        shuffled.reverse();
        shuffled.push("Department".to_string());
        let index = ColumnIndex::from_headers(&shuffled).unwrap();
        assert_eq!(index.submitted_date, 7);
        assert_eq!(index.attempts, 0);
    }

    #[test]
    fn all_missing_columns_reported_at_once() {
        let partial: Vec<String> = headers()
            .into_iter()
            .filter(|h| h != COL_MANAGER && h != COL_SCORE)
            .collect();
        match ColumnIndex::from_headers(&partial).unwrap_err() {
            ReportError::MissingColumns(missing) => {
                assert_eq!(missing, vec![COL_MANAGER.to_string(), COL_SCORE.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn serial_dates_convert_and_zero_is_absent() {
        let jan_two = excel_serial_to_datetime(45293.0).unwrap();
        assert_eq!(jan_two.date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        let noon = excel_serial_to_datetime(45293.5).unwrap();
        assert_eq!(noon.format("%H:%M").to_string(), "12:00");
        assert_eq!(excel_serial_to_datetime(0.0), None);
        assert_eq!(excel_serial_to_datetime(0.25), None);
    }

    #[test]
    fn reads_csv_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("week.csv");
        std::fs::write(
            &path,
            "Submitted date,Start date,Submitted,L1 name,User name,Assessment id,Overall score,No of attempts\n\
             2024-01-02 10:00:00,2024-01-01,YES,Asha,Ravi,101,80,1\n\
             ,,,,,,,\n\
             0000-00-00 00:00:00,2024-01-03,NO,Asha,Ravi,102,,0\n",
        )
        .unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.rows.len(), 2);
        let second = &table.rows[1];
        assert_eq!(
            table.cell(second, table.columns.submitted_date),
            &CellValue::Text("0000-00-00 00:00:00".to_string())
        );
        assert_eq!(table.cell(second, table.columns.score), &CellValue::Empty);
    }

    #[test]
    fn reads_first_worksheet_of_xlsx() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("week.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in EXPECTED_COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        sheet.write_string(1, 0, "2024-01-02 10:00:00").unwrap();
        sheet.write_string(1, 1, "2024-01-01 09:00:00").unwrap();
        sheet.write_string(1, 2, "Yes").unwrap();
        sheet.write_string(1, 3, "Asha").unwrap();
        sheet.write_string(1, 4, "Ravi").unwrap();
        sheet.write_number(1, 5, 101.0).unwrap();
        sheet.write_number(1, 6, 80.0).unwrap();
        sheet.write_number(1, 7, 1.0).unwrap();
        workbook.save(&path).unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!(
            table.cell(row, table.columns.manager),
            &CellValue::Text("Asha".to_string())
        );
        assert_eq!(table.cell(row, table.columns.score), &CellValue::Number(80.0));
    }

    #[test]
    fn xlsx_missing_column_is_schema_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("week.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in EXPECTED_COLUMNS.iter().take(7).enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        workbook.save(&path).unwrap();

        let err = load_table(&path).unwrap_err();
        assert!(err.is_schema_error());
        assert!(err.to_string().contains(COL_ATTEMPTS));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_table(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }

    #[test]
    fn mismatched_content_is_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("week.xls");
        std::fs::write(&path, "not a spreadsheet").unwrap();

        let err = load_table(&path).unwrap_err();
        assert!(matches!(err, ReportError::Workbook { .. }));
    }

    #[test]
    fn xlsx_dates_and_csv_text_normalize_alike() {
        let dir = tempdir().unwrap();
        let xlsx_path = dir.path().join("week.xlsx");
        let csv_path = dir.path().join("week.csv");

        let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in EXPECTED_COLUMNS.iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }

        let submitted = ExcelDateTime::parse_from_str("2024-01-02 10:00:00").unwrap();
        let started = ExcelDateTime::parse_from_str("2024-01-01 09:30:00").unwrap();
        sheet.write_datetime_with_format(1, 0, &submitted, &date_format).unwrap();
        sheet.write_datetime_with_format(1, 1, &started, &date_format).unwrap();
        sheet.write_string(1, 2, "YES").unwrap();
        sheet.write_string(1, 3, "Asha").unwrap();
        sheet.write_string(1, 4, "Ravi").unwrap();
        sheet.write_number(1, 5, 101.0).unwrap();
        sheet.write_number(1, 6, 80.0).unwrap();
        sheet.write_number(1, 7, 1.0).unwrap();

        let pending_start = ExcelDateTime::parse_from_str("2024-01-03 00:00:00").unwrap();
        sheet.write_string(2, 0, "0000-00-00 00:00:00").unwrap();
        sheet.write_datetime_with_format(2, 1, &pending_start, &date_format).unwrap();
        sheet.write_string(2, 2, "NO").unwrap();
        sheet.write_string(2, 3, "Asha").unwrap();
        sheet.write_string(2, 4, "Ravi").unwrap();
        sheet.write_number(2, 5, 102.0).unwrap();
        sheet.write_number(2, 7, 0.0).unwrap();
        workbook.save(&xlsx_path).unwrap();

        std::fs::write(
            &csv_path,
            "Submitted date,Start date,Submitted,L1 name,User name,Assessment id,Overall score,No of attempts\n\
             2024-01-02 10:00:00,2024-01-01 09:30:00,YES,Asha,Ravi,101,80,1\n\
             0000-00-00 00:00:00,2024-01-03 00:00:00,NO,Asha,Ravi,102,,0\n",
        )
        .unwrap();

        let xlsx = load_table(&xlsx_path).unwrap();
        let csv = load_table(&csv_path).unwrap();
        assert!(matches!(
            xlsx.cell(&xlsx.rows[0], xlsx.columns.submitted_date),
            CellValue::DateTime(_)
        ));

        let from_xlsx = normalize_table(&xlsx);
        let from_csv = normalize_table(&csv);
        assert_eq!(from_xlsx, from_csv);

        let submitted_at = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(from_xlsx[0].raw.submitted_date, Some(submitted_at));
        assert!(from_xlsx[0].completed_within_week);
        assert_eq!(from_xlsx[1].raw.submitted_date, None);
        assert_eq!(from_xlsx[1].raw.overall_score, None);
    }
}
