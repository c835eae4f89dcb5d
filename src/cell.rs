//! Workbook, sheet and cell types backing the file-based sheet store.
//!
//! A workbook is a set of named sheets; a sheet is a list of rows of cells.
//! Rows and columns are addressed 1-based, the way spreadsheet users see them,
//! and row 1 of every sheet is its header row.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// A single cell value.
///
/// Dates are stored as `{"date": "..."}` so that text which merely looks like
/// a timestamp stays text across a save and load.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Date { date: NaiveDateTime },
    Text(String),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// A date cell at midnight.
    pub fn date(d: NaiveDate) -> Cell {
        Cell::Date { date: d.and_time(NaiveTime::MIN) }
    }

    /// A text cell, or an empty cell for an empty string.
    pub fn text(s: &str) -> Cell {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Display value of the cell, as the sheet would show it.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Bool(true) => "TRUE".into(),
            Cell::Bool(false) => "FALSE".into(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date { date } => date.date().format("%Y-%m-%d").to_string(),
            Cell::Text(s) => s.trim().to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The date part of the cell, with any time of day dropped. Text is read
    /// as `YYYY-MM-DD`, `YYYY/MM/DD` or an ISO timestamp.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date { date } => Some(date.date()),
            Cell::Text(s) => {
                let s = s.trim();
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
                    .or_else(|_| s.parse::<NaiveDateTime>().map(|dt| dt.date()))
                    .ok()
            }
            _ => None,
        }
    }

    /// Checkbox value. Text `TRUE` counts as checked.
    pub fn as_bool(&self) -> bool {
        match self {
            Cell::Bool(b) => *b,
            Cell::Text(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// One sheet: a grid of rows. Row 1 is the header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    #[serde(default)]
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Cell at a 1-based position; out-of-range positions read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        if row == 0 || col == 0 {
            return &EMPTY;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .unwrap_or(&EMPTY)
    }

    /// Write a cell at a 1-based position, growing the grid as needed.
    pub fn set_cell(&mut self, row: usize, col: usize, value: Cell) -> Result<()> {
        if row == 0 || col == 0 {
            return Err(TrackerError::Sheet(format!(
                "cell position must be 1-based, got row {row} column {col}"
            )));
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize(col, Cell::Empty);
        }
        cells[col - 1] = value;
        Ok(())
    }

    /// Number of the last row holding any non-blank cell, or 0 for an empty sheet.
    pub fn last_filled_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_blank()))
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Write rows directly after the last non-blank row. Returns the first row number written.
    pub fn append_rows(&mut self, rows: Vec<Vec<Cell>>) -> usize {
        let start = self.last_filled_row() + 1;
        self.rows.truncate(start - 1);
        self.rows.extend(rows);
        start
    }

    /// Data rows (row 2 onwards) with their 1-based row numbers, skipping blank rows.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, r)| r.iter().any(|c| !c.is_blank()))
            .map(|(i, r)| (i + 1, r.as_slice()))
    }
}

/// A set of named sheets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    /// Mutable access to a sheet, creating it empty if missing.
    pub fn sheet_mut(&mut self, name: &str) -> &mut Sheet {
        self.sheets.entry(name.to_string()).or_default()
    }
}

/// An A1-style cell reference such as `D2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn parse(s: &str) -> Result<CellRef> {
        let s = s.trim().to_ascii_uppercase();
        let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(TrackerError::Config(format!("invalid cell reference '{s}'")));
        }
        let row: usize = digits
            .parse()
            .map_err(|_| TrackerError::Config(format!("invalid cell reference '{s}'")))?;
        if row == 0 {
            return Err(TrackerError::Config(format!("invalid cell reference '{s}'")));
        }
        let col = letters
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize);
        Ok(CellRef { row, col })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_ref_parse() {
        assert_eq!(CellRef::parse("D2").unwrap(), CellRef { row: 2, col: 4 });
        assert_eq!(CellRef::parse("e2").unwrap(), CellRef { row: 2, col: 5 });
        assert_eq!(CellRef::parse("AA10").unwrap(), CellRef { row: 10, col: 27 });
        assert!(CellRef::parse("2D").is_err());
        assert!(CellRef::parse("D0").is_err());
        assert!(CellRef::parse("D").is_err());
    }

    #[test]
    fn test_cell_json_shapes() {
        let row: Vec<Cell> =
            serde_json::from_str(r#"[null, true, 3, {"date": "2026-10-16T09:30:00"}, "TASK-001"]"#).unwrap();
        assert_eq!(row[0], Cell::Empty);
        assert_eq!(row[1], Cell::Bool(true));
        assert_eq!(row[2], Cell::Number(3.0));
        assert_eq!(row[3].as_date(), NaiveDate::from_ymd_opt(2026, 10, 16));
        assert_eq!(row[4], Cell::Text("TASK-001".into()));
    }

    #[test]
    fn test_timestamp_like_text_stays_text() {
        let cells = vec![Cell::text("2026-10-16T09:30:00"), Cell::date(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())];
        let json = serde_json::to_string(&cells).unwrap();
        let back: Vec<Cell> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cells);
        assert_eq!(back[0].as_text(), "2026-10-16T09:30:00");
        assert_eq!(back[1].as_text(), "2026-10-16");
        assert_eq!(back[0].as_date(), NaiveDate::from_ymd_opt(2026, 10, 16));
    }

    #[test]
    fn test_as_text_formats_whole_numbers() {
        assert_eq!(Cell::Number(4.0).as_text(), "4");
        assert_eq!(Cell::Number(1.5).as_text(), "1.5");
        assert_eq!(Cell::text("  P-01 ").as_text(), "P-01");
    }

    #[test]
    fn test_text_dates_accept_both_separators() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 5);
        assert_eq!(Cell::text("2026-01-05").as_date(), expected);
        assert_eq!(Cell::text("2026/01/05").as_date(), expected);
        assert_eq!(Cell::text("next week").as_date(), None);
    }

    #[test]
    fn test_append_lands_after_last_filled_row() {
        let mut sheet = Sheet { rows: vec![vec![Cell::text("A"), Cell::text("B")]] };
        sheet.rows.push(vec![Cell::text("x")]);
        sheet.rows.push(vec![Cell::Empty, Cell::text("  ")]);
        let start = sheet.append_rows(vec![vec![Cell::text("y")]]);
        assert_eq!(start, 3);
        assert_eq!(sheet.cell(3, 1), &Cell::text("y"));
        assert_eq!(sheet.rows.len(), 3);
    }

    #[test]
    fn test_set_cell_grows_grid() {
        let mut sheet = Sheet::default();
        sheet.set_cell(2, 4, Cell::text("https://example.test/hook")).unwrap();
        assert_eq!(sheet.cell(2, 4).as_text(), "https://example.test/hook");
        assert!(sheet.cell(1, 1).is_blank());
        assert!(sheet.set_cell(0, 1, Cell::Empty).is_err());
    }

    #[test]
    fn test_data_rows_skip_header_and_blanks() {
        let mut sheet = Sheet { rows: vec![vec![Cell::text("ID")]] };
        sheet.rows.push(vec![Cell::text("P-01")]);
        sheet.rows.push(vec![]);
        sheet.rows.push(vec![Cell::text("P-02")]);
        let rows: Vec<usize> = sheet.data_rows().map(|(n, _)| n).collect();
        assert_eq!(rows, vec![2, 4]);
    }
}
