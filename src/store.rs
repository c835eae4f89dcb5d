//! Sheet store: the workbook file and the mapping between sheet rows and records.
//!
//! This module is the only place that knows which column holds which field.
//! Everything above it works with `ProcessRecord`/`TaskRecord` values.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::cell::{Cell, Sheet, Workbook};
use crate::config::{Config, ProcessColumns, TaskColumns};
use crate::error::{Result, TrackerError};
use crate::fields::Status;
use crate::task::{ProcessRecord, TaskRecord, TaskRow};

pub const TASK_HEADERS: [&str; 10] = [
    "Process_ID", "Task_ID", "Process_Name", "Task_Name", "Assignee",
    "Status", "Est_Hours", "Start_Date", "Due_Date", "Notify",
];

pub const PROCESS_HEADERS: [&str; 3] = ["Process_ID", "Process_Name", "Description"];

/// Sample processes seeded by `init --demo`.
const DEMO_PROCESSES: [(&str, &str, &str); 4] = [
    ("P-01", "Purchasing", "Sourcing ingredients and supplies"),
    ("P-02", "Preparation", "Cutting and seasoning"),
    ("P-03", "Cooking", "Heat processing"),
    ("P-04", "Plating", "Final touches before serving"),
];

/// Tabular record storage used by the importer and the notification paths.
pub trait SheetStore {
    /// All process rows, in sheet order.
    fn processes(&self) -> Result<Vec<ProcessRecord>>;

    /// All non-blank task rows, in sheet order, with process names resolved.
    fn tasks(&self) -> Result<Vec<TaskRow>>;

    /// The task at a 1-based sheet row, if that row is a non-blank data row.
    fn task_at(&self, row: usize) -> Result<Option<TaskRecord>>;

    fn append_processes(&mut self, processes: &[ProcessRecord]) -> Result<()>;

    fn append_tasks(&mut self, tasks: &[TaskRecord]) -> Result<()>;

    /// The configured webhook URL; `None` when the cell is blank.
    fn webhook_url(&self) -> Result<Option<String>>;

    fn set_webhook_url(&mut self, url: &str) -> Result<()>;

    /// Set the notify checkbox of the task at a 1-based sheet row.
    fn set_notify(&mut self, row: usize, value: bool) -> Result<()>;
}

fn at(cells: &[Cell], col: usize) -> &Cell {
    static EMPTY: Cell = Cell::Empty;
    col.checked_sub(1).and_then(|i| cells.get(i)).unwrap_or(&EMPTY)
}

fn put(cells: &mut [Cell], col: usize, value: Cell) {
    if let Some(slot) = col.checked_sub(1).and_then(|i| cells.get_mut(i)) {
        *slot = value;
    }
}

impl ProcessRecord {
    pub fn from_row(cells: &[Cell], cols: &ProcessColumns) -> ProcessRecord {
        ProcessRecord {
            process_id: at(cells, cols.process_id).as_text(),
            process_name: at(cells, cols.process_name).as_text(),
            description: at(cells, cols.description).as_text(),
        }
    }

    pub fn to_row(&self, cols: &ProcessColumns) -> Vec<Cell> {
        let mut cells = vec![Cell::Empty; cols.width()];
        put(&mut cells, cols.process_id, Cell::text(&self.process_id));
        put(&mut cells, cols.process_name, Cell::text(&self.process_name));
        put(&mut cells, cols.description, Cell::text(&self.description));
        cells
    }
}

impl TaskRecord {
    /// Decode a task row. `row` is only used for diagnostics.
    pub fn from_row(cells: &[Cell], cols: &TaskColumns, row: usize) -> TaskRecord {
        let status_cell = at(cells, cols.status);
        let status = if status_cell.is_blank() {
            Status::NotStarted
        } else {
            Status::from_label(&status_cell.as_text()).unwrap_or_else(|| {
                tracing::warn!(row, value = %status_cell.as_text(), "unrecognised status, treating as not started");
                Status::NotStarted
            })
        };
        TaskRecord {
            process_id: at(cells, cols.process_id).as_text(),
            task_id: at(cells, cols.task_id).as_text(),
            process_name: at(cells, cols.process_name).as_text(),
            task_name: at(cells, cols.task_name).as_text(),
            assignee: at(cells, cols.assignee).as_text(),
            status,
            est_hours: at(cells, cols.est_hours).as_number().unwrap_or(0.0),
            start_date: at(cells, cols.start_date).as_date(),
            due_date: at(cells, cols.due_date).as_date(),
            notify: at(cells, cols.notify).as_bool(),
        }
    }

    pub fn to_row(&self, cols: &TaskColumns) -> Vec<Cell> {
        let mut cells = vec![Cell::Empty; cols.width()];
        put(&mut cells, cols.process_id, Cell::text(&self.process_id));
        put(&mut cells, cols.task_id, Cell::text(&self.task_id));
        put(&mut cells, cols.process_name, Cell::text(&self.process_name));
        put(&mut cells, cols.task_name, Cell::text(&self.task_name));
        put(&mut cells, cols.assignee, Cell::text(&self.assignee));
        put(&mut cells, cols.status, Cell::Text(self.status.label().to_string()));
        put(&mut cells, cols.est_hours, Cell::Number(self.est_hours));
        put(&mut cells, cols.start_date, self.start_date.map(Cell::date).unwrap_or_default());
        put(&mut cells, cols.due_date, self.due_date.map(Cell::date).unwrap_or_default());
        put(&mut cells, cols.notify, Cell::Bool(self.notify));
        cells
    }
}

/// Sheet store backed by an in-memory workbook, persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct BookStore {
    pub book: Workbook,
    config: Config,
}

impl BookStore {
    pub fn new(book: Workbook, config: Config) -> Self {
        BookStore { book, config }
    }

    /// Load the workbook file. A missing file yields a fresh workbook with
    /// header rows only; a file that does not parse is an error.
    pub fn load(path: &Path, config: Config) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "workbook not found, starting empty");
            return Ok(BookStore::new(skeleton(&config, false)?, config));
        }
        let buf = fs::read_to_string(path)?;
        let book: Workbook = serde_json::from_str(&buf)?;
        Ok(BookStore::new(book, config))
    }

    /// Save the workbook using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(&self.book)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        tracing::debug!(path = %path.display(), "workbook saved");
        Ok(())
    }

    fn task_sheet(&self) -> Option<&Sheet> {
        self.book.sheet(&self.config.sheets.task)
    }

    fn process_names(&self) -> Result<HashMap<String, String>> {
        Ok(self
            .processes()?
            .into_iter()
            .filter(|p| !p.process_id.is_empty())
            .map(|p| (p.process_id, p.process_name))
            .collect())
    }
}

fn task_header(cols: &TaskColumns) -> Vec<Cell> {
    let mut header = vec![Cell::Empty; cols.width()];
    let positions = [
        cols.process_id, cols.task_id, cols.process_name, cols.task_name, cols.assignee,
        cols.status, cols.est_hours, cols.start_date, cols.due_date, cols.notify,
    ];
    for (col, name) in positions.into_iter().zip(TASK_HEADERS) {
        put(&mut header, col, Cell::text(name));
    }
    header
}

fn process_header(cols: &ProcessColumns) -> Vec<Cell> {
    let mut header = vec![Cell::Empty; cols.width()];
    for (col, name) in [cols.process_id, cols.process_name, cols.description].into_iter().zip(PROCESS_HEADERS) {
        put(&mut header, col, Cell::text(name));
    }
    header
}

/// Build a workbook with the task, process and dashboard sheets and their headers.
pub fn skeleton(config: &Config, demo: bool) -> Result<Workbook> {
    let mut book = Workbook::default();
    book.sheet_mut(&config.sheets.task).rows.push(task_header(&config.task_columns));

    let p = &config.process_columns;
    let process_sheet = book.sheet_mut(&config.sheets.process);
    process_sheet.rows.push(process_header(p));
    if demo {
        for (id, name, desc) in DEMO_PROCESSES {
            let record = ProcessRecord {
                process_id: id.into(),
                process_name: name.into(),
                description: desc.into(),
            };
            process_sheet.rows.push(record.to_row(p));
        }
    }

    let dashboard = book.sheet_mut(&config.sheets.dashboard);
    let cell = config.webhook_cell_ref()?;
    if cell.row > 1 {
        dashboard.set_cell(cell.row - 1, cell.col, Cell::text("Chat webhook URL"))?;
    }
    Ok(book)
}

impl SheetStore for BookStore {
    fn processes(&self) -> Result<Vec<ProcessRecord>> {
        let cols = &self.config.process_columns;
        Ok(match self.book.sheet(&self.config.sheets.process) {
            Some(sheet) => sheet
                .data_rows()
                .map(|(_, cells)| ProcessRecord::from_row(cells, cols))
                .collect(),
            None => Vec::new(),
        })
    }

    fn tasks(&self) -> Result<Vec<TaskRow>> {
        let Some(sheet) = self.task_sheet() else {
            return Ok(Vec::new());
        };
        let names = self.process_names()?;
        let cols = &self.config.task_columns;
        Ok(sheet
            .data_rows()
            .map(|(row, cells)| {
                let mut task = TaskRecord::from_row(cells, cols, row);
                if let Some(name) = names.get(&task.process_id) {
                    task.process_name = name.clone();
                }
                TaskRow { row, task }
            })
            .collect())
    }

    fn task_at(&self, row: usize) -> Result<Option<TaskRecord>> {
        Ok(self.tasks()?.into_iter().find(|t| t.row == row).map(|t| t.task))
    }

    fn append_processes(&mut self, processes: &[ProcessRecord]) -> Result<()> {
        if processes.is_empty() {
            return Ok(());
        }
        let cols = self.config.process_columns.clone();
        let rows = processes.iter().map(|p| p.to_row(&cols)).collect();
        let sheet = self.book.sheet_mut(&self.config.sheets.process);
        if sheet.rows.is_empty() {
            sheet.rows.push(process_header(&cols));
        }
        let start = sheet.append_rows(rows);
        tracing::debug!(start, count = processes.len(), "appended process rows");
        Ok(())
    }

    fn append_tasks(&mut self, tasks: &[TaskRecord]) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        let names = self.process_names()?;
        let cols = self.config.task_columns.clone();
        let rows = tasks
            .iter()
            .map(|t| {
                let mut t = t.clone();
                if let Some(name) = names.get(&t.process_id) {
                    t.process_name = name.clone();
                }
                t.to_row(&cols)
            })
            .collect();
        let sheet = self.book.sheet_mut(&self.config.sheets.task);
        if sheet.rows.is_empty() {
            sheet.rows.push(task_header(&cols));
        }
        let start = sheet.append_rows(rows);
        tracing::debug!(start, count = tasks.len(), "appended task rows");
        Ok(())
    }

    fn webhook_url(&self) -> Result<Option<String>> {
        let cell = self.config.webhook_cell_ref()?;
        let value = self
            .book
            .sheet(&self.config.sheets.dashboard)
            .map(|s| s.cell(cell.row, cell.col).as_text())
            .unwrap_or_default();
        Ok(if value.is_empty() { None } else { Some(value) })
    }

    fn set_webhook_url(&mut self, url: &str) -> Result<()> {
        let cell = self.config.webhook_cell_ref()?;
        let sheet = self.book.sheet_mut(&self.config.sheets.dashboard);
        sheet.set_cell(cell.row, cell.col, Cell::text(url.trim()))
    }

    fn set_notify(&mut self, row: usize, value: bool) -> Result<()> {
        let col = self.config.task_columns.notify;
        let last = self.task_sheet().map(Sheet::last_filled_row).unwrap_or(0);
        if row < 2 || row > last {
            return Err(TrackerError::Sheet(format!("row {row} is not a task row")));
        }
        let sheet = self.book.sheet_mut(&self.config.sheets.task);
        sheet.set_cell(row, col, Cell::Bool(value))
    }
}

/// Copy the workbook into a timestamped file under `backup/` next to it.
pub fn create_backup(db_path: &Path) -> Result<PathBuf> {
    if !db_path.exists() {
        return Err(TrackerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "workbook file does not exist",
        )));
    }

    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let db_filename = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("workbook.json");
    let backup_path = backup_dir.join(format!("{timestamp}_{db_filename}"));

    fs::copy(db_path, &backup_path)?;
    Ok(backup_path)
}
