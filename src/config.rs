//! Tracker configuration.
//!
//! Sheet names, the task/process column layout, the webhook cell and the
//! notification pacing all live in one `Config` value that is loaded from
//! `config.toml` (or built from defaults) and handed to each component.
//! Column numbers are 1-based (A = 1), matching how they read in the sheet.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cell::CellRef;
use crate::error::{Result, TrackerError};
use crate::fields::FailurePolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sheets: SheetNames,
    pub task_columns: TaskColumns,
    pub process_columns: ProcessColumns,
    /// A1 reference of the webhook URL cell on the dashboard sheet.
    pub webhook_cell: String,
    /// Link target of the "Open sheet" card button. Defaults to the workbook file.
    pub sheet_url: Option<String>,
    /// Pause between consecutive reminder sends.
    pub send_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    /// Reject plan items that carry no process id.
    pub strict_import: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sheets: SheetNames::default(),
            task_columns: TaskColumns::default(),
            process_columns: ProcessColumns::default(),
            webhook_cell: "D2".into(),
            sheet_url: None,
            send_interval_ms: 300,
            request_timeout_secs: 10,
            failure_policy: FailurePolicy::Abort,
            strict_import: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub task: String,
    pub process: String,
    pub dashboard: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        SheetNames {
            task: "Task_DB".into(),
            process: "Process_DB".into(),
            dashboard: "Dashboard".into(),
        }
    }
}

/// 1-based column positions of the task sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskColumns {
    pub process_id: usize,
    pub task_id: usize,
    pub process_name: usize,
    pub task_name: usize,
    pub assignee: usize,
    pub status: usize,
    pub est_hours: usize,
    pub start_date: usize,
    pub due_date: usize,
    pub notify: usize,
}

impl Default for TaskColumns {
    fn default() -> Self {
        TaskColumns {
            process_id: 1,
            task_id: 2,
            process_name: 3,
            task_name: 4,
            assignee: 5,
            status: 6,
            est_hours: 7,
            start_date: 8,
            due_date: 9,
            notify: 10,
        }
    }
}

impl TaskColumns {
    fn all(&self) -> [usize; 10] {
        [
            self.process_id,
            self.task_id,
            self.process_name,
            self.task_name,
            self.assignee,
            self.status,
            self.est_hours,
            self.start_date,
            self.due_date,
            self.notify,
        ]
    }

    /// Width of a task row: the right-most configured column.
    pub fn width(&self) -> usize {
        self.all().into_iter().max().unwrap_or(0)
    }
}

/// 1-based column positions of the process sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessColumns {
    pub process_id: usize,
    pub process_name: usize,
    pub description: usize,
}

impl Default for ProcessColumns {
    fn default() -> Self {
        ProcessColumns {
            process_id: 1,
            process_name: 2,
            description: 3,
        }
    }
}

impl ProcessColumns {
    pub fn width(&self) -> usize {
        self.process_id.max(self.process_name).max(self.description)
    }
}

impl Config {
    /// Load configuration from a TOML file, validating the column layout.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| TrackerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Config::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Config::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let cols = self.task_columns.all();
        if cols.iter().any(|&c| c == 0) {
            return Err(TrackerError::Config("task column numbers are 1-based".into()));
        }
        for (i, c) in cols.iter().enumerate() {
            if cols[i + 1..].contains(c) {
                return Err(TrackerError::Config(format!("task column {c} is assigned twice")));
            }
        }
        let p = &self.process_columns;
        if p.process_id == 0 || p.process_name == 0 || p.description == 0 {
            return Err(TrackerError::Config("process column numbers are 1-based".into()));
        }
        if p.process_id == p.process_name || p.process_id == p.description || p.process_name == p.description {
            return Err(TrackerError::Config("process columns must be distinct".into()));
        }
        self.webhook_cell_ref()?;
        Ok(())
    }

    pub fn webhook_cell_ref(&self) -> Result<CellRef> {
        CellRef::parse(&self.webhook_cell)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.task_columns.width(), 10);
        assert_eq!(config.webhook_cell_ref().unwrap(), CellRef { row: 2, col: 4 });
        assert_eq!(config.send_interval(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "webhook_cell = \"E2\"\nfailure_policy = \"continue\"\n\n[sheets]\ntask = \"Tasks\"\n",
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.sheets.task, "Tasks");
        assert_eq!(config.sheets.process, "Process_DB");
        assert_eq!(config.webhook_cell, "E2");
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.send_interval_ms, 300);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let mut config = Config::default();
        config.task_columns.notify = config.task_columns.due_date;
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(matches!(Config::from_file(&path), Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
