//! Process and task records.
//!
//! These are the typed forms of the rows held in the process and task sheets.
//! Conversion to and from sheet rows lives in the store module.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::Status;

/// Prefix of generated task ids (`TASK-001`).
pub const TASK_ID_PREFIX: &str = "TASK-";

/// A named phase of work that groups tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub process_id: String,
    pub process_name: String,
    pub description: String,
}

/// A unit of work with assignee, effort estimate, status and date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub process_id: String,
    pub task_id: String,
    /// Looked up from the process table by `process_id`.
    pub process_name: String,
    pub task_name: String,
    pub assignee: String,
    pub status: Status,
    pub est_hours: f64,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    /// One-shot trigger flag, reset after every notification attempt.
    pub notify: bool,
}

/// A task together with the 1-based sheet row it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub row: usize,
    pub task: TaskRecord,
}

/// Numeric suffix of a `TASK-<digits>` id, or `None` for anything else.
pub fn task_sequence(task_id: &str) -> Option<u64> {
    let digits = task_id.trim().strip_prefix(TASK_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Format a task id: `TASK-` plus the sequence number zero-padded to three digits.
/// Numbers past 999 keep all their digits.
pub fn format_task_id(seq: u64) -> String {
    format!("{TASK_ID_PREFIX}{seq:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_sequence() {
        assert_eq!(task_sequence("TASK-007"), Some(7));
        assert_eq!(task_sequence("TASK-1200"), Some(1200));
        assert_eq!(task_sequence(" TASK-012 "), Some(12));
        assert_eq!(task_sequence("TASK-"), None);
        assert_eq!(task_sequence("TASK-12a"), None);
        assert_eq!(task_sequence("task-012"), None);
        assert_eq!(task_sequence(""), None);
    }

    #[test]
    fn test_format_task_id() {
        assert_eq!(format_task_id(8), "TASK-008");
        assert_eq!(format_task_id(999), "TASK-999");
        assert_eq!(format_task_id(1000), "TASK-1000");
    }
}
