//! Due-date reminder classification.

use chrono::NaiveDate;

use crate::fields::{NotificationType, Status};
use crate::task::{TaskRecord, TaskRow};

/// A task that needs a reminder, and which kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub row: usize,
    pub task: TaskRecord,
    pub kind: NotificationType,
}

/// Reminder kind for a single task, or `None` when it needs no reminder.
///
/// Done tasks, unnamed tasks and tasks without a due date are skipped.
pub fn classify(task: &TaskRecord, today: NaiveDate) -> Option<NotificationType> {
    if task.status == Status::Done || task.task_name.trim().is_empty() {
        return None;
    }
    let due = task.due_date?;
    match (due - today).num_days() {
        d if d < 0 => Some(NotificationType::Delayed),
        0 => Some(NotificationType::DueToday),
        1 => Some(NotificationType::DueTomorrow),
        _ => None,
    }
}

/// Classify every task row, keeping table order.
pub fn classify_reminders(tasks: &[TaskRow], today: NaiveDate) -> Vec<Reminder> {
    tasks
        .iter()
        .filter_map(|t| {
            classify(&t.task, today).map(|kind| Reminder {
                row: t.row,
                task: t.task.clone(),
                kind,
            })
        })
        .collect()
}
