//! Plan import: turns an AI-generated JSON task plan into new process and task rows.
//!
//! The importer never touches existing rows. It reads the current tables,
//! works out which processes are new and which task ids come next, and returns
//! both batches for the store to append.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, TrackerError};
use crate::fields::Status;
use crate::task::{format_task_id, task_sequence, ProcessRecord, TaskRecord};

/// Description written on process rows created by an import.
pub const GENERATED_DESCRIPTION: &str = "generated";

/// One entry of a plan payload. Every field is optional; see `plan_import` for defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlanItem {
    pub process_id: Option<String>,
    pub process_name: Option<String>,
    pub task_name: Option<String>,
    pub assignee_name: Option<String>,
    pub est_hours: Option<f64>,
    /// Days from today to the start date.
    pub start_offset: Option<i64>,
    /// Days from today to the due date.
    pub due_offset: Option<i64>,
}

impl PlanItem {
    /// The process id, if present and non-blank.
    pub fn process_id(&self) -> Option<&str> {
        self.process_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Reject items without a process id instead of importing them unassigned.
    pub strict: bool,
}

/// Rows produced by one import, ready to append.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBatch {
    pub processes: Vec<ProcessRecord>,
    pub tasks: Vec<TaskRecord>,
}

impl ImportBatch {
    /// Human-readable confirmation with the task and new-process counts.
    pub fn summary(&self) -> String {
        format!(
            "Imported {} task(s) (new processes: {})",
            self.tasks.len(),
            self.processes.len()
        )
    }
}

/// Parse a plan payload. It must be a JSON array of plan-item objects.
pub fn parse_plan(json: &str) -> Result<Vec<PlanItem>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| TrackerError::InvalidInput(format!("plan is not valid JSON: {e}")))?;
    let Value::Array(items) = value else {
        return Err(TrackerError::InvalidInput(
            "plan JSON must be an array of plan items".into(),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::from_value(v)
                .map_err(|e| TrackerError::InvalidInput(format!("plan item {i}: {e}")))
        })
        .collect()
}

/// Highest `TASK-<digits>` sequence number among existing tasks, 0 if none.
pub fn max_task_sequence(tasks: &[TaskRecord]) -> u64 {
    tasks
        .iter()
        .filter_map(|t| task_sequence(&t.task_id))
        .max()
        .unwrap_or(0)
}

fn offset_date(today: NaiveDate, offset: Option<i64>, index: usize, field: &str) -> Result<NaiveDate> {
    let days = offset.unwrap_or(0);
    Duration::try_days(days)
        .and_then(|d| today.checked_add_signed(d))
        .ok_or_else(|| TrackerError::InvalidInput(format!("plan item {index}: {field} {days} is out of range")))
}

/// Build the process and task rows for a plan.
///
/// - Each non-blank `process_id` not already in `processes` (or earlier in the
///   plan) yields one new process row; the first occurrence supplies the name.
/// - Every item yields exactly one task row, numbered from the highest existing
///   task sequence in input order. Missing names default to empty, `est_hours`
///   to 1, offsets to 0 days from `today`.
pub fn plan_import(
    processes: &[ProcessRecord],
    tasks: &[TaskRecord],
    items: &[PlanItem],
    today: NaiveDate,
    options: ImportOptions,
) -> Result<ImportBatch> {
    if options.strict {
        if let Some(i) = items.iter().position(|item| item.process_id().is_none()) {
            return Err(TrackerError::InvalidInput(format!(
                "plan item {i} has no process_id"
            )));
        }
    }

    let mut names: HashMap<String, String> = processes
        .iter()
        .filter(|p| !p.process_id.is_empty())
        .map(|p| (p.process_id.clone(), p.process_name.clone()))
        .collect();
    let mut seen: HashSet<String> = names.keys().cloned().collect();

    let mut batch = ImportBatch::default();
    for item in items {
        let Some(id) = item.process_id() else { continue };
        if !seen.insert(id.to_string()) {
            continue;
        }
        let name = item.process_name.clone().unwrap_or_default();
        names.insert(id.to_string(), name.clone());
        batch.processes.push(ProcessRecord {
            process_id: id.to_string(),
            process_name: name,
            description: GENERATED_DESCRIPTION.to_string(),
        });
    }

    let max_id = max_task_sequence(tasks);
    if max_id.checked_add(items.len() as u64).is_none() {
        return Err(TrackerError::InvalidInput("task id sequence exhausted".into()));
    }
    for (i, item) in items.iter().enumerate() {
        let process_id = item.process_id().unwrap_or_default().to_string();
        let est_hours = match item.est_hours {
            Some(h) if h != 0.0 => h,
            _ => 1.0,
        };
        batch.tasks.push(TaskRecord {
            process_name: names.get(&process_id).cloned().unwrap_or_default(),
            process_id,
            task_id: format_task_id(max_id + i as u64 + 1),
            task_name: item.task_name.clone().unwrap_or_default(),
            assignee: item.assignee_name.clone().unwrap_or_default(),
            status: Status::NotStarted,
            est_hours,
            start_date: Some(offset_date(today, item.start_offset, i, "start_offset")?),
            due_date: Some(offset_date(today, item.due_offset, i, "due_offset")?),
            notify: false,
        });
    }

    tracing::debug!(
        tasks = batch.tasks.len(),
        processes = batch.processes.len(),
        last_seq = max_id + items.len() as u64,
        "plan import batch built"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::task;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn process(id: &str, name: &str) -> ProcessRecord {
        ProcessRecord {
            process_id: id.into(),
            process_name: name.into(),
            description: "manual".into(),
        }
    }

    fn item(process_id: Option<&str>, task_name: &str) -> PlanItem {
        PlanItem {
            process_id: process_id.map(String::from),
            task_name: Some(task_name.into()),
            ..PlanItem::default()
        }
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(parse_plan("{}"), Err(TrackerError::InvalidInput(_))));
        assert!(matches!(parse_plan("not json"), Err(TrackerError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_reports_bad_item_index() {
        let err = parse_plan(r#"[{"task_name": "ok"}, {"est_hours": "lots"}]"#).unwrap_err();
        match err {
            TrackerError::InvalidInput(msg) => assert!(msg.starts_with("plan item 1")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_full_item_and_ignores_unknown_fields() {
        let items = parse_plan(
            r#"[{"process_id":"P-05","process_name":"Serving","task_name":"Set tables",
                 "assignee_name":"Honda","est_hours":1.5,"start_offset":-1,"due_offset":3,
                 "notes":"extra"}]"#,
        )
        .unwrap();
        assert_eq!(
            items[0],
            PlanItem {
                process_id: Some("P-05".into()),
                process_name: Some("Serving".into()),
                task_name: Some("Set tables".into()),
                assignee_name: Some("Honda".into()),
                est_hours: Some(1.5),
                start_offset: Some(-1),
                due_offset: Some(3),
            }
        );
    }

    #[test]
    fn test_ids_continue_after_existing_max() {
        let existing = vec![task("TASK-003", "P-01", "a"), task("TASK-007", "P-01", "b"), task("misc", "P-01", "c")];
        let items = vec![item(Some("P-01"), "first"), item(Some("P-01"), "second")];
        let batch = plan_import(&[], &existing, &items, today(), ImportOptions::default()).unwrap();
        let ids: Vec<&str> = batch.tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["TASK-008", "TASK-009"]);
        assert_eq!(batch.tasks[0].task_name, "first");
        assert_eq!(batch.tasks[1].task_name, "second");
    }

    #[test]
    fn test_first_task_on_empty_table() {
        let batch = plan_import(&[], &[], &[item(None, "x")], today(), ImportOptions::default()).unwrap();
        assert_eq!(batch.tasks[0].task_id, "TASK-001");
    }

    #[test]
    fn test_one_task_per_item_even_when_empty() {
        let items = vec![PlanItem::default(), item(None, "y"), PlanItem::default()];
        let batch = plan_import(&[], &[], &items, today(), ImportOptions::default()).unwrap();
        assert_eq!(batch.tasks.len(), 3);
        assert!(batch.processes.is_empty());
        let t = &batch.tasks[0];
        assert_eq!(t.process_id, "");
        assert_eq!(t.task_name, "");
        assert_eq!(t.assignee, "");
        assert_eq!(t.est_hours, 1.0);
        assert_eq!(t.status, Status::NotStarted);
        assert_eq!(t.start_date, Some(today()));
        assert_eq!(t.due_date, Some(today()));
        assert!(!t.notify);
    }

    #[test]
    fn test_existing_process_not_duplicated() {
        let processes = vec![process("P-01", "Purchasing")];
        let items = vec![item(Some("P-01"), "buy")];
        let batch = plan_import(&processes, &[], &items, today(), ImportOptions::default()).unwrap();
        assert!(batch.processes.is_empty());
        assert_eq!(batch.tasks[0].process_name, "Purchasing");
    }

    #[test]
    fn test_repeated_process_in_batch_first_wins() {
        let mut a = item(Some("P-99"), "one");
        a.process_name = Some("Tasting".into());
        let mut b = item(Some("P-99"), "two");
        b.process_name = Some("Ignored".into());
        let batch = plan_import(&[], &[], &[a, b], today(), ImportOptions::default()).unwrap();
        assert_eq!(
            batch.processes,
            vec![ProcessRecord {
                process_id: "P-99".into(),
                process_name: "Tasting".into(),
                description: GENERATED_DESCRIPTION.into(),
            }]
        );
        assert_eq!(batch.tasks.len(), 2);
        assert!(batch.tasks.iter().all(|t| t.process_name == "Tasting"));
    }

    #[test]
    fn test_offsets_and_hours() {
        let mut it = item(Some("P-01"), "prep");
        it.start_offset = Some(-2);
        it.due_offset = Some(5);
        it.est_hours = Some(3.5);
        let mut zero = item(Some("P-01"), "zero");
        zero.est_hours = Some(0.0);
        let batch = plan_import(&[], &[], &[it, zero], today(), ImportOptions::default()).unwrap();
        assert_eq!(batch.tasks[0].start_date, NaiveDate::from_ymd_opt(2026, 10, 14));
        assert_eq!(batch.tasks[0].due_date, NaiveDate::from_ymd_opt(2026, 10, 21));
        assert_eq!(batch.tasks[0].est_hours, 3.5);
        assert_eq!(batch.tasks[1].est_hours, 1.0);
    }

    #[test]
    fn test_huge_offset_is_invalid_input() {
        let mut it = item(None, "far");
        it.due_offset = Some(i64::MAX);
        let err = plan_import(&[], &[], &[it], today(), ImportOptions::default()).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput(_)));
    }

    #[test]
    fn test_blank_process_id_treated_as_missing() {
        let batch = plan_import(&[], &[], &[item(Some("  "), "x")], today(), ImportOptions::default()).unwrap();
        assert!(batch.processes.is_empty());
        assert_eq!(batch.tasks[0].process_id, "");
    }

    #[test]
    fn test_strict_mode_rejects_missing_process() {
        let items = vec![item(Some("P-01"), "ok"), item(None, "orphan")];
        let err = plan_import(&[], &[], &items, today(), ImportOptions { strict: true }).unwrap_err();
        match err {
            TrackerError::InvalidInput(msg) => assert_eq!(msg, "plan item 1 has no process_id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ids_strictly_increasing_across_large_batch() {
        let existing = vec![task("TASK-998", "P-01", "a")];
        let items: Vec<PlanItem> = (0..5).map(|i| item(None, &format!("t{i}"))).collect();
        let batch = plan_import(&[], &existing, &items, today(), ImportOptions::default()).unwrap();
        let seqs: Vec<u64> = batch.tasks.iter().filter_map(|t| task_sequence(&t.task_id)).collect();
        assert_eq!(seqs, vec![999, 1000, 1001, 1002, 1003]);
        assert_eq!(batch.tasks[1].task_id, "TASK-1000");
    }

    #[test]
    fn test_exhausted_sequence_is_invalid_input() {
        let existing = vec![task(&format!("TASK-{}", u64::MAX), "P-01", "last")];
        let err = plan_import(&[], &existing, &[item(Some("P-01"), "x")], today(), ImportOptions::default()).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput(msg) if msg.contains("exhausted")));

        let existing = vec![task(&format!("TASK-{}", u64::MAX - 1), "P-01", "almost")];
        let batch = plan_import(&[], &existing, &[item(Some("P-01"), "x")], today(), ImportOptions::default()).unwrap();
        assert_eq!(batch.tasks[0].task_id, format!("TASK-{}", u64::MAX));
    }

    #[test]
    fn test_summary() {
        let batch = plan_import(&[], &[], &[item(Some("P-9"), "x")], today(), ImportOptions::default()).unwrap();
        assert_eq!(batch.summary(), "Imported 1 task(s) (new processes: 1)");
    }
}
