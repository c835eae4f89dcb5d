//! Tracker service: the operations behind each command.
//!
//! `Tracker` ties a sheet store to a notifier. Each operation runs to
//! completion against the store; persisting the store afterwards is the
//! caller's job.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use crate::card::build_card;
use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::fields::{FailurePolicy, NotificationType, Status};
use crate::importer::{parse_plan, plan_import, ImportBatch, ImportOptions};
use crate::notifier::Notifier;
use crate::reminder::classify_reminders;
use crate::store::SheetStore;
use crate::task::TaskRecord;

/// Notification settings taken from the config.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Target of the card "Open sheet" button.
    pub sheet_link: String,
    pub send_interval: Duration,
    pub failure_policy: FailurePolicy,
    /// Shown when the webhook cell is blank.
    pub webhook_location: String,
}

impl DispatchSettings {
    pub fn from_config(config: &Config, sheet_link: String) -> Self {
        DispatchSettings {
            sheet_link,
            send_interval: config.send_interval(),
            failure_policy: config.failure_policy,
            webhook_location: format!("{}!{}", config.sheets.dashboard, config.webhook_cell),
        }
    }
}

/// A user edit of one cell, as delivered by the sheet host.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub sheet: String,
    pub row: usize,
    pub column: usize,
    pub value: bool,
}

/// Result of a single-row notification trigger. The notify flag has been
/// reset in every case.
#[derive(Debug)]
pub enum TriggerOutcome {
    Sent { task_id: String },
    MissingWebhook,
    DeliveryFailed(TrackerError),
}

/// Result of a reminder sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub sent: Vec<(String, NotificationType)>,
    /// Failed sends, only collected under `FailurePolicy::Continue`.
    pub failures: Vec<(String, TrackerError)>,
    /// The task table had no rows at all.
    pub no_tasks: bool,
}

impl SweepReport {
    pub fn summary(&self) -> String {
        if self.no_tasks {
            return "There are no tasks.".into();
        }
        let mut out = if self.sent.is_empty() && self.failures.is_empty() {
            "No tasks are delayed, due today, or due tomorrow.".to_string()
        } else {
            format!("Sent {} reminder(s).", self.sent.len())
        };
        if !self.failures.is_empty() {
            out.push_str(&format!(" {} failed:", self.failures.len()));
            for (task_id, err) in &self.failures {
                out.push_str(&format!("\n  {task_id}: {err}"));
            }
        }
        out
    }
}

/// Remaining estimated hours for one assignee.
#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    pub assignee: String,
    pub hours: f64,
}

pub struct Tracker<S, N> {
    store: S,
    notifier: N,
    settings: DispatchSettings,
}

impl<S: SheetStore, N: Notifier> Tracker<S, N> {
    pub fn new(store: S, notifier: N, settings: DispatchSettings) -> Self {
        Tracker { store, notifier, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Import a JSON plan. Nothing is written unless the whole payload is valid.
    pub fn import_plan(&mut self, json: &str, today: NaiveDate, options: ImportOptions) -> Result<ImportBatch> {
        let items = parse_plan(json)?;
        let processes = self.store.processes()?;
        let tasks: Vec<TaskRecord> = self.store.tasks()?.into_iter().map(|t| t.task).collect();
        let batch = plan_import(&processes, &tasks, &items, today, options)?;

        self.store.append_processes(&batch.processes)?;
        self.store.append_tasks(&batch.tasks)?;
        tracing::info!(
            tasks = batch.tasks.len(),
            processes = batch.processes.len(),
            "plan imported"
        );
        Ok(batch)
    }

    fn require_webhook(&self) -> Result<String> {
        self.store
            .webhook_url()?
            .ok_or_else(|| TrackerError::MissingConfiguration(self.settings.webhook_location.clone()))
    }

    fn send(&self, url: &str, task: &TaskRecord, kind: NotificationType) -> Result<()> {
        let card_id = format!("task-card-{}", Utc::now().timestamp_millis());
        let message = build_card(task, kind, &self.settings.sheet_link, card_id);
        tracing::debug!(task = %task.task_id, title = message.title(), "delivering card");
        self.notifier.deliver(url, &message)
    }

    /// Send a reminder for every delayed, due-today and due-tomorrow task.
    ///
    /// Sends are spaced by the configured interval. Under `FailurePolicy::Abort`
    /// the first failed send ends the sweep with its error.
    pub fn remind(&self, today: NaiveDate) -> Result<SweepReport> {
        let url = self.require_webhook()?;
        let tasks = self.store.tasks()?;
        if tasks.is_empty() {
            return Ok(SweepReport { no_tasks: true, ..SweepReport::default() });
        }

        let mut report = SweepReport::default();
        for (i, reminder) in classify_reminders(&tasks, today).into_iter().enumerate() {
            if i > 0 && !self.settings.send_interval.is_zero() {
                std::thread::sleep(self.settings.send_interval);
            }
            let task_id = reminder.task.task_id.clone();
            match self.send(&url, &reminder.task, reminder.kind) {
                Ok(()) => {
                    tracing::info!(task = %task_id, row = reminder.row, kind = reminder.kind.name(), "reminder sent");
                    report.sent.push((task_id, reminder.kind));
                }
                Err(e) => match self.settings.failure_policy {
                    FailurePolicy::Abort => {
                        tracing::error!(task = %task_id, sent = report.sent.len(), error = %e, "reminder sweep aborted");
                        return Err(e);
                    }
                    FailurePolicy::Continue => {
                        tracing::warn!(task = %task_id, error = %e, "reminder failed, continuing");
                        report.failures.push((task_id, e));
                    }
                },
            }
        }
        Ok(report)
    }

    /// React to a cell edit. Only checking the notify box of a task row fires
    /// a notification; every other edit is ignored.
    pub fn on_cell_edit(&mut self, edit: &CellEdit, task_sheet: &str, notify_column: usize) -> Result<Option<TriggerOutcome>> {
        if edit.sheet != task_sheet || edit.column != notify_column || !edit.value || edit.row < 2 {
            return Ok(None);
        }
        self.trigger(edit.row).map(Some)
    }

    /// Send one `Normal` notification for the task at `row`, then reset its
    /// notify flag whether or not the send went through.
    pub fn trigger(&mut self, row: usize) -> Result<TriggerOutcome> {
        let task = self
            .store
            .task_at(row)?
            .ok_or_else(|| TrackerError::Sheet(format!("row {row} is not a task row")))?;

        let outcome = with_notify_reset(self, row, |tracker| match tracker.require_webhook() {
            Ok(url) => match tracker.send(&url, &task, NotificationType::Normal) {
                Ok(()) => TriggerOutcome::Sent { task_id: task.task_id.clone() },
                Err(e) => TriggerOutcome::DeliveryFailed(e),
            },
            Err(TrackerError::MissingConfiguration(_)) => TriggerOutcome::MissingWebhook,
            Err(e) => TriggerOutcome::DeliveryFailed(e),
        })?;

        match &outcome {
            TriggerOutcome::Sent { task_id } => tracing::info!(task = %task_id, row, "notification sent"),
            TriggerOutcome::MissingWebhook => tracing::warn!(row, "webhook not configured, notification skipped"),
            TriggerOutcome::DeliveryFailed(e) => tracing::warn!(row, error = %e, "notification failed"),
        }
        Ok(outcome)
    }

    /// Remaining estimated hours per assignee over tasks that are not done.
    pub fn workload(&self) -> Result<Vec<Workload>> {
        let mut hours: BTreeMap<String, f64> = BTreeMap::new();
        for t in self.store.tasks()? {
            if t.task.status == Status::Done || t.task.assignee.is_empty() {
                continue;
            }
            *hours.entry(t.task.assignee).or_default() += t.task.est_hours;
        }
        Ok(hours
            .into_iter()
            .map(|(assignee, hours)| Workload { assignee, hours })
            .collect())
    }
}

/// Run `send` and then clear the notify flag at `row`, on every path.
fn with_notify_reset<S: SheetStore, N: Notifier>(
    tracker: &mut Tracker<S, N>,
    row: usize,
    send: impl FnOnce(&Tracker<S, N>) -> TriggerOutcome,
) -> Result<TriggerOutcome> {
    let outcome = send(tracker);
    tracker.store.set_notify(row, false)?;
    Ok(outcome)
}
