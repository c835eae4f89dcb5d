//! Command implementations for the CLI interface.
//!
//! Each handler loads the workbook, runs one tracker operation, saves when the
//! operation wrote anything, and reports the result. Failures are printed to
//! stderr and end the process with exit code 1.

use std::io::Read;
use std::path::Path;

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::config::Config;
use crate::error::TrackerError;
use crate::fields::{FailurePolicy, Status};
use crate::importer::ImportOptions;
use crate::notifier::WebhookNotifier;
use crate::store::{create_backup, skeleton, BookStore, SheetStore};
use crate::task::TaskRow;
use crate::tracker::{CellEdit, DispatchSettings, Tracker, TriggerOutcome};

#[derive(Subcommand)]
pub enum Commands {
    /// Create the workbook with the task, process and dashboard sheets.
    Init {
        /// Seed the process sheet with sample processes.
        #[arg(long)]
        demo: bool,
    },

    /// Import an AI-generated task plan (JSON array) from a file, or `-` for stdin.
    Import {
        /// Plan file path, or `-` to read stdin.
        input: String,
        /// Reject plan items without a process_id.
        #[arg(long)]
        strict: bool,
        /// Skip creating a backup before import.
        #[arg(long)]
        no_backup: bool,
    },

    /// Send reminders for delayed, due-today and due-tomorrow tasks.
    Remind {
        /// Keep sending after a failed send and report failures at the end.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Send a notification for one task, as if its notify box was checked.
    Notify {
        /// Task ID, e.g. TASK-004.
        task_id: String,
    },

    /// List tasks.
    List {
        /// Include completed tasks.
        #[arg(long)]
        all: bool,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
    },

    /// List processes.
    Processes,

    /// Remaining estimated hours per assignee.
    Workload,

    /// Show or set the chat webhook URL.
    Webhook {
        /// New webhook URL. Pass an empty string to clear it.
        url: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn load_store(db_path: &Path, config: &Config) -> BookStore {
    BookStore::load(db_path, config.clone())
        .unwrap_or_else(|e| fail(format!("Failed to load workbook {}: {e}", db_path.display())))
}

fn save_store(store: &BookStore, db_path: &Path) {
    if let Err(e) = store.save(db_path) {
        fail(format!("Failed to save workbook: {e}"));
    }
}

/// Target of the card button: the configured sheet URL, or the workbook file.
fn sheet_link(config: &Config, db_path: &Path) -> String {
    if let Some(url) = config.sheet_url.as_ref().filter(|u| !u.trim().is_empty()) {
        return url.clone();
    }
    let abs = std::fs::canonicalize(db_path).unwrap_or_else(|_| db_path.to_path_buf());
    format!("file://{}", abs.display())
}

fn open_tracker(store: BookStore, config: &Config, db_path: &Path) -> Tracker<BookStore, WebhookNotifier> {
    let settings = DispatchSettings::from_config(config, sheet_link(config, db_path));
    Tracker::new(store, WebhookNotifier::new(config.request_timeout()), settings)
}

/// Create a new workbook. An existing workbook is left untouched.
pub fn cmd_init(db_path: &Path, config: &Config, demo: bool) {
    if db_path.exists() {
        fail(format!("Workbook {} already exists", db_path.display()));
    }
    let book = skeleton(config, demo).unwrap_or_else(|e| fail(format!("Failed to build workbook: {e}")));
    let store = BookStore::new(book, config.clone());
    save_store(&store, db_path);
    println!("Created workbook {}", db_path.display());
    println!("Set the chat webhook with: tracker webhook <URL>");
}

/// Import a JSON plan with automatic backup.
pub fn cmd_import(db_path: &Path, config: &Config, input: String, strict: bool, no_backup: bool) {
    let json = if input == "-" {
        let mut buf = String::new();
        if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
            fail(format!("Failed to read plan from stdin: {e}"));
        }
        buf
    } else {
        std::fs::read_to_string(&input)
            .unwrap_or_else(|e| fail(format!("Failed to read plan file '{input}': {e}")))
    };

    let mut tracker = open_tracker(load_store(db_path, config), config, db_path);
    let options = ImportOptions { strict: strict || config.strict_import };
    let batch = match tracker.import_plan(&json, today(), options) {
        Ok(batch) => batch,
        Err(e) => fail(format!("Import failed: {e}")),
    };

    if !no_backup && db_path.exists() {
        match create_backup(db_path) {
            Ok(path) => println!("Created backup: {}", path.display()),
            Err(e) => fail(format!("Failed to create backup ({e}); rerun with --no-backup to skip it")),
        }
    }
    save_store(tracker.store(), db_path);
    println!("{}", batch.summary());
}

/// Reminder sweep over all tasks.
pub fn cmd_remind(db_path: &Path, config: &Config, continue_on_error: bool) {
    let mut config = config.clone();
    if continue_on_error {
        config.failure_policy = FailurePolicy::Continue;
    }
    let tracker = open_tracker(load_store(db_path, &config), &config, db_path);
    match tracker.remind(today()) {
        Ok(report) => {
            println!("{}", report.summary());
            if !report.failures.is_empty() {
                std::process::exit(1);
            }
        }
        Err(e @ TrackerError::MissingConfiguration(_)) => fail(e),
        Err(e) => fail(format!("Reminder sweep stopped: {e}")),
    }
}

/// Check the notify box of one task and handle the resulting edit.
pub fn cmd_notify(db_path: &Path, config: &Config, task_id: String) {
    let mut store = load_store(db_path, config);
    let row = match store.tasks() {
        Ok(tasks) => tasks.into_iter().find(|t| t.task.task_id == task_id).map(|t| t.row),
        Err(e) => fail(e),
    };
    let Some(row) = row else {
        fail(format!("No task found with ID '{task_id}'"));
    };
    if let Err(e) = store.set_notify(row, true) {
        fail(e);
    }

    let edit = CellEdit {
        sheet: config.sheets.task.clone(),
        row,
        column: config.task_columns.notify,
        value: true,
    };
    let mut tracker = open_tracker(store, config, db_path);
    let outcome = tracker.on_cell_edit(&edit, &config.sheets.task, config.task_columns.notify);
    save_store(tracker.store(), db_path);

    match outcome {
        Ok(Some(TriggerOutcome::Sent { task_id })) => println!("Sent notification for {task_id}"),
        Ok(Some(TriggerOutcome::MissingWebhook)) => fail(TrackerError::MissingConfiguration(format!(
            "{}!{}",
            config.sheets.dashboard, config.webhook_cell
        ))),
        Ok(Some(TriggerOutcome::DeliveryFailed(e))) => fail(format!("Notification failed: {e}")),
        Ok(None) => {}
        Err(e) => fail(e),
    }
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {delta}d")
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn print_tasks(tasks: &[TaskRow], today: NaiveDate) {
    println!(
        "{:<10} {:<8} {:<14} {:<14} {:<12} {:>6} {:<10} {}",
        "ID", "Process", "Process name", "Assignee", "Status", "Hours", "Due", "Task"
    );
    for t in tasks {
        let task = &t.task;
        println!(
            "{:<10} {:<8} {:<14} {:<14} {:<12} {:>6} {:<10} {}",
            truncate(&task.task_id, 10),
            truncate(&task.process_id, 8),
            truncate(&task.process_name, 14),
            truncate(&task.assignee, 14),
            task.status.label(),
            task.est_hours,
            format_due_relative(task.due_date, today),
            task.task_name
        );
    }
}

/// List tasks, hiding completed ones unless `all` is set.
pub fn cmd_list(db_path: &Path, config: &Config, all: bool, status: Option<Status>) {
    let store = load_store(db_path, config);
    let tasks: Vec<TaskRow> = store
        .tasks()
        .unwrap_or_else(|e| fail(e))
        .into_iter()
        .filter(|t| all || status == Some(Status::Done) || t.task.status != Status::Done)
        .filter(|t| status.map_or(true, |s| t.task.status == s))
        .collect();
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    print_tasks(&tasks, today());
}

pub fn cmd_processes(db_path: &Path, config: &Config) {
    let store = load_store(db_path, config);
    let processes = store.processes().unwrap_or_else(|e| fail(e));
    println!("{:<10} {:<20} {}", "ID", "Name", "Description");
    for p in processes {
        println!(
            "{:<10} {:<20} {}",
            truncate(&p.process_id, 10),
            truncate(&p.process_name, 20),
            p.description
        );
    }
}

/// Remaining hours per assignee over tasks that are not done.
pub fn cmd_workload(db_path: &Path, config: &Config) {
    let tracker = open_tracker(load_store(db_path, config), config, db_path);
    let rows = tracker.workload().unwrap_or_else(|e| fail(e));
    println!("{:<20} {:>16}", "Assignee", "Remaining (h)");
    for w in rows {
        println!("{:<20} {:>16}", truncate(&w.assignee, 20), w.hours);
    }
}

/// Show or set the webhook URL cell.
pub fn cmd_webhook(db_path: &Path, config: &Config, url: Option<String>) {
    let mut store = load_store(db_path, config);
    match url {
        None => match store.webhook_url() {
            Ok(Some(url)) => println!("{url}"),
            Ok(None) => println!("Webhook URL is not set ({}!{})", config.sheets.dashboard, config.webhook_cell),
            Err(e) => fail(e),
        },
        Some(url) => {
            if let Err(e) = store.set_webhook_url(&url) {
                fail(e);
            }
            save_store(&store, db_path);
            if url.trim().is_empty() {
                println!("Webhook URL cleared");
            } else {
                println!("Webhook URL set");
            }
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_format_due_relative() {
        let today = d(2026, 10, 16);
        assert_eq!(format_due_relative(None, today), "-");
        assert_eq!(format_due_relative(Some(today), today), "today");
        assert_eq!(format_due_relative(Some(d(2026, 10, 17)), today), "tomorrow");
        assert_eq!(format_due_relative(Some(d(2026, 10, 19)), today), "in 3d");
        assert_eq!(format_due_relative(Some(d(2026, 10, 14)), today), "2d late");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Preparation phase", 8), "Prepara…");
        assert_eq!(truncate("x", 0), "…");
    }

    #[test]
    fn test_truncate_counts_chars_in_labels() {
        // ⚪️ is a base char plus a variation selector
        assert_eq!(Status::NotStarted.label().chars().count(), 6);
        assert_eq!(truncate(Status::NotStarted.label(), 6), "⚪️ 未着手");
        assert_eq!(truncate(Status::NotStarted.label(), 5), "⚪️ 未…");
        assert_eq!(truncate(Status::Done.label(), 3), "🟢 …");
        assert_eq!(truncate("仕込み担当の田中さん", 4), "仕込み…");
    }

    #[test]
    fn test_sheet_link_prefers_config() {
        let mut config = Config::default();
        config.sheet_url = Some("https://docs.example.test/sheet".into());
        assert_eq!(
            sheet_link(&config, Path::new("workbook.json")),
            "https://docs.example.test/sheet"
        );
        config.sheet_url = None;
        assert!(sheet_link(&config, Path::new("workbook.json")).starts_with("file://"));
    }

    #[test]
    fn test_cli_parses_commands() {
        use clap::Parser;
        use crate::cli::Cli;

        let cli = Cli::try_parse_from(["tracker", "--db", "w.json", "import", "-", "--strict"]).unwrap();
        assert!(matches!(cli.command, Commands::Import { ref input, strict: true, no_backup: false } if input == "-"));
        let cli = Cli::try_parse_from(["tracker", "remind", "--continue-on-error"]).unwrap();
        assert!(matches!(cli.command, Commands::Remind { continue_on_error: true }));
        let cli = Cli::try_parse_from(["tracker", "list", "--status", "pending-review"]).unwrap();
        assert!(matches!(cli.command, Commands::List { all: false, status: Some(Status::PendingReview) }));
    }
}
