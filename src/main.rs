//! # Tracker - task tracker with AI plan import and chat reminders
//!
//! A command-line task tracker that keeps its data in a spreadsheet-style
//! workbook (a JSON file of named sheets) and talks to a chat webhook.
//!
//! ## Key Features
//!
//! - **Plan Import**: Paste the JSON task plan an AI assistant produced; new processes
//!   are registered once and every plan item becomes a task with the next `TASK-NNN` id
//! - **Reminder Sweep**: One command notifies the chat about every task that is
//!   delayed, due today, or due tomorrow
//! - **Notify Trigger**: Send a one-off card for a single task; its notify flag is
//!   always cleared afterwards
//! - **Workload Summary**: Remaining estimated hours per assignee
//!
//! ## Quick Start
//!
//! ```bash
//! # Create the workbook with sample processes
//! tracker init --demo
//!
//! # Configure the chat webhook
//! tracker webhook https://chat.googleapis.com/v1/spaces/.../messages?key=...
//!
//! # Import a plan
//! tracker import plan.json
//!
//! # Send reminders
//! tracker remind
//! ```
//!
//! Data is stored locally in `~/.tracker/workbook.json`; settings are read from
//! `~/.tracker/config.toml` when present. Set `RUST_LOG=task_tracker=debug` for
//! detailed logs on stderr.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod card;
pub mod cell;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod fields;
pub mod importer;
pub mod notifier;
pub mod reminder;
pub mod store;
pub mod task;
pub mod tracker;

use cli::Cli;
use cmd::*;
use config::Config;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("task_tracker=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    // Determine tracker directory
    let tracker_dir = {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".tracker")
    };
    if cli.db.is_none() || cli.config.is_none() {
        if let Err(e) = std::fs::create_dir_all(&tracker_dir) {
            eprintln!("Failed to create tracker directory {}: {}", tracker_dir.display(), e);
            std::process::exit(1);
        }
    }

    let config_path = cli.config.unwrap_or_else(|| tracker_dir.join("config.toml"));
    let config = match Config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
    };
    let db_path = cli.db.unwrap_or_else(|| tracker_dir.join("workbook.json"));

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Init { demo } => cmd_init(&db_path, &config, demo),

        Commands::Import { input, strict, no_backup } =>
            cmd_import(&db_path, &config, input, strict, no_backup),

        Commands::Remind { continue_on_error } => cmd_remind(&db_path, &config, continue_on_error),

        Commands::Notify { task_id } => cmd_notify(&db_path, &config, task_id),

        Commands::List { all, status } => cmd_list(&db_path, &config, all, status),

        Commands::Processes => cmd_processes(&db_path, &config),

        Commands::Workload => cmd_workload(&db_path, &config),

        Commands::Webhook { url } => cmd_webhook(&db_path, &config, url),
    }
}
