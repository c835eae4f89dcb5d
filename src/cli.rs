use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// File-backed task tracker with plan import and chat reminders.
/// Storage defaults to ~/.tracker/workbook.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "tracker", version, about = "Task tracker with AI plan import and chat reminders")]
pub struct Cli {
    /// Path to the JSON workbook file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the TOML config file (default: ~/.tracker/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
