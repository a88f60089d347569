//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Work session timer.
///
/// Tracks one active work session at a time, excluding paused time, and
/// reports daily and weekly totals.
#[derive(Debug, Parser)]
#[command(name = "rune", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a session. The project is detected from the working directory
    /// when omitted.
    Start {
        /// Project name.
        project: Option<String>,
    },

    /// Pause the running session.
    Pause,

    /// Resume the paused session.
    Resume,

    /// Stop the current session.
    Stop,

    /// Show the current session and today's totals.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show time totals for a day or week.
    Report {
        #[command(flatten)]
        period: PeriodArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List recently stopped sessions.
    History {
        /// Number of sessions to show.
        #[arg(short = 'n', long = "limit", default_value_t = 10)]
        limit: usize,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show total stopped time per project.
    Projects {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Report period selection. Defaults to the current week.
#[derive(Debug, Default, Args)]
#[group(multiple = false)]
pub struct PeriodArgs {
    /// Current week (default).
    #[arg(long)]
    pub week: bool,

    /// Previous week.
    #[arg(long)]
    pub last_week: bool,

    /// Today.
    #[arg(long)]
    pub day: bool,

    /// Yesterday.
    #[arg(long)]
    pub last_day: bool,
}

impl PeriodArgs {
    pub const fn period(&self) -> rune_core::Period {
        use rune_core::Period;
        if self.last_week {
            Period::LastWeek
        } else if self.day {
            Period::Day
        } else if self.last_day {
            Period::LastDay
        } else {
            Period::Week
        }
    }
}
