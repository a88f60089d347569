use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rune_cli::commands::{history, projects, report, session, status};
use rune_cli::idle::SystemIdle;
use rune_cli::{Cli, Commands, Config};
use rune_core::{ManifestDetector, NoIdleDetection, ProjectDetector, Tracker};
use rune_db::SqliteStore;

/// Load config and open the store, ensuring the parent directory exists.
fn open_tracker(config_path: Option<&Path>) -> Result<Tracker<SqliteStore>> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let store = SqliteStore::open_with_timeout(&config.database_path, config.lock_timeout())
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    let tracker = Tracker::new(store);
    let tracker = if config.idle_detection {
        tracker.with_idle_detector(SystemIdle, config.idle_threshold())
    } else {
        tracker.with_idle_detector(NoIdleDetection, config.idle_threshold())
    };
    Ok(tracker)
}

/// Detects the project from the working directory, or falls back to the default name.
struct WorkingDirProject;

impl ProjectDetector for WorkingDirProject {
    fn detect_project(&self) -> String {
        ManifestDetector::from_current_dir().map_or_else(
            || rune_core::project::DEFAULT_PROJECT.to_string(),
            |detector| detector.detect_project(),
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut tracker = open_tracker(cli.config.as_deref())?;
    let mut stdout = std::io::stdout().lock();

    let result = match command {
        Commands::Start { project } => {
            session::start(&mut stdout, &mut tracker, project.as_deref(), &WorkingDirProject)
        }
        Commands::Pause => session::pause(&mut stdout, &mut tracker),
        Commands::Resume => session::resume(&mut stdout, &mut tracker),
        Commands::Stop => session::stop(&mut stdout, &mut tracker),
        Commands::Status { json } => status::run(&mut stdout, &tracker, *json),
        Commands::Report { period, json } => {
            report::run(&mut stdout, &tracker, period.period(), *json)
        }
        Commands::History { limit, json } => history::run(&mut stdout, &tracker, *limit, *json),
        Commands::Projects { json } => projects::run(&mut stdout, &tracker, *json),
    };

    tracker.close().context("failed to close store")?;
    result
}
