//! Projects command for per-project totals.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use chrono::Duration;
use rune_core::{Clock, ProjectName, Store, Tracker};
use serde::Serialize;

use super::format_duration;

pub fn format_projects<W: Write>(
    writer: &mut W,
    totals: &BTreeMap<ProjectName, Duration>,
) -> Result<()> {
    if totals.is_empty() {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    }

    let width = totals.keys().map(|p| p.as_str().len()).max().unwrap_or(0);
    for (project, total) in totals {
        writeln!(
            writer,
            "{:<width$}  {:>8}",
            project.as_str(),
            format_duration(*total)
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct JsonProject {
    pub project: String,
    pub total_ms: i64,
}

pub fn format_projects_json(totals: &BTreeMap<ProjectName, Duration>) -> Result<String> {
    let projects: Vec<JsonProject> = totals
        .iter()
        .map(|(project, total)| JsonProject {
            project: project.to_string(),
            total_ms: total.num_milliseconds(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&projects)?)
}

/// Runs the projects command.
pub fn run<W: Write, S: Store, C: Clock>(
    writer: &mut W,
    tracker: &Tracker<S, C>,
    json: bool,
) -> Result<()> {
    let totals = tracker.project_stats()?;
    if json {
        writeln!(writer, "{}", format_projects_json(&totals)?)?;
    } else {
        format_projects(writer, &totals)?;
    }
    Ok(())
}
