//! Status command for showing the current session and today's totals.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rune_core::{Clock, Session, SessionState, Store, Tracker};
use serde::Serialize;

use super::{format_duration, format_local};

/// Snapshot of tracker state for display.
#[derive(Debug)]
pub struct StatusData {
    pub current: Option<Session>,
    pub elapsed: Duration,
    pub today: Duration,
    pub week: Duration,
    /// Present only when the user is past the idle threshold.
    pub idle: Option<Duration>,
}

pub fn generate_status_data<S: Store, C: Clock>(tracker: &Tracker<S, C>) -> Result<StatusData> {
    let idle = match tracker.idle_time() {
        Ok(idle) => (idle >= tracker.idle_threshold()).then_some(idle),
        Err(err) => {
            tracing::debug!(error = %err, "idle time unavailable");
            None
        }
    };

    Ok(StatusData {
        current: tracker.current_session()?,
        elapsed: tracker.session_duration()?,
        today: tracker.daily_total()?,
        week: tracker.weekly_total()?,
        idle,
    })
}

pub fn format_status<W: Write>(writer: &mut W, data: &StatusData) -> Result<()> {
    match &data.current {
        Some(session) => {
            writeln!(writer, "Project: {}", session.project())?;
            writeln!(writer, "State:   {}", session.state().label())?;
            writeln!(writer, "Started: {}", format_local(session.start_time()))?;
            writeln!(writer, "Elapsed: {}", format_duration(data.elapsed))?;
        }
        None => writeln!(writer, "No active session.")?,
    }
    if let Some(idle) = data.idle {
        writeln!(writer, "Idle:    {}", format_duration(idle))?;
    }
    writeln!(writer)?;
    writeln!(writer, "Today:     {}", format_duration(data.today))?;
    writeln!(writer, "This week: {}", format_duration(data.week))?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct JsonStatus {
    pub state: SessionState,
    pub session_id: Option<String>,
    pub project: Option<String>,
    pub started_at: Option<String>,
    pub elapsed_ms: i64,
    pub today_ms: i64,
    pub week_ms: i64,
    pub idle_ms: Option<i64>,
}

pub fn format_status_json(data: &StatusData) -> Result<String> {
    let session = data.current.as_ref();
    let status = JsonStatus {
        state: session.map_or(SessionState::Stopped, Session::state),
        session_id: session.map(|s| s.id().to_string()),
        project: session.map(|s| s.project().to_string()),
        started_at: session.map(|s| format_utc(s.start_time())),
        elapsed_ms: data.elapsed.num_milliseconds(),
        today_ms: data.today.num_milliseconds(),
        week_ms: data.week.num_milliseconds(),
        idle_ms: data.idle.map(|d| d.num_milliseconds()),
    };
    Ok(serde_json::to_string_pretty(&status)?)
}

pub(crate) fn format_utc(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Runs the status command.
pub fn run<W: Write, S: Store, C: Clock>(
    writer: &mut W,
    tracker: &Tracker<S, C>,
    json: bool,
) -> Result<()> {
    let data = generate_status_data(tracker)?;
    if json {
        writeln!(writer, "{}", format_status_json(&data)?)?;
    } else {
        format_status(writer, &data)?;
    }
    Ok(())
}
