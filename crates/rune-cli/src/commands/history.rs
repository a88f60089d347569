//! History command for listing recently stopped sessions.

use std::io::Write;

use anyhow::Result;
use chrono::Duration;
use rune_core::{Clock, Session, Store, Tracker};
use serde::Serialize;

use super::status::format_utc;
use super::{format_duration, format_local};

pub fn format_history<W: Write>(writer: &mut W, sessions: &[Session]) -> Result<()> {
    if sessions.is_empty() {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    }

    let width = sessions
        .iter()
        .map(|s| s.project().as_str().len())
        .max()
        .unwrap_or(0);
    for session in sessions {
        let duration = session.duration().unwrap_or_else(Duration::zero);
        writeln!(
            writer,
            "{}  {:<width$}  {:>8}",
            format_local(session.start_time()),
            session.project().as_str(),
            format_duration(duration),
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct JsonSession {
    pub id: String,
    pub project: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub accumulated_pause_ms: i64,
    pub duration_ms: Option<i64>,
}

impl From<&Session> for JsonSession {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id().to_string(),
            project: session.project().to_string(),
            start_time: format_utc(session.start_time()),
            end_time: session.end_time().map(format_utc),
            accumulated_pause_ms: session.accumulated_pause().num_milliseconds(),
            duration_ms: session.duration().map(|d| d.num_milliseconds()),
        }
    }
}

pub fn format_history_json(sessions: &[Session]) -> Result<String> {
    let sessions: Vec<JsonSession> = sessions.iter().map(JsonSession::from).collect();
    Ok(serde_json::to_string_pretty(&sessions)?)
}

/// Runs the history command.
pub fn run<W: Write, S: Store, C: Clock>(
    writer: &mut W,
    tracker: &Tracker<S, C>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let sessions = tracker.session_history(limit)?;
    if json {
        writeln!(writer, "{}", format_history_json(&sessions)?)?;
    } else {
        format_history(writer, &sessions)?;
    }
    Ok(())
}
