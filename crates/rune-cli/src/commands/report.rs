//! Report command for day and week totals.
//!
//! This module implements `rune report` with various period options
//! (--week, --last-week, --day, --last-day) and output formats (human-readable, JSON).

use std::io::Write;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use rune_core::{Clock, Period, Store, Tracker, Window};
use serde::Serialize;

use super::format_duration;

/// Period type for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Week,
    Day,
}

impl From<Period> for PeriodType {
    fn from(period: Period) -> Self {
        if period.is_week() {
            Self::Week
        } else {
            Self::Day
        }
    }
}

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub period_type: PeriodType,
    pub window: Window,
    pub total: Duration,
    pub days: Vec<(NaiveDate, Duration)>,
}

impl ReportData {
    fn first_day(&self) -> NaiveDate {
        self.window.start.with_timezone(&Local).date_naive()
    }

    /// Last day of the period, inclusive.
    fn last_day(&self) -> NaiveDate {
        self.days.last().map_or_else(|| self.first_day(), |(day, _)| *day)
    }
}

pub fn generate_report_data<S: Store, C: Clock>(
    tracker: &Tracker<S, C>,
    period: Period,
) -> Result<ReportData> {
    Ok(ReportData {
        period_type: period.into(),
        window: tracker.window(period),
        total: tracker.period_total(period)?,
        days: tracker.period_breakdown(period)?,
    })
}

/// Formats the period description for the report header.
fn format_period_description(data: &ReportData) -> String {
    match data.period_type {
        // "Week of Jan 27, 2025"
        PeriodType::Week => format!("Week of {}", data.first_day().format("%b %-d, %Y")),
        // "Wednesday, Jan 29, 2025"
        PeriodType::Day => data.first_day().format("%A, %b %-d, %Y").to_string(),
    }
}

/// Formats the human-readable report output.
pub fn format_report<W: Write>(writer: &mut W, data: &ReportData) -> Result<()> {
    writeln!(writer, "TIME REPORT: {}", format_period_description(data))?;
    writeln!(writer)?;

    if data.period_type == PeriodType::Week {
        for (day, total) in &data.days {
            writeln!(
                writer,
                "{}  {:>8}",
                day.format("%a %b %d"),
                format_duration(*total)
            )?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "Total: {}", format_duration(data.total))?;
    Ok(())
}

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub period: JsonPeriod,
    pub total_ms: i64,
    pub days: Vec<JsonDay>,
}

#[derive(Debug, Serialize)]
pub struct JsonPeriod {
    pub start: String,
    pub end: String,
    #[serde(rename = "type")]
    pub period_type: PeriodType,
}

#[derive(Debug, Serialize)]
pub struct JsonDay {
    pub date: String,
    pub total_ms: i64,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let report = JsonReport {
        period: JsonPeriod {
            start: data.first_day().format("%Y-%m-%d").to_string(),
            end: data.last_day().format("%Y-%m-%d").to_string(),
            period_type: data.period_type,
        },
        total_ms: data.total.num_milliseconds(),
        days: data
            .days
            .iter()
            .map(|(day, total)| JsonDay {
                date: day.format("%Y-%m-%d").to_string(),
                total_ms: total.num_milliseconds(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Runs the report command.
pub fn run<W: Write, S: Store, C: Clock>(
    writer: &mut W,
    tracker: &Tracker<S, C>,
    period: Period,
    json: bool,
) -> Result<()> {
    let data = generate_report_data(tracker, period)?;
    if json {
        writeln!(writer, "{}", format_report_json(&data)?)?;
    } else {
        format_report(writer, &data)?;
    }
    Ok(())
}
