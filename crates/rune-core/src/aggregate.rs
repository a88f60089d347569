//! Read-side totals over stored sessions.
//!
//! Days run from local midnight to local midnight. Weeks are ISO weeks,
//! Monday 00:00 to the following Monday 00:00 local time. A session is never
//! split across buckets: all of its time counts toward the bucket that
//! contains its `start_time`.
//!
//! Everything here is pure; an empty slice of sessions yields zero totals and
//! empty maps.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::session::Session;
use crate::types::{ProjectName, SessionState};

/// A reporting period relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    LastDay,
    Week,
    LastWeek,
}

/// A half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

impl Period {
    /// The window for this period, taking `today` as a date in `tz`.
    pub fn window<Tz: TimeZone>(self, tz: &Tz, today: NaiveDate) -> Window {
        match self {
            Self::Day => day_window(tz, today),
            Self::LastDay => day_window(tz, today - Duration::days(1)),
            Self::Week => week_window(tz, today),
            Self::LastWeek => week_window(tz, today - Duration::days(7)),
        }
    }

    pub const fn is_week(self) -> bool {
        matches!(self, Self::Week | Self::LastWeek)
    }
}

/// Converts local midnight of `date` to UTC.
///
/// An ambiguous midnight (DST fall-back) resolves to the earlier instant. A
/// midnight that does not exist (DST spring-forward) falls back to 01:00.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
        })
        .map_or_else(
            || Utc.from_utc_datetime(&midnight),
            |dt| dt.with_timezone(&Utc),
        )
}

/// The local calendar day containing `date`.
pub fn day_window<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Window {
    Window {
        start: local_midnight(tz, date),
        end: local_midnight(tz, date + Duration::days(1)),
    }
}

/// The Monday-to-Monday week containing `date`.
pub fn week_window<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Window {
    let days_since_monday = date.weekday().num_days_from_monday();
    let monday = date - Duration::days(i64::from(days_since_monday));
    Window {
        start: local_midnight(tz, monday),
        end: local_midnight(tz, monday + Duration::days(7)),
    }
}

/// Working time credited to `window`.
///
/// Stopped sessions contribute their frozen duration; an active session
/// contributes its live duration as of `now`.
pub fn window_total(sessions: &[Session], window: &Window, now: DateTime<Utc>) -> Duration {
    sessions
        .iter()
        .filter(|s| window.contains(s.start_time()))
        .map(|s| s.elapsed(now))
        .fold(Duration::zero(), |acc, d| acc + d)
}

/// Working time per local date within `window`, one entry per day, oldest
/// first. Days without sessions are present with a zero total.
pub fn daily_breakdown<Tz: TimeZone>(
    sessions: &[Session],
    tz: &Tz,
    window: &Window,
    now: DateTime<Utc>,
) -> Vec<(NaiveDate, Duration)> {
    let first = window.start.with_timezone(tz).date_naive();
    let mut days: Vec<(NaiveDate, Duration)> = first
        .iter_days()
        .take_while(|day| local_midnight(tz, *day) < window.end)
        .map(|day| (day, Duration::zero()))
        .collect();

    for session in sessions.iter().filter(|s| window.contains(s.start_time())) {
        let day = session.start_time().with_timezone(tz).date_naive();
        if let Some((_, total)) = days.iter_mut().find(|(d, _)| *d == day) {
            *total += session.elapsed(now);
        }
    }
    days
}

/// The `n` most recently started stopped sessions, most recent first.
///
/// `sessions` must already be ordered most recent first, as returned by
/// [`Store::list`](crate::Store::list).
pub fn recent_stopped(sessions: &[Session], n: usize) -> Vec<Session> {
    sessions
        .iter()
        .filter(|s| s.state() == SessionState::Stopped)
        .take(n)
        .cloned()
        .collect()
}

/// Total stopped time per project.
pub fn project_totals(sessions: &[Session]) -> BTreeMap<ProjectName, Duration> {
    let mut totals: BTreeMap<ProjectName, Duration> = BTreeMap::new();
    for session in sessions {
        if let Some(duration) = session.duration() {
            *totals
                .entry(session.project().clone())
                .or_insert_with(Duration::zero) += duration;
        }
    }
    totals
}
