//! CLI subcommand implementations.

pub mod history;
pub mod projects;
pub mod report;
pub mod session;
pub mod status;

use chrono::{DateTime, Duration, Local, Utc};

/// Formats a duration as `"Xh Ym"`, flooring seconds. Negative is zero.
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    format!("{hours}h {minutes}m")
}

/// Formats an instant as local `YYYY-MM-DD HH:MM`.
pub fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, Local, TimeZone, Utc};
    use rune_core::{ManualClock, MemoryStore, Tracker};

    pub type TestTracker = Tracker<MemoryStore, ManualClock>;

    /// Wednesday 2025-01-29 12:00 local time.
    pub fn local_noon() -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2025, 1, 29, 12, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    pub fn tracker() -> (TestTracker, ManualClock) {
        let clock = ManualClock::new(local_noon());
        (Tracker::with_clock(MemoryStore::new(), clock.clone()), clock)
    }

    pub fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }
}
