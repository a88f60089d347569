//! Session transition commands: `start`, `pause`, `resume`, `stop`.

use std::io::Write;

use anyhow::Result;
use chrono::Duration;
use rune_core::{Clock, ProjectDetector, Store, Tracker};

use super::{format_duration, format_local};

/// Starts a session, detecting the project when none is given.
pub fn start<W: Write, S: Store, C: Clock>(
    writer: &mut W,
    tracker: &mut Tracker<S, C>,
    project: Option<&str>,
    detector: &dyn ProjectDetector,
) -> Result<()> {
    let project = project.map_or_else(|| detector.detect_project(), str::to_string);
    let session = tracker.start(&project)?;
    writeln!(
        writer,
        "Started {} at {}",
        session.project(),
        format_local(session.start_time())
    )?;
    Ok(())
}

pub fn pause<W: Write, S: Store, C: Clock>(
    writer: &mut W,
    tracker: &mut Tracker<S, C>,
) -> Result<()> {
    let session = tracker.pause()?;
    let worked = tracker.session_duration()?;
    writeln!(
        writer,
        "Paused {} after {}",
        session.project(),
        format_duration(worked)
    )?;
    Ok(())
}

pub fn resume<W: Write, S: Store, C: Clock>(
    writer: &mut W,
    tracker: &mut Tracker<S, C>,
) -> Result<()> {
    let session = tracker.resume()?;
    writeln!(writer, "Resumed {}", session.project())?;
    Ok(())
}

pub fn stop<W: Write, S: Store, C: Clock>(
    writer: &mut W,
    tracker: &mut Tracker<S, C>,
) -> Result<()> {
    let session = tracker.stop()?;
    let duration = session.duration().unwrap_or_else(Duration::zero);
    writeln!(
        writer,
        "Stopped {}: {}",
        session.project(),
        format_duration(duration)
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{output, tracker};

    use insta::assert_snapshot;

    struct FixedProject(&'static str);

    impl ProjectDetector for FixedProject {
        fn detect_project(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn full_session_lifecycle_output() {
        let (mut tracker, clock) = tracker();
        let detector = FixedProject("detected");
        let mut buf = Vec::new();

        start(&mut buf, &mut tracker, Some("rune"), &detector).unwrap();
        clock.advance(Duration::minutes(50));
        pause(&mut buf, &mut tracker).unwrap();
        clock.advance(Duration::minutes(30));
        resume(&mut buf, &mut tracker).unwrap();
        clock.advance(Duration::minutes(25));
        stop(&mut buf, &mut tracker).unwrap();

        assert_snapshot!(output(buf), @r"
        Started rune at 2025-01-29 12:00
        Paused rune after 0h 50m
        Resumed rune
        Stopped rune: 1h 15m
        ");
    }

    #[test]
    fn start_without_project_uses_detector() {
        let (mut tracker, _clock) = tracker();
        let mut buf = Vec::new();
        start(&mut buf, &mut tracker, None, &FixedProject("detected")).unwrap();

        let current = tracker.current_session().unwrap().unwrap();
        assert_eq!(current.project().as_str(), "detected");
    }

    #[test]
    fn errors_surface_tracker_messages() {
        let (mut tracker, _clock) = tracker();
        let mut buf = Vec::new();

        let err = pause(&mut buf, &mut tracker).unwrap_err();
        assert_eq!(err.to_string(), "no active session to pause");

        start(&mut buf, &mut tracker, Some("rune"), &FixedProject("x")).unwrap();
        let err = resume(&mut buf, &mut tracker).unwrap_err();
        assert_eq!(err.to_string(), "session is not paused");

        let err = start(&mut buf, &mut tracker, Some("other"), &FixedProject("x")).unwrap_err();
        assert!(err.to_string().starts_with("session already active for project rune"));
    }
}
