//! Tracker behavior against the on-disk store and the real clock.

use std::thread::sleep;
use std::time::Duration as StdDuration;

use chrono::Duration;
use rune_core::{SessionState, Store, Tracker, TrackerError};
use rune_db::SqliteStore;

#[test]
fn pause_time_is_excluded_on_real_clock() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("rune.db");
    let mut tracker = Tracker::new(SqliteStore::open(&path).unwrap());

    tracker.start("rune").unwrap();
    sleep(StdDuration::from_millis(10));
    tracker.pause().unwrap();
    sleep(StdDuration::from_millis(50));
    tracker.resume().unwrap();
    sleep(StdDuration::from_millis(10));
    let stopped = tracker.stop().unwrap();

    let duration = stopped.duration().unwrap();
    assert!(duration >= Duration::milliseconds(18), "{duration:?}");
    assert!(duration < Duration::milliseconds(70), "{duration:?}");
    assert!(stopped.accumulated_pause() >= Duration::milliseconds(45));
}

#[test]
fn state_carries_across_processes() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("rune.db");

    let started = {
        let mut tracker = Tracker::new(SqliteStore::open(&path).unwrap());
        let session = tracker.start("rune").unwrap();
        tracker.close().unwrap();
        session
    };

    {
        let mut tracker = Tracker::new(SqliteStore::open(&path).unwrap());
        let err = tracker.start("other").unwrap_err();
        assert!(matches!(err, TrackerError::SessionAlreadyActive { .. }));
        let paused = tracker.pause().unwrap();
        assert_eq!(paused.id(), started.id());
        assert_eq!(paused.state(), SessionState::Paused);
    }

    let mut tracker = Tracker::new(SqliteStore::open(&path).unwrap());
    tracker.resume().unwrap();
    let stopped = tracker.stop().unwrap();
    assert_eq!(stopped.id(), started.id());
    assert!(tracker.current_session().unwrap().is_none());

    let history = tracker.session_history(10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], tracker.store().get(started.id()).unwrap());
}
