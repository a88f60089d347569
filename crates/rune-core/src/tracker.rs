//! The session tracker.
//!
//! A [`Tracker`] owns a [`Store`] for its whole lifetime. Every operation
//! loads the current session from the store, applies one transition or
//! query, and writes the result back before returning, so the store stays the
//! single source of truth between process invocations.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use thiserror::Error;

use crate::aggregate::{self, Period, Window};
use crate::clock::{Clock, SystemClock};
use crate::idle::{IdleDetector, IdleError, NoIdleDetection};
use crate::session::{Session, TransitionError};
use crate::store::{SessionFilter, Store, StoreError};
use crate::types::{ProjectName, SessionId, ValidationError};

/// Default idle threshold used by [`Tracker::is_idle`].
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::minutes(5);

/// The transition that found no session to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Pause,
    Resume,
    Stop,
}

impl Action {
    const fn missing_session_message(self) -> &'static str {
        match self {
            Self::Pause => "no active session to pause",
            Self::Resume => "no session to resume",
            Self::Stop => "no active session to stop",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        })
    }
}

/// Errors returned by [`Tracker`] operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A session is already running or paused.
    #[error("session already active for project {project} (started {started_at})")]
    SessionAlreadyActive {
        id: SessionId,
        project: ProjectName,
        started_at: DateTime<Utc>,
    },

    /// There is no current session.
    #[error("{}", .0.missing_session_message())]
    NoActiveSession(Action),

    /// The current session is in the wrong state for the transition.
    #[error(transparent)]
    InvalidState(#[from] TransitionError),

    /// Caller input was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed; propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The idle detector failed.
    #[error(transparent)]
    Idle(#[from] IdleError),
}

/// Tracks a single active work session on top of a [`Store`].
pub struct Tracker<S: Store, C: Clock = SystemClock> {
    store: S,
    clock: C,
    idle: Box<dyn IdleDetector>,
    idle_threshold: Duration,
}

impl<S: Store> Tracker<S> {
    /// Creates a tracker on the system clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: Store, C: Clock> Tracker<S, C> {
    /// Creates a tracker with an explicit clock.
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            idle: Box::new(NoIdleDetection),
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
        }
    }

    /// Replaces the idle detector and the threshold used by [`Self::is_idle`].
    #[must_use]
    pub fn with_idle_detector(
        mut self,
        detector: impl IdleDetector + 'static,
        threshold: Duration,
    ) -> Self {
        self.idle = Box::new(detector);
        self.idle_threshold = threshold;
        self
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Starts a new running session for `project`.
    pub fn start(&mut self, project: &str) -> Result<Session, TrackerError> {
        let project = ProjectName::new(project)?;
        if let Some(current) = self.load_current()? {
            return Err(TrackerError::SessionAlreadyActive {
                id: current.id().clone(),
                project: current.project().clone(),
                started_at: current.start_time(),
            });
        }

        let session = Session::start(SessionId::generate(), project, self.clock.now());
        self.store.commit(&session, Some(session.id()))?;
        tracing::info!(session_id = %session.id(), project = %session.project(), "session started");
        Ok(session)
    }

    /// Pauses the running session.
    pub fn pause(&mut self) -> Result<Session, TrackerError> {
        let mut session = self.require_current(Action::Pause)?;
        session.pause(self.clock.now())?;
        self.store.put(&session)?;
        tracing::debug!(session_id = %session.id(), "session paused");
        Ok(session)
    }

    /// Resumes the paused session.
    pub fn resume(&mut self) -> Result<Session, TrackerError> {
        let mut session = self.require_current(Action::Resume)?;
        session.resume(self.clock.now())?;
        self.store.put(&session)?;
        tracing::debug!(
            session_id = %session.id(),
            accumulated_pause_ms = session.accumulated_pause().num_milliseconds(),
            "session resumed"
        );
        Ok(session)
    }

    /// Stops the current session and clears the current pointer.
    pub fn stop(&mut self) -> Result<Session, TrackerError> {
        let mut session = self.require_current(Action::Stop)?;
        session.stop(self.clock.now())?;
        self.store.commit(&session, None)?;
        tracing::info!(
            session_id = %session.id(),
            duration_ms = session.duration().map_or(0, |d| d.num_milliseconds()),
            "session stopped"
        );
        Ok(session)
    }

    /// The running or paused session, if any.
    pub fn current_session(&self) -> Result<Option<Session>, TrackerError> {
        self.load_current()
    }

    /// Working time of the current session, or zero when there is none.
    pub fn session_duration(&self) -> Result<Duration, TrackerError> {
        Ok(self
            .load_current()?
            .map_or_else(Duration::zero, |s| s.elapsed(self.clock.now())))
    }

    /// Working time credited to today.
    pub fn daily_total(&self) -> Result<Duration, TrackerError> {
        self.period_total(Period::Day)
    }

    /// Working time credited to this week.
    pub fn weekly_total(&self) -> Result<Duration, TrackerError> {
        self.period_total(Period::Week)
    }

    /// The local window for `period`, relative to the clock's today.
    pub fn window(&self, period: Period) -> Window {
        period.window(&Local, self.today())
    }

    /// Working time credited to `period`.
    pub fn period_total(&self, period: Period) -> Result<Duration, TrackerError> {
        let window = self.window(period);
        let sessions = self.sessions_in(&window)?;
        Ok(aggregate::window_total(&sessions, &window, self.clock.now()))
    }

    /// Working time per day of `period`, oldest day first.
    pub fn period_breakdown(
        &self,
        period: Period,
    ) -> Result<Vec<(NaiveDate, Duration)>, TrackerError> {
        let window = self.window(period);
        let sessions = self.sessions_in(&window)?;
        Ok(aggregate::daily_breakdown(
            &sessions,
            &Local,
            &window,
            self.clock.now(),
        ))
    }

    /// The `n` most recently stopped sessions, most recent first.
    pub fn session_history(&self, n: usize) -> Result<Vec<Session>, TrackerError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let sessions = self.store.list(&SessionFilter::stopped().with_limit(n))?;
        Ok(aggregate::recent_stopped(&sessions, n))
    }

    /// Total stopped time per project.
    pub fn project_stats(&self) -> Result<BTreeMap<ProjectName, Duration>, TrackerError> {
        let sessions = self.store.list(&SessionFilter::stopped())?;
        Ok(aggregate::project_totals(&sessions))
    }

    /// Whether the user has been idle for at least the configured threshold.
    pub fn is_idle(&self) -> Result<bool, TrackerError> {
        Ok(self.idle_time()? >= self.idle_threshold)
    }

    /// Idle time at or past which [`Self::is_idle`] reports true.
    pub const fn idle_threshold(&self) -> Duration {
        self.idle_threshold
    }

    /// Time since the last user input, as reported by the idle detector.
    pub fn idle_time(&self) -> Result<Duration, TrackerError> {
        Ok(self.idle.idle_time()?)
    }

    /// Releases the store. Safe to call more than once.
    pub fn close(&mut self) -> Result<(), TrackerError> {
        self.store.close()?;
        Ok(())
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&Local).date_naive()
    }

    /// Sessions that started in `window`, keeping only stopped ones and the
    /// live current session.
    fn sessions_in(&self, window: &Window) -> Result<Vec<Session>, TrackerError> {
        let current = self.load_current()?;
        let current_id = current.as_ref().map(Session::id);
        let sessions = self
            .store
            .list(&SessionFilter::between(window.start, window.end))?;
        Ok(sessions
            .into_iter()
            .filter(|s| !s.is_active() || Some(s.id()) == current_id)
            .collect())
    }

    fn load_current(&self) -> Result<Option<Session>, TrackerError> {
        match self.store.current()? {
            Some(session) if session.is_active() => Ok(Some(session)),
            Some(session) => {
                tracing::warn!(
                    session_id = %session.id(),
                    "current pointer names a stopped session, ignoring"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn require_current(&self, action: Action) -> Result<Session, TrackerError> {
        self.load_current()?
            .ok_or(TrackerError::NoActiveSession(action))
    }
}
