//! Work sessions and their state transitions.
//!
//! A [`Session`] only changes through [`Session::pause`], [`Session::resume`]
//! and [`Session::stop`]. Each takes the current instant from the caller, so
//! the rules here are pure and never read a clock themselves.
//!
//! # Clock skew
//!
//! Every instant handed to a transition is first raised to the session's
//! *floor*: the latest point the record already accounts for
//! (`start_time + accumulated_pause`, or `paused_at` while paused). A clock
//! that jumps backwards therefore produces zero-length intervals instead of
//! negative ones, and `duration = end_time - start_time - accumulated_pause`
//! stays non-negative.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::types::{ProjectName, SessionId, SessionState, ValidationError};

/// A transition that is not legal from the session's current state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// Pause requires a running session.
    #[error("session is not running")]
    NotRunning,
    /// Resume requires a paused session.
    #[error("session is not paused")]
    NotPaused,
    /// Stopped sessions are terminal.
    #[error("session is already stopped")]
    AlreadyStopped,
}

/// One contiguous, possibly paused, unit of tracked work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    project: ProjectName,
    state: SessionState,
    start_time: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    accumulated_pause: Duration,
    end_time: Option<DateTime<Utc>>,
    duration: Option<Duration>,
}

/// The raw fields of a session, as read from storage.
///
/// Turn these into a [`Session`] with [`Session::restore`], which checks the
/// session invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParts {
    pub id: SessionId,
    pub project: ProjectName,
    pub state: SessionState,
    pub start_time: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub accumulated_pause: Duration,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

impl Session {
    /// Creates a new running session.
    pub fn start(id: SessionId, project: ProjectName, now: DateTime<Utc>) -> Self {
        Self {
            id,
            project,
            state: SessionState::Running,
            start_time: now,
            paused_at: None,
            accumulated_pause: Duration::zero(),
            end_time: None,
            duration: None,
        }
    }

    /// Rebuilds a session from stored fields, rejecting records that break
    /// the session invariants.
    pub fn restore(parts: SessionParts) -> Result<Self, ValidationError> {
        let inconsistent = |reason| ValidationError::Inconsistent {
            id: parts.id.to_string(),
            reason,
        };

        if parts.accumulated_pause < Duration::zero() {
            return Err(inconsistent("accumulated pause is negative"));
        }
        if parts.paused_at.is_some() != (parts.state == SessionState::Paused) {
            return Err(inconsistent("paused_at must be set exactly when paused"));
        }
        let stopped = parts.state == SessionState::Stopped;
        if parts.end_time.is_some() != stopped || parts.duration.is_some() != stopped {
            return Err(inconsistent(
                "end_time and duration must be set exactly when stopped",
            ));
        }
        if let (Some(end_time), Some(duration)) = (parts.end_time, parts.duration) {
            if duration < Duration::zero() {
                return Err(inconsistent("duration is negative"));
            }
            if duration != end_time - parts.start_time - parts.accumulated_pause {
                return Err(inconsistent(
                    "duration does not match end_time - start_time - accumulated_pause",
                ));
            }
        }

        Ok(Self {
            id: parts.id,
            project: parts.project,
            state: parts.state,
            start_time: parts.start_time,
            paused_at: parts.paused_at,
            accumulated_pause: parts.accumulated_pause,
            end_time: parts.end_time,
            duration: parts.duration,
        })
    }

    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    pub const fn project(&self) -> &ProjectName {
        &self.project
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// When the current pause began; `None` unless paused.
    pub const fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    /// Total length of all completed pauses.
    pub const fn accumulated_pause(&self) -> Duration {
        self.accumulated_pause
    }

    /// `None` until the session is stopped.
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Final working time, frozen when the session stopped.
    pub const fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Whether this session is running or paused.
    pub const fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Pauses a running session.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        match self.state {
            SessionState::Running => {
                let now = self.clamp(now);
                self.paused_at = Some(now);
                self.state = SessionState::Paused;
                Ok(())
            }
            SessionState::Paused => Err(TransitionError::NotRunning),
            SessionState::Stopped => Err(TransitionError::AlreadyStopped),
        }
    }

    /// Resumes a paused session, folding the pause into `accumulated_pause`.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        match self.state {
            SessionState::Paused => {
                self.close_pause(now);
                self.state = SessionState::Running;
                Ok(())
            }
            SessionState::Running => Err(TransitionError::NotPaused),
            SessionState::Stopped => Err(TransitionError::AlreadyStopped),
        }
    }

    /// Stops a running or paused session and freezes its duration.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.state == SessionState::Stopped {
            return Err(TransitionError::AlreadyStopped);
        }
        if self.state == SessionState::Paused {
            self.close_pause(now);
        }
        let end_time = self.clamp(now);
        self.end_time = Some(end_time);
        self.duration = Some(end_time - self.start_time - self.accumulated_pause);
        self.state = SessionState::Stopped;
        Ok(())
    }

    /// Working time as of `now`, excluding pauses.
    ///
    /// Running sessions advance with `now`; paused sessions report the value
    /// at the moment they were paused; stopped sessions report their frozen
    /// duration.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self.state {
            SessionState::Stopped => self.duration.unwrap_or_else(Duration::zero),
            SessionState::Paused => {
                let paused_at = self.paused_at.unwrap_or(self.start_time);
                (paused_at - self.start_time - self.accumulated_pause).max(Duration::zero())
            }
            SessionState::Running => {
                (self.clamp(now) - self.start_time - self.accumulated_pause).max(Duration::zero())
            }
        }
    }

    fn close_pause(&mut self, now: DateTime<Utc>) {
        let now = self.clamp(now);
        if let Some(paused_at) = self.paused_at.take() {
            self.accumulated_pause += now - paused_at;
        }
    }

    /// The earliest instant this session can legally observe.
    fn floor(&self) -> DateTime<Utc> {
        let worked_from = self.start_time + self.accumulated_pause;
        self.paused_at.map_or(worked_from, |p| p.max(worked_from))
    }

    fn clamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = self.floor();
        if now < floor {
            tracing::warn!(
                session_id = %self.id,
                %now,
                %floor,
                "clock is behind session record, clamping"
            );
            floor
        } else {
            now
        }
    }
}
