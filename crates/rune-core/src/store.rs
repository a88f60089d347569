//! Session persistence contract.
//!
//! A [`Store`] holds every session record plus a single pointer naming the
//! current (running or paused) session. Implementations must make each
//! mutation durable before returning.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::session::Session;
use crate::types::{SessionId, SessionState, ValidationError};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by a [`Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the requested ID.
    #[error("session {id} not found")]
    NotFound { id: String },

    /// The backing storage failed to read or write.
    #[error("store I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: BoxError,
    },

    /// Another process held the store lock for longer than the timeout.
    #[error("timed out after {timeout:?} waiting for lock on {}", path.display())]
    LockTimeout { path: PathBuf, timeout: StdDuration },

    /// A stored record could not be turned back into a valid session.
    #[error("corrupt session record: {0}")]
    Corrupt(#[from] ValidationError),

    /// The store was used after [`Store::close`].
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// Wraps a backend error as [`StoreError::Io`].
    pub fn io(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

/// Selects sessions for [`Store::list`].
///
/// Time bounds apply to `start_time` and form a half-open range
/// `[since, until)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub project: Option<String>,
    pub state: Option<SessionState>,
    pub limit: Option<usize>,
}

impl SessionFilter {
    /// Matches every session.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches sessions that started within `[since, until)`.
    pub fn between(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
            ..Self::default()
        }
    }

    /// Matches only stopped sessions.
    pub fn stopped() -> Self {
        Self {
            state: Some(SessionState::Stopped),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `session` passes every condition except `limit`.
    pub fn matches(&self, session: &Session) -> bool {
        let start = session.start_time();
        self.since.is_none_or(|since| start >= since)
            && self.until.is_none_or(|until| start < until)
            && self
                .project
                .as_deref()
                .is_none_or(|project| session.project().as_str() == project)
            && self.state.is_none_or(|state| session.state() == state)
    }
}

/// Durable storage for session records and the current-session pointer.
pub trait Store {
    /// Inserts or replaces the record with the session's ID.
    fn put(&mut self, session: &Session) -> Result<(), StoreError>;

    /// Fetches a record by ID.
    fn get(&self, id: &SessionId) -> Result<Session, StoreError>;

    /// Returns the session named by the current pointer, if any.
    fn current(&self) -> Result<Option<Session>, StoreError>;

    /// Points the current pointer at `id`, or clears it.
    fn set_current(&mut self, id: Option<&SessionId>) -> Result<(), StoreError>;

    /// Lists matching sessions, most recently started first.
    fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError>;

    /// Writes a session and the pointer together.
    ///
    /// Backends with transactions should override this so a crash cannot
    /// leave the record and the pointer out of step.
    fn commit(&mut self, session: &Session, current: Option<&SessionId>) -> Result<(), StoreError> {
        self.put(session)?;
        self.set_current(current)
    }

    /// Releases the underlying resources. Calling it again is a no-op.
    fn close(&mut self) -> Result<(), StoreError>;
}

/// A non-persistent [`Store`] for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    // Insertion order breaks ties between equal start times.
    sessions: Vec<Session>,
    current: Option<SessionId>,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The raw pointer value, without resolving it.
    pub const fn current_id(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }

    const fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Store for MemoryStore {
    fn put(&mut self, session: &Session) -> Result<(), StoreError> {
        self.ensure_open()?;
        match self.sessions.iter_mut().find(|s| s.id() == session.id()) {
            Some(existing) => *existing = session.clone(),
            None => self.sessions.push(session.clone()),
        }
        Ok(())
    }

    fn get(&self, id: &SessionId) -> Result<Session, StoreError> {
        self.ensure_open()?;
        self.sessions
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    fn current(&self) -> Result<Option<Session>, StoreError> {
        self.ensure_open()?;
        self.current.as_ref().map(|id| self.get(id)).transpose()
    }

    fn set_current(&mut self, id: Option<&SessionId>) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.current = id.cloned();
        Ok(())
    }

    fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        self.ensure_open()?;
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .rev()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        // Stable sort keeps later insertions first among equal start times.
        sessions.sort_by(|a, b| b.start_time().cmp(&a.start_time()));
        if let Some(limit) = filter.limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        Ok(())
    }
}
