//! Storage layer for rune.
//!
//! Provides a [`Store`] backed by `rusqlite`.
//!
//! # Locking
//!
//! [`SqliteStore::open`] takes an exclusive advisory lock (`fs2`) on a
//! sibling `.lock` file and holds it until [`Store::close`] or drop. A second
//! process opening the same database polls for the lock and gives up with
//! [`StoreError::LockTimeout`] once the timeout passes, so the read-modify-write
//! of the current-session pointer is never interleaved between processes.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format with millisecond
//! precision (e.g., `2025-01-15T10:30:00.000Z`). Lexicographic ordering
//! matches chronological ordering, and values stay human-readable.
//!
//! ## Durations
//!
//! `accumulated_pause_ms` and `duration_ms` are INTEGER milliseconds.
//!
//! ## Current Session
//!
//! `current_session` holds at most one row (`slot = 0`). No row means no
//! session is active.
//!
//! # Durability
//!
//! Every mutation runs in its own implicit or explicit transaction with
//! `synchronous = FULL`, so it is on disk before the call returns.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use thiserror::Error;

use rune_core::{
    ProjectName, Session, SessionFilter, SessionId, SessionParts, Store, StoreError,
    ValidationError,
};

/// How long [`SqliteStore::open`] waits for another process to release the lock.
pub const DEFAULT_LOCK_TIMEOUT: StdDuration = StdDuration::from_secs(5);

const LOCK_POLL_INTERVAL: StdDuration = StdDuration::from_millis(25);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The lock file could not be opened or locked.
    #[error("failed to lock {}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse a session timestamp.
    #[error("invalid timestamp for session {session_id}: {timestamp}")]
    TimestampParse {
        session_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row does not describe a valid session.
    #[error("invalid session data for {session_id}")]
    InvalidSession {
        session_id: String,
        #[source]
        source: ValidationError,
    },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::InvalidSession { source, .. } => Self::Corrupt(source),
            DbError::TimestampParse { ref session_id, .. } => {
                let message = format!("unreadable timestamp in session {session_id}");
                Self::io(message, err)
            }
            DbError::Lock { .. } => Self::io("failed to lock store", err),
            DbError::Sqlite(_) => Self::io("sqlite operation failed", err),
        }
    }
}

/// SQLite-backed session store.
///
/// The store owns both the connection and the process lock; both are released
/// on [`Store::close`] or when the store is dropped.
pub struct SqliteStore {
    conn: Option<Connection>,
    lock: Option<File>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens a store at the given path, creating it if necessary, and waits
    /// up to [`DEFAULT_LOCK_TIMEOUT`] for the process lock.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Opens a store, waiting at most `lock_timeout` for the process lock.
    ///
    /// The schema is initialized on first open.
    pub fn open_with_timeout(path: &Path, lock_timeout: StdDuration) -> Result<Self, StoreError> {
        let lock = acquire_lock(&lock_path(path), lock_timeout)?;
        let conn = Connection::open(path).map_err(DbError::from)?;
        conn.busy_timeout(lock_timeout).map_err(DbError::from)?;
        let store = Self {
            conn: Some(conn),
            lock: Some(lock),
            path: Some(path.to_path_buf()),
        };
        store.init()?;
        tracing::debug!(path = %path.display(), "opened session store");
        Ok(store)
    }

    /// Opens an in-memory store.
    ///
    /// Useful for testing. Nothing is locked and the data is destroyed when
    /// the store closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(DbError::from)?;
        let store = Self {
            conn: Some(conn),
            lock: None,
            path: None,
        };
        store.init()?;
        Ok(store)
    }

    /// The database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA synchronous = FULL;

            -- sessions: one row per work session, never deleted
            -- state: 'running' | 'paused' | 'stopped'
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                project TEXT NOT NULL,
                state TEXT NOT NULL,
                start_time TEXT NOT NULL,
                paused_at TEXT,
                accumulated_pause_ms INTEGER NOT NULL DEFAULT 0,
                end_time TEXT,
                duration_ms INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_time);
            CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project);
            CREATE INDEX IF NOT EXISTS idx_sessions_state ON sessions(state);

            CREATE TABLE IF NOT EXISTS current_session (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                session_id TEXT NOT NULL,
                FOREIGN KEY (session_id) REFERENCES sessions(id)
            );
            ",
        )
        .map_err(DbError::from)?;
        Ok(())
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }

    fn conn_mut(&mut self) -> Result<&mut Connection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::Closed)
    }
}

impl Store for SqliteStore {
    fn put(&mut self, session: &Session) -> Result<(), StoreError> {
        upsert_session(self.conn()?, session)?;
        Ok(())
    }

    fn get(&self, id: &SessionId) -> Result<Session, StoreError> {
        let row = self
            .conn()?
            .query_row(
                "
                SELECT id, project, state, start_time, paused_at, accumulated_pause_ms, end_time, duration_ms
                FROM sessions
                WHERE id = ?
                ",
                [id.as_str()],
                SessionRow::from_row,
            )
            .optional()
            .map_err(DbError::from)?;
        match row {
            Some(row) => Ok(row.into_session()?),
            None => Err(StoreError::NotFound { id: id.to_string() }),
        }
    }

    fn current(&self) -> Result<Option<Session>, StoreError> {
        let id: Option<String> = self
            .conn()?
            .query_row(
                "SELECT session_id FROM current_session WHERE slot = 0",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(DbError::from)?;
        let Some(id) = id else {
            return Ok(None);
        };
        let id = SessionId::new(id)?;
        self.get(&id).map(Some)
    }

    fn set_current(&mut self, id: Option<&SessionId>) -> Result<(), StoreError> {
        write_pointer(self.conn()?, id)?;
        Ok(())
    }

    fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(since) = filter.since {
            clauses.push("start_time >= ?");
            values.push(format_timestamp(since));
        }
        if let Some(until) = filter.until {
            clauses.push("start_time < ?");
            values.push(format_timestamp(until));
        }
        if let Some(project) = &filter.project {
            clauses.push("project = ?");
            values.push(project.clone());
        }
        if let Some(state) = filter.state {
            clauses.push("state = ?");
            values.push(state.as_str().to_string());
        }

        let mut query = String::from(
            "SELECT id, project, state, start_time, paused_at, accumulated_pause_ms, end_time, duration_ms FROM sessions",
        );
        if !clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clauses.join(" AND "));
        }
        // rowid breaks ties between sessions started in the same millisecond.
        query.push_str(" ORDER BY start_time DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&query).map_err(DbError::from)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), SessionRow::from_row)
            .map_err(DbError::from)?;
        let mut sessions = Vec::new();
        for row in rows {
            let row = row.map_err(DbError::from)?;
            sessions.push(row.into_session()?);
        }
        Ok(sessions)
    }

    fn commit(&mut self, session: &Session, current: Option<&SessionId>) -> Result<(), StoreError> {
        let tx = self.conn_mut()?.transaction().map_err(DbError::from)?;
        upsert_session(&tx, session)?;
        write_pointer(&tx, current)?;
        tx.commit().map_err(DbError::from)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        let lock = self.lock.take();
        let result = match self.conn.take() {
            Some(conn) => {
                tracing::debug!(path = ?self.path, "closing session store");
                conn.close()
                    .map_err(|(_, err)| StoreError::from(DbError::from(err)))
            }
            None => Ok(()),
        };
        // Dropping the lock file handle releases the advisory lock.
        drop(lock);
        result
    }
}

fn upsert_session(conn: &Connection, session: &Session) -> Result<(), DbError> {
    conn.execute(
        "
        INSERT INTO sessions
        (id, project, state, start_time, paused_at, accumulated_pause_ms, end_time, duration_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            project = excluded.project,
            state = excluded.state,
            start_time = excluded.start_time,
            paused_at = excluded.paused_at,
            accumulated_pause_ms = excluded.accumulated_pause_ms,
            end_time = excluded.end_time,
            duration_ms = excluded.duration_ms
        ",
        params![
            session.id().as_str(),
            session.project().as_str(),
            session.state().as_str(),
            format_timestamp(session.start_time()),
            session.paused_at().map(format_timestamp),
            session.accumulated_pause().num_milliseconds(),
            session.end_time().map(format_timestamp),
            session.duration().map(|d| d.num_milliseconds()),
        ],
    )?;
    Ok(())
}

fn write_pointer(conn: &Connection, id: Option<&SessionId>) -> Result<(), DbError> {
    match id {
        Some(id) => conn.execute(
            "
            INSERT INTO current_session (slot, session_id) VALUES (0, ?)
            ON CONFLICT(slot) DO UPDATE SET session_id = excluded.session_id
            ",
            [id.as_str()],
        )?,
        None => conn.execute("DELETE FROM current_session", [])?,
    };
    Ok(())
}

/// A raw row from the `sessions` table.
#[derive(Debug)]
struct SessionRow {
    id: String,
    project: String,
    state: String,
    start_time: String,
    paused_at: Option<String>,
    accumulated_pause_ms: i64,
    end_time: Option<String>,
    duration_ms: Option<i64>,
}

impl SessionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project: row.get(1)?,
            state: row.get(2)?,
            start_time: row.get(3)?,
            paused_at: row.get(4)?,
            accumulated_pause_ms: row.get(5)?,
            end_time: row.get(6)?,
            duration_ms: row.get(7)?,
        })
    }

    fn into_session(self) -> Result<Session, DbError> {
        let invalid = |source| DbError::InvalidSession {
            session_id: self.id.clone(),
            source,
        };
        let parse = |timestamp: &str| parse_timestamp(timestamp, &self.id);
        let parse_opt = |timestamp: Option<&str>| timestamp.map(parse).transpose();

        let parts = SessionParts {
            id: SessionId::new(self.id.as_str()).map_err(invalid)?,
            project: ProjectName::new(self.project.as_str()).map_err(invalid)?,
            state: self.state.parse().map_err(invalid)?,
            start_time: parse(&self.start_time)?,
            paused_at: parse_opt(self.paused_at.as_deref())?,
            accumulated_pause: Duration::milliseconds(self.accumulated_pause_ms),
            end_time: parse_opt(self.end_time.as_deref())?,
            duration: self.duration_ms.map(Duration::milliseconds),
        };
        Session::restore(parts).map_err(invalid)
    }
}

fn lock_path(db_path: &Path) -> PathBuf {
    db_path.with_extension("lock")
}

/// Takes the exclusive process lock, polling until `timeout` elapses.
fn acquire_lock(path: &Path, timeout: StdDuration) -> Result<File, StoreError> {
    let lock_err = |source| DbError::Lock {
        path: path.to_path_buf(),
        source,
    };
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(lock_err)?;

    let started = Instant::now();
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(
                    path = %path.display(),
                    waited = ?started.elapsed(),
                    "acquired store lock"
                );
                return Ok(file);
            }
            Err(err) if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                let waited = started.elapsed();
                if waited >= timeout {
                    tracing::warn!(
                        path = %path.display(),
                        ?timeout,
                        "store lock is held by another process"
                    );
                    return Err(StoreError::LockTimeout {
                        path: path.to_path_buf(),
                        timeout,
                    });
                }
                thread::sleep(LOCK_POLL_INTERVAL.min(timeout - waited));
            }
            Err(err) => return Err(lock_err(err).into()),
        }
    }
}

fn parse_timestamp(timestamp: &str, session_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            session_id: session_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
