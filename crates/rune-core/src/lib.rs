//! Core domain logic for rune's work-session timer.
//!
//! This crate contains:
//! - Session: the record type and its pause-aware state transitions
//! - Store: the persistence contract, with an in-memory implementation
//! - Tracker: the single-active-session state machine over a store
//! - Aggregation: daily/weekly totals, history and per-project stats
//! - Project detection: naming a session from the working directory

pub mod aggregate;
mod clock;
mod idle;
pub mod project;
mod session;
mod store;
mod tracker;
mod types;

pub use aggregate::{Period, Window};
pub use clock::{Clock, ManualClock, SystemClock};
pub use idle::{FixedIdle, IdleDetector, IdleError, NoIdleDetection};
pub use project::{ManifestDetector, ProjectDetector};
pub use session::{Session, SessionParts, TransitionError};
pub use store::{MemoryStore, SessionFilter, Store, StoreError};
pub use tracker::{Action, DEFAULT_IDLE_THRESHOLD, Tracker, TrackerError};
pub use types::{ProjectName, SessionId, SessionState, ValidationError};
