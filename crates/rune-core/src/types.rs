//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types and restored records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A stored state string did not name a known state.
    #[error("invalid session state: {value}")]
    InvalidState { value: String },

    /// A session record violates one of the session invariants.
    #[error("inconsistent session {id}: {reason}")]
    Inconsistent { id: String, reason: &'static str },
}

/// Lifecycle state of a work session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Finished; the record is terminal.
    Stopped,
    /// Time is accruing.
    Running,
    /// Time is frozen until resumed.
    Paused,
}

impl SessionState {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }

    /// Capitalized name for display to users.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Running => "Running",
            Self::Paused => "Paused",
        }
    }

    /// Whether a session in this state is the current session.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(Self::Stopped),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            _ => Err(ValidationError::InvalidState {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after validation.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(value))
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated session identifier.
    ///
    /// Session IDs are opaque, assigned once at creation and never reused.
    SessionId, "session ID"
);

define_string_id!(
    /// A validated project name.
    ///
    /// Project names must be non-blank. They are recorded when a session
    /// starts and never change afterwards.
    ProjectName, "project name"
);

impl SessionId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_rejects_empty() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("valid-session").is_ok());
    }

    #[test]
    fn project_name_rejects_blank() {
        assert_eq!(
            ProjectName::new("   "),
            Err(ValidationError::Empty {
                field: "project name"
            })
        );
        assert!(ProjectName::new("rune").is_ok());
    }

    #[test]
    fn generated_ids_are_unique_uuids() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        Uuid::parse_str(a.as_str()).unwrap();
    }

    #[test]
    fn session_id_serde_rejects_empty() {
        let result: Result<SessionId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn project_name_serializes_as_plain_string() {
        let name = ProjectName::new("my-project").unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"my-project\"");
    }

    // ========== SessionState Tests ==========

    #[test]
    fn session_state_from_str() {
        assert_eq!(
            "running".parse::<SessionState>().unwrap(),
            SessionState::Running
        );
        assert_eq!(
            "paused".parse::<SessionState>().unwrap(),
            SessionState::Paused
        );
        assert_eq!(
            "stopped".parse::<SessionState>().unwrap(),
            SessionState::Stopped
        );
        assert_eq!(
            "Running".parse::<SessionState>(),
            Err(ValidationError::InvalidState {
                value: "Running".to_string()
            })
        );
    }

    #[test]
    fn session_state_labels() {
        assert_eq!(SessionState::Stopped.label(), "Stopped");
        assert_eq!(SessionState::Running.label(), "Running");
        assert_eq!(SessionState::Paused.label(), "Paused");
        assert_eq!(SessionState::Paused.to_string(), "paused");
    }

    #[test]
    fn only_running_and_paused_are_active() {
        assert!(SessionState::Running.is_active());
        assert!(SessionState::Paused.is_active());
        assert!(!SessionState::Stopped.is_active());
    }
}
