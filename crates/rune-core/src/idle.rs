//! Idle-time detection seam.
//!
//! Platform probing lives outside the core; the tracker only sees an
//! [`IdleDetector`] chosen at startup.

use chrono::Duration;
use thiserror::Error;

/// Errors from an idle detector. None of them are fatal to the tracker.
#[derive(Debug, Error)]
pub enum IdleError {
    /// No detection strategy exists for this platform.
    #[error("idle detection not supported on {platform}")]
    Unsupported { platform: String },

    /// The idle command could not be run.
    #[error("failed to run {command}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The idle command ran but its output was not understood.
    #[error("could not parse idle time from {command}: {output:?}")]
    Parse { command: String, output: String },
}

/// Reports how long the user has been idle.
pub trait IdleDetector {
    /// Time since the last user input.
    fn idle_time(&self) -> Result<Duration, IdleError>;
}

/// A detector for platforms without idle support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdleDetection;

impl IdleDetector for NoIdleDetection {
    fn idle_time(&self) -> Result<Duration, IdleError> {
        Err(IdleError::Unsupported {
            platform: std::env::consts::OS.to_string(),
        })
    }
}

/// A detector that always reports the same idle time.
#[derive(Debug, Clone, Copy)]
pub struct FixedIdle(pub Duration);

impl IdleDetector for FixedIdle {
    fn idle_time(&self) -> Result<Duration, IdleError> {
        Ok(self.0)
    }
}
