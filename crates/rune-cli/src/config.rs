//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rune_core::DEFAULT_IDLE_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// How long to wait for another rune process to release the store.
    pub lock_timeout_ms: u64,

    /// Seconds without input before the user counts as idle.
    pub idle_threshold_secs: u64,

    /// Whether to ask the platform for idle time at all.
    pub idle_detection: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("rune.db"),
            lock_timeout_ms: 5_000,
            idle_threshold_secs: 300,
            idle_detection: true,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (RUNE_*)
        figment = figment.merge(Env::prefixed("RUNE_"));

        figment.extract()
    }

    pub const fn lock_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.lock_timeout_ms)
    }

    /// The idle threshold, falling back to the default when out of range.
    pub fn idle_threshold(&self) -> Duration {
        i64::try_from(self.idle_threshold_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(DEFAULT_IDLE_THRESHOLD)
    }
}

/// Returns the platform-specific config directory for rune.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rune"))
}

/// Returns the platform-specific data directory for rune.
///
/// On Linux: `~/.local/share/rune`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("rune"))
}
