//! Platform idle-time queries.
//!
//! Linux asks `xprintidle` (milliseconds) and falls back to `xssstate -i`.
//! macOS reads `HIDIdleTime` (nanoseconds) from `ioreg -c IOHIDSystem`.

use std::process::Command;

use chrono::Duration;
use rune_core::{IdleDetector, IdleError};

/// Idle detector backed by the platform's input-idle tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdle;

impl IdleDetector for SystemIdle {
    #[cfg(target_os = "linux")]
    fn idle_time(&self) -> Result<Duration, IdleError> {
        query_idle_command("xprintidle", &[], parse_millis).or_else(|err| {
            tracing::debug!(error = %err, "xprintidle failed, trying xssstate");
            query_idle_command("xssstate", &["-i"], parse_millis)
        })
    }

    #[cfg(target_os = "macos")]
    fn idle_time(&self) -> Result<Duration, IdleError> {
        query_idle_command("ioreg", &["-c", "IOHIDSystem"], parse_hid_idle_time)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    fn idle_time(&self) -> Result<Duration, IdleError> {
        Err(IdleError::Unsupported {
            platform: std::env::consts::OS.to_string(),
        })
    }
}

#[cfg_attr(
    not(any(target_os = "linux", target_os = "macos")),
    expect(dead_code, reason = "no idle command on this platform")
)]
fn query_idle_command(
    command: &str,
    args: &[&str],
    parse: fn(&str) -> Option<Duration>,
) -> Result<Duration, IdleError> {
    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|source| IdleError::Command {
            command: command.to_string(),
            source,
        })?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        return Err(IdleError::Parse {
            command: command.to_string(),
            output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    parse(&stdout).ok_or_else(|| IdleError::Parse {
        command: command.to_string(),
        output: stdout.trim().to_string(),
    })
}

/// Parses a bare millisecond count, as printed by `xprintidle`.
pub fn parse_millis(output: &str) -> Option<Duration> {
    let ms: i64 = output.trim().parse().ok()?;
    (ms >= 0).then(|| Duration::milliseconds(ms))
}

/// Extracts `HIDIdleTime` (nanoseconds) from `ioreg` output.
pub fn parse_hid_idle_time(output: &str) -> Option<Duration> {
    output
        .lines()
        .filter(|line| line.contains("\"HIDIdleTime\""))
        .find_map(|line| {
            let (_, value) = line.split_once('=')?;
            let nanos: i64 = value.trim().parse().ok()?;
            (nanos >= 0).then(|| Duration::nanoseconds(nanos))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_xprintidle_output() {
        assert_eq!(parse_millis("1234\n"), Some(Duration::milliseconds(1234)));
        assert_eq!(parse_millis("0"), Some(Duration::zero()));
        assert_eq!(parse_millis("-5"), None);
        assert_eq!(parse_millis("couldn't open display"), None);
        assert_eq!(parse_millis(""), None);
    }

    #[test]
    fn parses_ioreg_output() {
        let output = r#"
    | |   "HIDParameters" = {"HIDScrollAcceleration"=20480}
    | |   "HIDIdleTime" = 2500000000
    | |   "HIDKeyboardModifierMappingPairs" = ()
"#;
        assert_eq!(
            parse_hid_idle_time(output),
            Some(Duration::milliseconds(2_500))
        );
        assert_eq!(parse_hid_idle_time("no idle key here"), None);
    }
}
