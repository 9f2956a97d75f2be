//! Per-user state directory paths.
//!
//! The daemon keeps its PID file and log output under `~/.soul-agent`,
//! separate from the vault (which holds user-visible Markdown only).

use std::path::PathBuf;

/// Root of the per-user state directory.
pub fn state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".soul-agent")
}

/// Path of the daemon PID file.
pub fn pid_file() -> PathBuf {
    state_dir().join("daemon.pid")
}

/// Directory for daemon log files.
pub fn log_dir() -> PathBuf {
    state_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_file_under_state_dir() {
        assert!(pid_file().starts_with(state_dir()));
        assert!(pid_file().ends_with("daemon.pid"));
    }

    #[test]
    fn test_log_dir_under_state_dir() {
        assert!(log_dir().starts_with(state_dir()));
    }
}
