//! Configuration types mapping to the JSON schema.
//!
//! Top-level config:
//! ```json
//! {
//!   "vault_path": "/Users/me/vault",
//!   "llm": { "provider": "deepseek", "model": "deepseek-chat",
//!            "api_key": "${DEEPSEEK_API_KEY}" },
//!   "queue": { "batch_size": 10, "flush_interval": 60, "dedup_window": 60 },
//!   "watch_dirs": ["~/Desktop"],
//!   "input_hook": { "enabled": false, "dedicated_apps": [] },
//!   "insight": { "daily_time": "20:00" },
//!   "server": { "port": 8330 }
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// All sections except `vault_path` are optional so that minimal configs
/// load and fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoulConfig {
    /// Absolute path of the vault directory.
    pub vault_path: PathBuf,

    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmSection,

    /// Ingest queue tuning.
    #[serde(default)]
    pub queue: QueueSection,

    /// Directories watched by the filesystem producer.
    #[serde(default)]
    pub watch_dirs: Vec<PathBuf>,

    /// Keystroke tap configuration.
    #[serde(default)]
    pub input_hook: InputHookSection,

    /// Insight scheduling.
    #[serde(default)]
    pub insight: InsightSection,

    /// HTTP surface configuration.
    #[serde(default)]
    pub server: ServerSection,
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// Provider name, informational.
    pub provider: String,
    /// Model identifier sent in the completion request.
    pub model: String,
    /// API key; usually `${DEEPSEEK_API_KEY}` expanded at load time.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible endpoint.
    pub api_base: String,
    /// Hard timeout for a single completion call, in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            api_key: String::new(),
            api_base: "https://api.deepseek.com".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Ingest queue tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    /// Item count that triggers an immediate batch release.
    pub batch_size: usize,
    /// Seconds to wait before flushing a partial batch.
    pub flush_interval: u64,
    /// Seconds during which identical text hashes are dropped.
    pub dedup_window: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            batch_size: 10,
            flush_interval: 60,
            dedup_window: 60,
        }
    }
}

/// Keystroke tap settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputHookSection {
    /// Whether the tap is started at boot.
    pub enabled: bool,
    /// Bundle identifiers whose foreground focus suppresses capture.
    pub dedicated_apps: Vec<String>,
}

impl Default for InputHookSection {
    fn default() -> Self {
        Self {
            enabled: false,
            dedicated_apps: vec![
                "com.apple.Terminal".to_string(),
                "com.googlecode.iterm2".to_string(),
                "io.alacritty".to_string(),
                "net.kovidgoyal.kitty".to_string(),
                "dev.warp.Warp-Stable".to_string(),
                "com.microsoft.VSCode".to_string(),
            ],
        }
    }
}

/// Insight scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightSection {
    /// Local time of day (`HH:MM`) at which the daily report is generated.
    pub daily_time: String,
}

impl Default for InsightSection {
    fn default() -> Self {
        Self {
            daily_time: "20:00".to_string(),
        }
    }
}

/// HTTP surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Loopback port the daemon listens on.
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { port: 8330 }
    }
}

impl SoulConfig {
    /// Directories the filesystem watcher monitors, falling back to the
    /// standard user folders when none are configured.
    pub fn effective_watch_dirs(&self) -> Vec<PathBuf> {
        if !self.watch_dirs.is_empty() {
            return self.watch_dirs.clone();
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        vec![
            home.join("Desktop"),
            home.join("Documents"),
            home.join("Downloads"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config: SoulConfig =
            serde_json::from_str(r#"{"vault_path": "/tmp/vault"}"#).unwrap();

        assert_eq!(config.vault_path, PathBuf::from("/tmp/vault"));
        assert_eq!(config.queue.batch_size, 10);
        assert_eq!(config.queue.flush_interval, 60);
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.server.port, 8330);
        assert_eq!(config.insight.daily_time, "20:00");
        assert!(!config.input_hook.enabled);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config: SoulConfig = serde_json::from_str(
            r#"{
                "vault_path": "/tmp/vault",
                "queue": {"batch_size": 3},
                "server": {"port": 9000},
                "insight": {"daily_time": "21:30"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.queue.batch_size, 3);
        // Unspecified fields within a section keep their defaults.
        assert_eq!(config.queue.dedup_window, 60);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.insight.daily_time, "21:30");
    }

    #[test]
    fn test_effective_watch_dirs_explicit() {
        let config: SoulConfig = serde_json::from_str(
            r#"{"vault_path": "/tmp/vault", "watch_dirs": ["/tmp/a", "/tmp/b"]}"#,
        )
        .unwrap();

        let dirs = config.effective_watch_dirs();
        assert_eq!(dirs, vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")]);
    }

    #[test]
    fn test_effective_watch_dirs_default() {
        let config: SoulConfig =
            serde_json::from_str(r#"{"vault_path": "/tmp/vault"}"#).unwrap();

        let dirs = config.effective_watch_dirs();
        assert_eq!(dirs.len(), 3);
        assert!(dirs[0].ends_with("Desktop"));
    }
}
