//! Configuration loading for the soul-agent daemon.
//!
//! Loads a JSON config file, overlays `.env` values into the process
//! environment, and expands `${VAR}` references in string values before
//! deserialization. A config load failure at startup is fatal by design.

pub mod error;
pub mod paths;
pub mod types;

pub use error::{ConfigError, Result};
pub use types::{
    InputHookSection, InsightSection, LlmSection, QueueSection, ServerSection, SoulConfig,
};

use std::path::Path;

use serde_json::Value;

/// Load the configuration from `path`.
///
/// A `.env` file sitting next to the config file is read first; values it
/// defines are exported into the process environment without overwriting
/// existing variables. `${VAR}` references anywhere in the config's string
/// values are then expanded from the environment.
pub fn load_config(path: &Path) -> Result<SoulConfig> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    if let Some(dir) = path.parent() {
        load_dotenv(&dir.join(".env"));
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut value: Value = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    expand_env_vars(&mut value);

    let config: SoulConfig =
        serde_json::from_value(value).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if !config.vault_path.is_absolute() {
        return Err(ConfigError::Invalid(format!(
            "vault_path must be absolute, got {}",
            config.vault_path.display()
        )));
    }

    Ok(config)
}

/// Read `KEY=value` lines from a `.env` file into the environment.
///
/// Existing environment variables win; blank lines and `#` comments are
/// skipped. Missing file is not an error.
fn load_dotenv(path: &Path) {
    let Ok(text) = std::fs::read_to_string(path) else {
        return;
    };
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if !key.is_empty() && !value.is_empty() && std::env::var_os(key).is_none() {
            // Safety note: the daemon is single-threaded at config-load time.
            std::env::set_var(key, value);
        }
    }
    tracing::debug!(path = %path.display(), "Loaded .env file");
}

/// Recursively expand `${VAR}` references in every string value.
///
/// Unknown variables are left as-is so that a missing `DEEPSEEK_API_KEY`
/// surfaces as an unusable key rather than an empty one.
fn expand_env_vars(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains("${") {
                *s = expand_str(s);
            }
        }
        Value::Array(items) => {
            for item in items {
                expand_env_vars(item);
            }
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                expand_env_vars(v);
            }
        }
        _ => {}
    }
}

fn expand_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}
