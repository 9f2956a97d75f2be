//! `soul-agent start` — boot the daemon, detached by default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use soul_config::paths;

#[derive(Args)]
pub struct StartArgs {
    /// Run in the foreground instead of detaching.
    #[arg(long)]
    pub foreground: bool,
}

pub async fn run(args: StartArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;
    let config = soul_config::load_config(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    if args.foreground {
        return crate::daemon::run(config).await;
    }

    // Detached start: re-exec ourselves in the foreground with output
    // redirected into the state directory, then record the child PID.
    if let Some(pid) = read_live_pid() {
        println!("Daemon already running (PID {pid})");
        return Ok(());
    }

    let state_dir = paths::state_dir();
    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("cannot create state dir {}", state_dir.display()))?;

    let stdout = std::fs::File::create(state_dir.join("daemon.out"))?;
    let stderr = std::fs::File::create(state_dir.join("daemon.err"))?;
    let exe = std::env::current_exe().context("cannot locate own executable")?;

    let child = std::process::Command::new(exe)
        .arg("--config")
        .arg(&config_path)
        .arg("start")
        .arg("--foreground")
        .stdin(std::process::Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .context("failed to spawn daemon process")?;

    std::fs::write(paths::pid_file(), child.id().to_string())?;
    info!(pid = child.id(), "Daemon started");
    println!(
        "Daemon started (PID {}) on port {}",
        child.id(),
        config.server.port
    );
    Ok(())
}

fn resolve_config_path(config_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        return Ok(path);
    }
    let default = paths::state_dir().join("soul.json");
    if default.exists() {
        return Ok(default);
    }
    anyhow::bail!(
        "no config file; pass --config or create {}",
        default.display()
    );
}

/// PID from the pid file, when that process is still alive.
pub fn read_live_pid() -> Option<u32> {
    let raw = std::fs::read_to_string(paths::pid_file()).ok()?;
    let pid: u32 = raw.trim().parse().ok()?;
    let alive = std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if alive {
        Some(pid)
    } else {
        // Stale pid file.
        let _ = std::fs::remove_file(paths::pid_file());
        None
    }
}
