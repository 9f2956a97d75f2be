//! `soul-agent stop` — terminate a running daemon via its PID file.

use anyhow::{Context, Result};

use soul_config::paths;

use super::start::read_live_pid;

pub fn run() -> Result<()> {
    let Some(pid) = read_live_pid() else {
        println!("Daemon is not running.");
        return Ok(());
    };

    let status = std::process::Command::new("kill")
        .arg(pid.to_string())
        .status()
        .context("failed to signal daemon")?;
    if !status.success() {
        anyhow::bail!("could not stop daemon (PID {pid})");
    }

    let _ = std::fs::remove_file(paths::pid_file());
    println!("Daemon stopped (PID {pid})");
    Ok(())
}
