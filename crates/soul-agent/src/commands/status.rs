//! `soul-agent status` — query the daemon's status endpoint.

use anyhow::Result;

use crate::client::DaemonClient;

use super::start::read_live_pid;

pub async fn run(url: &str) -> Result<()> {
    match read_live_pid() {
        Some(pid) => println!("Process: running (PID {pid})"),
        None => println!("Process: no PID file"),
    }

    let client = DaemonClient::new(url);
    match client.get("/service/status").await {
        Ok(body) => {
            println!("Daemon:  reachable at {url}");
            println!(
                "Queue:   {} pending",
                body["queue_pending"].as_u64().unwrap_or(0)
            );
            if let Some(pipeline) = body.get("pipeline") {
                println!(
                    "Pipeline: {} batches, {} items, {} fallbacks",
                    pipeline["batches"].as_u64().unwrap_or(0),
                    pipeline["items"].as_u64().unwrap_or(0),
                    pipeline["fallback_classifications"].as_u64().unwrap_or(0),
                );
            }
        }
        Err(_) => println!("Daemon:  not reachable at {url}"),
    }
    Ok(())
}
