//! `soul-agent note` — record a note through a running daemon.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::client::DaemonClient;

#[derive(Args)]
pub struct NoteArgs {
    /// Note text; omit to read from stdin.
    pub text: Option<String>,
}

pub async fn run(args: NoteArgs, url: &str) -> Result<()> {
    let text = match args.text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)?;
            buf
        }
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        anyhow::bail!("note text is empty");
    }

    let client = DaemonClient::new(url);
    let body = client.post("/note", json!({ "text": text })).await?;
    if body["accepted"].as_bool().unwrap_or(false) {
        println!("Note queued for classification.");
    } else {
        println!("Note was a duplicate; not queued.");
    }
    Ok(())
}
