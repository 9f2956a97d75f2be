//! Daemon wiring: builds every component from config, spawns the seven
//! long-running tasks, and drives graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use soul_config::SoulConfig;
use soul_ingest::{IngestQueue, QueueConfig};
use soul_insight::{parse_daily_time, InsightEngine, InsightScheduler};
use soul_llm::{DisabledBackend, OpenAiBackend, OpenAiConfig, SharedBackend};
use soul_pipeline::{Classifier, DailyLog, Pipeline, TodoStore};
use soul_producers::{
    spawn_input_hook, BrowserPoller, ClipboardPoller, FileWatcher, SystemClipboard,
};
use soul_server::{AppState, Server, TerminalSink};
use soul_vault::VaultStore;

/// Budget for each task to exit after cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Run the daemon until a shutdown signal arrives.
pub async fn run(config: SoulConfig) -> Result<()> {
    // Fatal startup failures: unusable vault root or config.
    let vault = VaultStore::open(&config.vault_path)
        .with_context(|| format!("cannot initialize vault at {}", config.vault_path.display()))?;

    let queue = Arc::new(IngestQueue::new(QueueConfig {
        batch_size: config.queue.batch_size,
        flush_interval: Duration::from_secs(config.queue.flush_interval),
        dedup_window: Duration::from_secs(config.queue.dedup_window),
        ..QueueConfig::default()
    }));

    let backend = build_backend(&config);
    let classifier = Arc::new(Classifier::new(backend.clone()));
    let daily_log = Arc::new(DailyLog::new(vault.clone()));
    let todos = Arc::new(TodoStore::new(vault.clone()));
    let insight = Arc::new(InsightEngine::new(
        vault.clone(),
        daily_log.clone(),
        todos.clone(),
        backend,
    ));
    let pipeline = Pipeline::new(
        queue.clone(),
        classifier,
        vault.clone(),
        daily_log.clone(),
        todos.clone(),
    );
    let terminal = TerminalSink::new(queue.clone());

    let token = CancellationToken::new();
    let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

    // 1. Pipeline consumer.
    tasks.push(("pipeline", tokio::spawn(pipeline.clone().run(token.clone()))));

    // 2. Clipboard poller.
    let clipboard = ClipboardPoller::new(queue.clone(), Arc::new(SystemClipboard));
    tasks.push(("clipboard", tokio::spawn(clipboard.run(token.clone()))));

    // 3. Browser history poller.
    let browser = BrowserPoller::new(queue.clone());
    tasks.push(("browser", tokio::spawn(browser.run(token.clone()))));

    // 4. Filesystem watcher (its own OS thread).
    let watcher = FileWatcher::new(queue.clone(), config.effective_watch_dirs());
    let watcher_handle = match watcher.start(token.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "File watcher disabled");
            None
        }
    };

    // 5. Keystroke tap, when enabled and a platform source exists.
    if config.input_hook.enabled {
        if let Some(handle) = spawn_input_hook(
            queue.clone(),
            config.input_hook.dedicated_apps.clone(),
            token.clone(),
        ) {
            tasks.push(("input-hook", handle));
        }
    }

    // 6. Insight scheduler.
    let daily_time = parse_daily_time(&config.insight.daily_time)
        .with_context(|| format!("invalid insight.daily_time {:?}", config.insight.daily_time))?;
    let scheduler = InsightScheduler::new(insight.clone(), daily_time);
    tasks.push(("insight", tokio::spawn(scheduler.run(token.clone()))));

    // Terminal sink sweeper.
    tasks.push((
        "terminal-sweeper",
        tokio::spawn(terminal.clone().run_sweeper(token.clone())),
    ));

    // 7. HTTP surface.
    let state = AppState::new(queue, vault, daily_log, todos, insight, pipeline, terminal);
    let server = Server::new(state, config.server.port);
    let server_token = token.clone();
    tasks.push((
        "http",
        tokio::spawn(async move {
            if let Err(e) = server.run(server_token).await {
                error!(error = %e, "HTTP surface failed");
            }
        }),
    ));

    wait_for_shutdown().await;
    info!("Shutdown signal received");
    token.cancel();

    for (name, handle) in tasks {
        match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(task = name, error = %e, "Task panicked"),
            Err(_) => warn!(task = name, "Task did not stop within grace period"),
        }
    }
    if let Some(handle) = watcher_handle {
        // The watcher thread polls its channel twice a second; give it one
        // cycle to notice the cancellation.
        tokio::task::spawn_blocking(move || handle.join())
            .await
            .ok();
    }

    info!("Daemon stopped");
    Ok(())
}

fn build_backend(config: &SoulConfig) -> SharedBackend {
    if config.llm.api_key.is_empty() || config.llm.api_key.starts_with("${") {
        warn!("No LLM API key configured; classification will use rule-based fallback");
        return Arc::new(DisabledBackend);
    }
    let llm_config = OpenAiConfig::deepseek(config.llm.api_key.clone())
        .with_base_url(config.llm.api_base.clone())
        .with_model(config.llm.model.clone())
        .with_name(config.llm.provider.clone())
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));
    match OpenAiBackend::new(llm_config) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            warn!(error = %e, "LLM backend unavailable; using rule-based fallback");
            Arc::new(DisabledBackend)
        }
    }
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "Cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
