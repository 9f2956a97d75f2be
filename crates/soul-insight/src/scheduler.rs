//! Daily insight scheduler.
//!
//! Checks once a minute whether the configured generation time has passed
//! and produces at most one report per day. The generated flag resets just
//! after midnight.

use std::sync::Arc;

use chrono::{Local, NaiveTime};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{InsightError, Result};
use crate::report::InsightEngine;

/// Interval between schedule checks.
const TICK: std::time::Duration = std::time::Duration::from_secs(60);

/// Parse a `HH:MM` schedule time.
pub fn parse_daily_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| InsightError::InvalidDailyTime(raw.to_string()))
}

/// The insight scheduler task.
pub struct InsightScheduler {
    engine: Arc<InsightEngine>,
    daily_time: NaiveTime,
}

impl InsightScheduler {
    pub fn new(engine: Arc<InsightEngine>, daily_time: NaiveTime) -> Self {
        Self { engine, daily_time }
    }

    /// Run until cancelled.
    pub async fn run(self, token: CancellationToken) {
        info!(time = %self.daily_time, "Insight scheduler started");
        let mut generated_today = false;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(TICK) => {}
            }

            let now = Local::now();
            let time = now.time();

            if time >= self.daily_time && !generated_today {
                match self.engine.generate_and_save(now.date_naive()).await {
                    Ok(_) => generated_today = true,
                    Err(e) => warn!(error = %e, "Scheduled insight generation failed"),
                }
            }

            // Reset the per-day flag in the first minute after midnight.
            if time < NaiveTime::from_hms_opt(0, 1, 0).unwrap_or_default() {
                generated_today = false;
            }
        }
        info!("Insight scheduler stopped");
    }
}
