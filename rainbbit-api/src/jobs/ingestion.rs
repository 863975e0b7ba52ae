//! Periodic Ingestion Task
//!
//! Pulls the current observation from an [`ObservationSource`] once per
//! ingestion interval. Ticks land on interval boundaries (`:00` and `:30`
//! with the default half hour) so stored timestamps line up with the
//! windows the aligner produces.

use crate::ingest::{ingest_once, ObservationSource};
use crate::state::AppState;
use crate::telemetry::record_ingestion;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Time between runs.
    pub interval: Duration,
    /// Delay the first run to the next multiple of `interval` since the epoch.
    pub align_to_boundary: bool,
}

impl IngestionConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            align_to_boundary: true,
        }
    }
}

/// Time from `now_secs` to the next multiple of `interval_secs`.
pub fn delay_until_next_boundary(now_secs: i64, interval_secs: i64) -> Duration {
    if interval_secs <= 0 {
        return Duration::ZERO;
    }
    match now_secs.rem_euclid(interval_secs) {
        0 => Duration::ZERO,
        rem => Duration::from_secs((interval_secs - rem).unsigned_abs()),
    }
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Default)]
pub struct IngestionMetrics {
    pub runs: AtomicU64,
    pub successes: AtomicU64,
    pub failures: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionSnapshot {
    pub runs: u64,
    pub successes: u64,
    pub failures: u64,
}

impl IngestionMetrics {
    pub fn snapshot(&self) -> IngestionSnapshot {
        IngestionSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Run ingestion until the shutdown signal is received.
///
/// A failed run is logged and counted; the next tick tries again.
pub async fn ingestion_task(
    state: AppState,
    source: Arc<dyn ObservationSource>,
    config: IngestionConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<IngestionMetrics> {
    let metrics = Arc::new(IngestionMetrics::default());

    let first_delay = if config.align_to_boundary {
        delay_until_next_boundary(
            chrono::Utc::now().timestamp(),
            i64::try_from(config.interval.as_secs()).unwrap_or(i64::MAX),
        )
    } else {
        Duration::ZERO
    };
    let mut ticker = interval_at(Instant::now() + first_delay, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        source = source.name(),
        interval_secs = config.interval.as_secs(),
        first_run_in_secs = first_delay.as_secs(),
        "Ingestion task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Ingestion task shutting down");
                    break;
                }
            }
            _ = ticker.tick() => {
                metrics.runs.fetch_add(1, Ordering::Relaxed);
                match ingest_once(&state, source.as_ref()).await {
                    Ok(_) => {
                        metrics.successes.fetch_add(1, Ordering::Relaxed);
                        record_ingestion(true);
                    }
                    Err(e) => {
                        metrics.failures.fetch_add(1, Ordering::Relaxed);
                        record_ingestion(false);
                        tracing::error!(source = source.name(), error = %e, "Ingestion failed");
                    }
                }
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        runs = snapshot.runs,
        successes = snapshot.successes,
        failures = snapshot.failures,
        "Ingestion task completed"
    );

    metrics
}
