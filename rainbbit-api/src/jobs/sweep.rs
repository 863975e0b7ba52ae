//! Cache and Client Registry Sweep
//!
//! Expired cache entries are otherwise only dropped when touched, and idle
//! client buckets only when their client comes back. This task reclaims
//! both on a fixed period.

use crate::state::AppState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Default)]
pub struct SweepMetrics {
    pub cycles: AtomicU64,
    pub entries_purged: AtomicU64,
    pub clients_swept: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSnapshot {
    pub cycles: u64,
    pub entries_purged: u64,
    pub clients_swept: u64,
}

impl SweepMetrics {
    pub fn snapshot(&self) -> SweepSnapshot {
        SweepSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            entries_purged: self.entries_purged.load(Ordering::Relaxed),
            clients_swept: self.clients_swept.load(Ordering::Relaxed),
        }
    }
}

/// One sweep over the caches and the client registry.
pub fn sweep_once(state: &AppState, metrics: &SweepMetrics) {
    metrics.cycles.fetch_add(1, Ordering::Relaxed);
    let purged = state.caches.purge_expired();
    let swept = state.admission.sweep_idle();
    metrics
        .entries_purged
        .fetch_add(purged as u64, Ordering::Relaxed);
    metrics
        .clients_swept
        .fetch_add(swept as u64, Ordering::Relaxed);

    if purged > 0 || swept > 0 {
        tracing::debug!(entries = purged, clients = swept, "Sweep cycle completed");
    } else {
        tracing::trace!("Sweep cycle completed with nothing to reclaim");
    }
}

/// Sweep every `period` until the shutdown signal is received.
pub async fn sweep_task(
    state: AppState,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<SweepMetrics> {
    let metrics = Arc::new(SweepMetrics::default());

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(period_secs = period.as_secs(), "Sweep task started");

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Sweep task shutting down");
                    break;
                }
            }
            _ = ticker.tick() => {
                sweep_once(&state, &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        cycles = snapshot.cycles,
        entries_purged = snapshot.entries_purged,
        clients_swept = snapshot.clients_swept,
        "Sweep task completed"
    );

    metrics
}
