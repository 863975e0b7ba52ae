//! Background Jobs for RAINBBIT API
//!
//! - `ingestion`: pulls a new observation every ingestion interval
//! - `sweep`: purges expired cache entries and idle client buckets
//!
//! # Usage
//!
//! ```ignore
//! use rainbbit_api::jobs::{ingestion_task, sweep_task, IngestionConfig};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! tokio::spawn(sweep_task(state.clone(), Duration::from_secs(60), shutdown_rx.clone()));
//! tokio::spawn(ingestion_task(state, source, IngestionConfig::new(interval), shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod ingestion;
pub mod sweep;

pub use ingestion::{
    delay_until_next_boundary, ingestion_task, IngestionConfig, IngestionMetrics,
    IngestionSnapshot,
};
pub use sweep::{sweep_once, sweep_task, SweepMetrics, SweepSnapshot};
