//! Time-window alignment to the ingestion cycle.
//!
//! Requested ranges are widened outward to multiples of the ingestion
//! interval so that nearby requests collapse onto the same cache key while
//! the aligned window still contains everything the caller asked for.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// A window with optional bounds, in epoch seconds. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlignedWindow {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl AlignedWindow {
    /// The whole-history window: both bounds open.
    pub const WHOLE_HISTORY: AlignedWindow = AlignedWindow {
        from: None,
        to: None,
    };

    pub fn is_whole_history(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether `dt` falls inside the window (bounds inclusive).
    pub fn contains(&self, dt: i64) -> bool {
        self.from.map_or(true, |from| dt >= from) && self.to.map_or(true, |to| dt <= to)
    }
}

/// Quantizes requested windows to a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAligner {
    interval_secs: i64,
}

impl WindowAligner {
    /// Create an aligner for the given ingestion interval.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if the interval is not positive.
    pub fn new(interval_secs: i64) -> Result<Self, ConfigError> {
        if interval_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "ingest_interval_secs".to_string(),
                value: interval_secs.to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        Ok(Self { interval_secs })
    }

    pub fn interval_secs(&self) -> i64 {
        self.interval_secs
    }

    /// Align `[from, to]` outward to the interval.
    ///
    /// Both bounds absent, or both zero, selects the whole history.
    pub fn align(&self, from: Option<i64>, to: Option<i64>) -> AlignedWindow {
        if matches!((from, to), (None, None) | (Some(0), Some(0))) {
            return AlignedWindow::WHOLE_HISTORY;
        }
        AlignedWindow {
            from: from.and_then(|f| self.floor(f)),
            to: to.and_then(|t| self.ceil(t)),
        }
    }

    /// Re-align an already aligned window. Aligned bounds are fixed points.
    pub fn realign(&self, window: AlignedWindow) -> AlignedWindow {
        self.align(window.from, window.to)
    }

    /// Rounding that leaves the `i64` range yields `None`; the open bound still contains `ts`.
    fn floor(&self, ts: i64) -> Option<i64> {
        ts.checked_sub(ts.rem_euclid(self.interval_secs))
    }

    fn ceil(&self, ts: i64) -> Option<i64> {
        match ts.rem_euclid(self.interval_secs) {
            0 => Some(ts),
            rem => ts.checked_add(self.interval_secs - rem),
        }
    }
}
