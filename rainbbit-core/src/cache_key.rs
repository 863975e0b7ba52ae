//! Deterministic cache keys for windowed queries.
//!
//! Layout: `v1|<scope>|<measures>|<from>|<to>`. Every free-form component is
//! length-prefixed (`4:temp`) so no measure name or scope can forge a
//! separator. `*` stands for "all columns" and `_` for an open bound; neither
//! can be produced by an integer, so an unbounded window never collides with
//! timestamp zero or any aligned value.

use crate::window::AlignedWindow;
use serde::Serialize;
use std::fmt::{self, Write};

const VERSION: &str = "v1";
const LATEST: &str = "latest";
const WILDCARD: &str = "*";
const UNBOUNDED: &str = "_";

/// The set of columns a cached query selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MeasureSet {
    /// Every column of the record.
    All,
    /// An explicit list, in caller order.
    Listed(Vec<String>),
}

impl MeasureSet {
    pub fn listed<I, S>(measures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MeasureSet::Listed(measures.into_iter().map(Into::into).collect())
    }
}

/// Opaque cache key. Equal inputs produce equal keys across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a query over `measures` within `window`.
    pub fn new(measures: &MeasureSet, window: AlignedWindow) -> Self {
        Self::build(None, measures, window)
    }

    /// Same as [`CacheKey::new`] with an extra discriminator, such as a chart theme.
    pub fn scoped(scope: &str, measures: &MeasureSet, window: AlignedWindow) -> Self {
        Self::build(Some(scope), measures, window)
    }

    /// Reserved slot for the most recent record. Never equal to a built key.
    pub fn latest() -> Self {
        CacheKey(LATEST.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn build(scope: Option<&str>, measures: &MeasureSet, window: AlignedWindow) -> Self {
        let mut key = String::with_capacity(64);
        key.push_str(VERSION);
        key.push('|');
        match scope {
            Some(scope) => push_prefixed(&mut key, scope),
            None => key.push_str(UNBOUNDED),
        }
        key.push('|');
        match measures {
            MeasureSet::All => key.push_str(WILDCARD),
            MeasureSet::Listed(names) => {
                let _ = write!(key, "{}", names.len());
                for name in names {
                    key.push(',');
                    push_prefixed(&mut key, name);
                }
            }
        }
        key.push('|');
        push_bound(&mut key, window.from);
        key.push('|');
        push_bound(&mut key, window.to);
        CacheKey(key)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn push_prefixed(key: &mut String, part: &str) {
    let _ = write!(key, "{}:{}", part.len(), part);
}

fn push_bound(key: &mut String, bound: Option<i64>) {
    match bound {
        Some(ts) => {
            let _ = write!(key, "{ts}");
        }
        None => key.push_str(UNBOUNDED),
    }
}
