//! Cache-first projection of measures into data-point series.

use crate::caches::{CacheSet, PointSeries};
use crate::store::SharedStore;
use rainbbit_core::{
    AlignedWindow, CacheKey, MeasureSet, RainbbitResult, ValidationError,
    MAX_PROJECTED_MEASURES,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Validates measure lists and serves projections through the points cache.
pub struct DataPointProjector {
    store: SharedStore,
    caches: Arc<CacheSet>,
    known: Vec<String>,
    known_set: HashSet<String>,
}

impl DataPointProjector {
    /// Read the known measure names once and build the projector.
    pub async fn load(store: SharedStore, caches: Arc<CacheSet>) -> RainbbitResult<Self> {
        let known = store.known_measure_names().await?;
        tracing::debug!(measures = known.len(), "Loaded known measure names");
        Ok(Self::with_known(store, caches, known))
    }

    /// Build a projector with an explicit measure set.
    pub fn with_known(store: SharedStore, caches: Arc<CacheSet>, known: Vec<String>) -> Self {
        let known_set = known.iter().cloned().collect();
        Self {
            store,
            caches,
            known,
            known_set,
        }
    }

    /// Known measure names in storage order.
    pub fn known_measures(&self) -> &[String] {
        &self.known
    }

    pub fn is_known(&self, measure: &str) -> bool {
        self.known_set.contains(measure)
    }

    /// Check that `measures` is non-empty, short enough and entirely known.
    pub fn validate(&self, measures: &[String]) -> Result<(), ValidationError> {
        if measures.is_empty() {
            return Err(ValidationError::NoMeasures);
        }
        if measures.len() > MAX_PROJECTED_MEASURES {
            return Err(ValidationError::TooManyMeasures {
                requested: measures.len(),
                max: MAX_PROJECTED_MEASURES,
            });
        }
        match measures.iter().find(|m| !self.is_known(m)) {
            Some(unknown) => Err(ValidationError::UnknownMeasure {
                measure: unknown.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Data points for `measures` (in order) within an aligned window.
    ///
    /// On a cache miss exactly one projection query is issued; a failed query
    /// leaves the cache untouched.
    pub async fn project(
        &self,
        measures: &[String],
        window: AlignedWindow,
    ) -> RainbbitResult<PointSeries> {
        self.validate(measures)?;
        let key = CacheKey::new(&MeasureSet::Listed(measures.to_vec()), window);
        self.caches
            .points
            .get_or_try_insert_with(key, || async {
                let points = self.store.query_projection(measures, window).await?;
                tracing::debug!(
                    measures = ?measures,
                    from = ?window.from,
                    to = ?window.to,
                    points = points.len(),
                    "Projected data points"
                );
                Ok(Arc::new(points))
            })
            .await
    }
}

impl std::fmt::Debug for DataPointProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPointProjector")
            .field("known", &self.known)
            .finish_non_exhaustive()
    }
}
