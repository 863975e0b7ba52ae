//! Shared application state.

use crate::chart::{ChartRenderer, SvgChartRenderer};
use crate::config::ApiConfig;
use crate::middleware::AdmissionController;
use rainbbit_core::{ConditionCatalog, RainbbitResult, WindowAligner};
use rainbbit_storage::{CacheSet, DataPointProjector, Invalidator, RecordReader, SharedStore};
use std::sync::{Arc, PoisonError, RwLock};

/// Everything a handler or background job needs. Cheap to clone.
///
/// Caches, the client registry and the known measure set are created once
/// here and shared by reference for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub store: SharedStore,
    pub caches: Arc<CacheSet>,
    pub records: RecordReader,
    pub projector: Arc<DataPointProjector>,
    pub invalidator: Invalidator,
    pub admission: Arc<AdmissionController>,
    pub renderer: Arc<dyn ChartRenderer>,
    pub catalog: Arc<ConditionCatalog>,
    pub aligner: WindowAligner,
    zone: Arc<RwLock<String>>,
}

impl AppState {
    /// Validate `config` and build the shared components on top of `store`.
    pub async fn new(
        store: SharedStore,
        config: ApiConfig,
        catalog: ConditionCatalog,
        zone: String,
    ) -> RainbbitResult<Self> {
        config.validate()?;
        let aligner = config.window_aligner()?;
        let caches = Arc::new(CacheSet::new(config.cache_set_config())?);
        let projector = DataPointProjector::load(store.clone(), caches.clone()).await?;
        let admission = AdmissionController::new(config.admission_config())?;

        tracing::info!(
            measures = projector.known_measures().len(),
            conditions = catalog.len(),
            zone = %zone,
            interval_secs = aligner.interval_secs(),
            "Application state ready"
        );

        Ok(Self {
            records: RecordReader::new(store.clone(), caches.clone()),
            invalidator: Invalidator::new(caches.clone()),
            projector: Arc::new(projector),
            admission: Arc::new(admission),
            renderer: Arc::new(SvgChartRenderer::default()),
            catalog: Arc::new(catalog),
            zone: Arc::new(RwLock::new(zone)),
            config: Arc::new(config),
            store,
            caches,
            aligner,
        })
    }

    /// Swap the chart renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Current location name.
    pub fn zone(&self) -> String {
        self.zone
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_zone(&self, zone: &str) {
        let mut current = self.zone.write().unwrap_or_else(PoisonError::into_inner);
        if *current != zone {
            *current = zone.to_string();
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("caches", &self.caches)
            .field("aligner", &self.aligner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rainbbit_storage::InMemoryMeasurementStore;

    fn store() -> SharedStore {
        Arc::new(InMemoryMeasurementStore::new())
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let config = ApiConfig {
            points_cache_capacity: 0,
            ..ApiConfig::default()
        };
        let result = AppState::new(store(), config, ConditionCatalog::default(), String::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_zone_updates() {
        let state = AppState::new(
            store(),
            ApiConfig::default(),
            ConditionCatalog::default(),
            "Bologna".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(state.zone(), "Bologna");
        let clone = state.clone();
        clone.set_zone("Modena");
        assert_eq!(state.zone(), "Modena");
    }
}
