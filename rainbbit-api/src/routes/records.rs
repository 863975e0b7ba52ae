//! Record, series and metadata endpoints.

use super::{now_secs, WindowQuery};
use crate::chart::THEMES;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use rainbbit_core::{wind_direction, Condition, ConditionCatalog, DataPoint, Record};
use serde::{Deserialize, Serialize};

/// A record as served over HTTP, with its conditions resolved.
#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    #[serde(flatten)]
    pub record: Record,
    pub conditions: Vec<Condition>,
    pub wind_direction: &'static str,
}

impl RecordView {
    fn new(record: &Record, catalog: &ConditionCatalog) -> Self {
        Self {
            conditions: catalog.resolve(record),
            wind_direction: wind_direction(record.wind_deg),
            record: record.clone(),
        }
    }
}

/// GET /api/records?from&to
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<RecordView>>> {
    let window = query.window(&state.aligner, now_secs());
    let records = state.records.records(window).await?;
    Ok(Json(
        records
            .iter()
            .map(|r| RecordView::new(r, &state.catalog))
            .collect(),
    ))
}

/// GET /api/latest
pub async fn latest_record(State(state): State<AppState>) -> ApiResult<Json<RecordView>> {
    let record = state
        .records
        .latest()
        .await?
        .ok_or_else(|| ApiError::not_found("No records yet"))?;
    Ok(Json(RecordView::new(&record, &state.catalog)))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasuresQuery {
    /// Comma-separated measure names, projected in this order.
    pub measures: Option<String>,
}

impl MeasuresQuery {
    pub fn measures(&self) -> Vec<String> {
        self.measures
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect()
    }
}

/// GET /api/series?measures=a,b&from&to
pub async fn series(
    State(state): State<AppState>,
    Query(window): Query<WindowQuery>,
    Query(measures): Query<MeasuresQuery>,
) -> ApiResult<Json<Vec<DataPoint>>> {
    let measures = measures.measures();
    let window = window.window(&state.aligner, now_secs());
    let points = state.projector.project(&measures, window).await?;
    Ok(Json(points.as_ref().clone()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaResponse {
    pub zone: String,
    pub measures: Vec<String>,
    pub themes: Vec<String>,
}

/// GET /api/meta
pub async fn meta(State(state): State<AppState>) -> Json<MetaResponse> {
    Json(MetaResponse {
        zone: state.zone(),
        measures: state.projector.known_measures().to_vec(),
        themes: THEMES.iter().map(|t| t.to_string()).collect(),
    })
}

/// GET /api/conditions
pub async fn conditions(State(state): State<AppState>) -> Json<ConditionCatalog> {
    Json(state.catalog.as_ref().clone())
}
