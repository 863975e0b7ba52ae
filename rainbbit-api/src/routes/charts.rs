//! Chart endpoints.
//!
//! Rendered charts are cached per chart, theme and aligned window. A miss
//! goes through the data point projector, so the underlying series is
//! shared with `/api/series`.

use super::{now_secs, WindowQuery};
use crate::chart::{ChartSpec, Palette};
use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use rainbbit_core::{CacheKey, MeasureSet, RainbbitError};
use std::sync::Arc;

async fn render_chart(state: &AppState, chart: ChartSpec, query: &WindowQuery) -> ApiResult<Response> {
    let window = query.window(&state.aligner, now_secs());
    let palette = Palette::for_theme(query.theme.as_deref());
    let key = CacheKey::scoped(
        &chart.cache_scope(palette),
        &MeasureSet::Listed(chart.measures.clone()),
        window,
    );

    let bytes = state
        .caches
        .charts
        .get_or_try_insert_with(key, || async {
            let points = state.projector.project(&chart.measures, window).await?;
            let bytes = state.renderer.render(&chart, &points, palette)?;
            Ok::<_, RainbbitError>(Arc::new(bytes))
        })
        .await?;

    Ok((
        [(header::CONTENT_TYPE, state.renderer.content_type())],
        bytes.as_ref().clone(),
    )
        .into_response())
}

/// GET /api/plot/:measure?from&to&theme
pub async fn plot_measure(
    State(state): State<AppState>,
    Path(measure): Path<String>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Response> {
    render_chart(&state, ChartSpec::single(&measure), &query).await
}

/// GET /api/temp?from&to&theme
pub async fn plot_temperature(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Response> {
    render_chart(&state, ChartSpec::temperature(), &query).await
}

/// GET /api/pressure?from&to&theme
pub async fn plot_pressure(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Response> {
    render_chart(&state, ChartSpec::pressure(), &query).await
}
