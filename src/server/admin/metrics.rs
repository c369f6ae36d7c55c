use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::metrics::{SampleView, latest_samples};
use crate::server::AppState;
use crate::server::dto::HistoryQuery;
use crate::server::response::{ApiError, ApiResponse};

const MAX_HISTORY: i64 = 500;

pub async fn history(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = params
        .limit
        .unwrap_or(state.config.metrics_history_limit)
        .clamp(1, MAX_HISTORY);

    let samples = latest_samples(state.store.as_ref(), limit)?;
    let items: Vec<SampleView> = samples.iter().map(SampleView::from).collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(items)))
}
