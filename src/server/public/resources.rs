use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{
    CategoryDto, ResourceCardDto, ResourceDetailDto, ResourceListQuery, ResourceListResponse,
    SearchItemDto, SearchQuery,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::catalog;

const DEFAULT_PAGE_SIZE: i64 = 9;
const MAX_PAGE_SIZE: i64 = 30;

pub async fn list_resources(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResourceListQuery>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1).max(1);
    let size = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let store = state.store.as_ref();
    let result = catalog::list_published_page(store, params.category.as_deref(), page, size)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ResourceListResponse {
        items: ResourceCardDto::load_all(store, &result.items)?,
        total: result.total,
        page,
        size,
    })))
}

pub async fn list_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let categories = catalog::list_categories(state.store.as_ref())?;
    let items: Vec<CategoryDto> = categories.iter().map(CategoryDto::from).collect();
    Ok::<_, ApiError>(Json(ApiResponse::success(items)))
}

pub async fn get_resource(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let entry = catalog::get_published_by_slug(store, &slug)?;
    let detail = ResourceDetailDto::load(store, &entry)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(detail)))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> impl IntoResponse {
    let term = params.q.unwrap_or_default();
    let entries = catalog::search_published(
        state.store.as_ref(),
        &term,
        catalog::MAX_SEARCH_RESULTS,
    )?;
    let items: Vec<SearchItemDto> = entries.iter().map(SearchItemDto::from).collect();
    Ok::<_, ApiError>(Json(ApiResponse::success(
        serde_json::json!({ "items": items }),
    )))
}
