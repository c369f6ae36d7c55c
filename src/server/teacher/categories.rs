use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireStaff;
use crate::server::AppState;
use crate::server::dto::{CategoryDto, CategoryGroupRequest, CategoryRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::catalog;

pub async fn list_categories(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let categories = catalog::list_categories(state.store.as_ref())?;
    let items: Vec<CategoryDto> = categories.iter().map(CategoryDto::from).collect();
    Ok::<_, ApiError>(Json(ApiResponse::success(items)))
}

pub async fn create_category(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CategoryRequest>,
) -> impl IntoResponse {
    let category = catalog::create_category(
        state.store.as_ref(),
        &req.label,
        &req.group,
        req.sort_order,
        req.group_order,
    )?;
    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CategoryDto::from(&category))),
    ))
}

pub async fn update_category(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<CategoryRequest>,
) -> impl IntoResponse {
    let category = catalog::update_category(
        state.store.as_ref(),
        &code,
        &req.label,
        &req.group,
        req.sort_order,
        req.group_order,
    )?;
    Ok::<_, ApiError>(Json(ApiResponse::success(CategoryDto::from(&category))))
}

pub async fn delete_category(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    catalog::delete_category(state.store.as_ref(), &code)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn rename_group(
    _staff: RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
    Json(req): Json<CategoryGroupRequest>,
) -> impl IntoResponse {
    let categories = catalog::rename_category_group(
        state.store.as_ref(),
        &label,
        &req.label,
        req.group_order,
    )?;
    let items: Vec<CategoryDto> = categories.iter().map(CategoryDto::from).collect();
    Ok::<_, ApiError>(Json(ApiResponse::success(items)))
}
