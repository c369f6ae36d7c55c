use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{
    AssignRoleRequest, CreateUserRequest, PagedResponse, UpdateUserRequest, UserDto, UserListQuery,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::users;

const DEFAULT_PAGE_SIZE: i64 = 20;

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserListQuery>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, users::MAX_PAGE_SIZE);

    let result = users::list_users(
        state.store.as_ref(),
        page,
        page_size,
        params.search.as_deref(),
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(PagedResponse {
        items: result.items.iter().map(UserDto::from).collect(),
        total: result.total,
        page,
        page_size,
    })))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let summary = users::get_user(state.store.as_ref(), &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(UserDto::from(&summary))))
}

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let summary = users::create_user(state.store.as_ref(), &state.hasher, req.into_input()?)?;
    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(&summary))),
    ))
}

pub async fn update_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    let summary = users::update_user(state.store.as_ref(), &id, req.into_input()?)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(UserDto::from(&summary))))
}

pub async fn delete_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    users::delete_user(state.store.as_ref(), &state.media, &id).await?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn assign_role(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AssignRoleRequest>,
) -> impl IntoResponse {
    users::assign_role(state.store.as_ref(), &id, &req.role)?;
    let summary = users::get_user(state.store.as_ref(), &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(UserDto::from(&summary))))
}

pub async fn revoke_role(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((id, role)): Path<(String, String)>,
) -> impl IntoResponse {
    users::revoke_role(state.store.as_ref(), &id, &role)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
