use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{AuthUser, RequireStaff};
use crate::server::AppState;
use crate::server::dto::{ResourceCardDto, ResourceDetailDto, ResourceRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::Actor;
use crate::service::catalog;

/// Admins manage every resource; teachers only their own.
fn actor(auth: &AuthUser) -> Actor {
    Actor {
        user_id: auth.id().to_string(),
        is_admin: auth.is_admin(),
    }
}

pub async fn list_resources(
    RequireStaff(auth): RequireStaff,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let entries = catalog::list_authored(store, &actor(&auth))?;
    let items = ResourceCardDto::load_all(store, &entries)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(items)))
}

pub async fn create_resource(
    RequireStaff(auth): RequireStaff,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResourceRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let entry = catalog::create_resource(store, &req.into_input()?, auth.id())?;
    let detail = ResourceDetailDto::load(store, &entry)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(detail))))
}

pub async fn get_resource(
    _auth: RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let entry = catalog::get_resource(store, &id)?;
    let detail = ResourceDetailDto::load(store, &entry)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(detail)))
}

pub async fn update_resource(
    RequireStaff(auth): RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ResourceRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let entry = catalog::update_resource(store, &id, &req.into_input()?, &actor(&auth))?;
    let detail = ResourceDetailDto::load(store, &entry)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(detail)))
}

pub async fn delete_resource(
    RequireStaff(auth): RequireStaff,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    catalog::delete_resource(state.store.as_ref(), &state.media, &id, &actor(&auth)).await?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
