use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::server::AppState;
use crate::server::dto::{
    LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse, SessionResponse,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::accounts;

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let user = accounts::register(state.store.as_ref(), &state.hasher, req.into())?;

    let body = RegisterResponse {
        user_id: user.id,
        email: user.email,
    };
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(body))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let session = accounts::login(
        state.store.as_ref(),
        &state.hasher,
        &state.tokens,
        &req.email,
        &req.password,
    )?;

    let body = SessionResponse::new(session, state.store.as_ref())?;
    Ok::<_, ApiError>(Json(ApiResponse::success(body)))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> impl IntoResponse {
    let session = accounts::refresh(state.store.as_ref(), &state.tokens, &req.refresh_token)?;

    let body = SessionResponse::new(session, state.store.as_ref())?;
    Ok::<_, ApiError>(Json(ApiResponse::success(body)))
}

/// Tokens are stateless; the client discards them.
pub async fn logout() -> impl IntoResponse {
    Json(ApiResponse::success(json!({ "status": "ok" })))
}
