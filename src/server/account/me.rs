use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{ChangePasswordRequest, ProfileRequest, UserDto};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::{accounts, users};

fn current_user(state: &AppState, user_id: &str) -> Result<UserDto, ApiError> {
    let summary = users::get_user(state.store.as_ref(), user_id)?;
    Ok(UserDto::from(&summary))
}

pub async fn get_me(
    RequireUser(auth): RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user = current_user(&state, auth.id())?;
    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn update_profile(
    RequireUser(auth): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProfileRequest>,
) -> impl IntoResponse {
    accounts::update_profile(state.store.as_ref(), auth.id(), req.into())?;

    let user = current_user(&state, auth.id())?;
    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn change_password(
    RequireUser(auth): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> impl IntoResponse {
    accounts::change_password(
        state.store.as_ref(),
        &state.hasher,
        &auth.user,
        &req.current_password,
        &req.new_password,
        &req.confirm_password,
    )?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn ping(
    RequireUser(auth): RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    accounts::touch_last_seen(state.store.as_ref(), &auth.user)?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn delete_me(
    RequireUser(auth): RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    accounts::delete_account(state.store.as_ref(), &state.media, auth.id()).await?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
