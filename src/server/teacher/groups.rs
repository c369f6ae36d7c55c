//! Group management scoped to groups where the caller is an in-group TEACHER.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireTeacher;
use crate::server::AppState;
use crate::server::dto::{AddMemberRequest, GroupDto, UpdateGroupRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::Actor;
use crate::service::groups;

pub async fn my_groups(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let views = groups::my_groups(state.store.as_ref(), &Actor::member(teacher.id()))?;
    let items: Vec<GroupDto> = views.iter().map(GroupDto::from).collect();
    Ok::<_, ApiError>(Json(ApiResponse::success(items)))
}

pub async fn get_group(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let view = groups::get_group_view(state.store.as_ref(), &id, &Actor::member(teacher.id()))?;
    Ok::<_, ApiError>(Json(ApiResponse::success(GroupDto::from(&view))))
}

pub async fn update_group(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateGroupRequest>,
) -> impl IntoResponse {
    groups::update_group(
        state.store.as_ref(),
        &id,
        req.name.as_deref(),
        req.grade,
        req.year,
        &Actor::member(teacher.id()),
    )?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn add_member(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> impl IntoResponse {
    groups::add_member(
        state.store.as_ref(),
        &id,
        &req.user_id,
        &req.member_role,
        &Actor::member(teacher.id()),
    )?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn remove_member(
    RequireTeacher(teacher): RequireTeacher,
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    groups::remove_member(
        state.store.as_ref(),
        &id,
        &user_id,
        &Actor::member(teacher.id()),
    )?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
