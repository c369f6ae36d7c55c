use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::error::Result;
use crate::server::AppState;
use crate::server::dto::{
    AddMemberRequest, CreateGroupRequest, GroupDto, GroupListQuery, PagedResponse,
    UpdateGroupRequest,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::groups::{self, GroupView};
use crate::service::Actor;

const DEFAULT_PAGE_SIZE: i64 = 20;

pub async fn list_groups(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<GroupListQuery>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1).max(1);
    let size = params.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
    let result = groups::list_groups(state.store.as_ref(), page, size)?;

    let items = result
        .items
        .into_iter()
        .map(|group| -> Result<GroupDto> {
            let members = state.store.list_group_members(&group.id)?;
            Ok(GroupDto::from(&GroupView { group, members }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok::<_, ApiError>(Json(ApiResponse::success(PagedResponse {
        items,
        total: result.total,
        page,
        page_size: size,
    })))
}

pub async fn create_group(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGroupRequest>,
) -> impl IntoResponse {
    let actor = Actor::admin(admin.id());
    let group = groups::create_group(state.store.as_ref(), &req.name, req.grade, req.year, &actor)?;
    let view = groups::get_group_view(state.store.as_ref(), &group.id, &actor)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(GroupDto::from(&view))),
    ))
}

pub async fn get_group(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let view = groups::get_group_view(state.store.as_ref(), &id, &Actor::admin(admin.id()))?;
    Ok::<_, ApiError>(Json(ApiResponse::success(GroupDto::from(&view))))
}

pub async fn update_group(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateGroupRequest>,
) -> impl IntoResponse {
    let actor = Actor::admin(admin.id());
    groups::update_group(
        state.store.as_ref(),
        &id,
        req.name.as_deref(),
        req.grade,
        req.year,
        &actor,
    )?;
    let view = groups::get_group_view(state.store.as_ref(), &id, &actor)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(GroupDto::from(&view))))
}

pub async fn delete_group(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    groups::delete_group(state.store.as_ref(), &id, &Actor::admin(admin.id()))?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn add_member(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> impl IntoResponse {
    let actor = Actor::admin(admin.id());
    groups::add_member(
        state.store.as_ref(),
        &id,
        &req.user_id,
        &req.member_role,
        &actor,
    )?;
    let view = groups::get_group_view(state.store.as_ref(), &id, &actor)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(GroupDto::from(&view))))
}

pub async fn remove_member(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    groups::remove_member(state.store.as_ref(), &id, &user_id, &Actor::admin(admin.id()))?;
    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
