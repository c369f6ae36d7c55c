use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use crate::auth::RequireStudent;
use crate::server::AppState;
use crate::server::dto::GroupDto;
use crate::server::response::{ApiError, ApiResponse};
use crate::service::Actor;
use crate::service::groups;

pub fn student_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/groups", get(my_groups))
        .route("/groups/{id}", get(get_group))
}

async fn my_groups(
    RequireStudent(student): RequireStudent,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let views = groups::my_groups(state.store.as_ref(), &Actor::member(student.id()))?;
    let items: Vec<GroupDto> = views.iter().map(GroupDto::from).collect();
    Ok::<_, ApiError>(Json(ApiResponse::success(items)))
}

async fn get_group(
    RequireStudent(student): RequireStudent,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let view = groups::get_group_view(state.store.as_ref(), &id, &Actor::member(student.id()))?;
    Ok::<_, ApiError>(Json(ApiResponse::success(GroupDto::from(&view))))
}
