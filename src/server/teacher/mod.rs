mod categories;
mod groups;
mod resources;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

pub fn teacher_router() -> Router<Arc<AppState>> {
    Router::new()
        // Group routes
        .route("/groups", get(groups::my_groups))
        .route("/groups/{id}", get(groups::get_group).put(groups::update_group))
        .route("/groups/{id}/members", post(groups::add_member))
        .route("/groups/{id}/members/{user_id}", delete(groups::remove_member))
        // Resource routes
        .route(
            "/resources",
            get(resources::list_resources).post(resources::create_resource),
        )
        .route(
            "/resources/{id}",
            get(resources::get_resource)
                .put(resources::update_resource)
                .delete(resources::delete_resource),
        )
        // Category routes
        .route(
            "/resource-categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/resource-categories/{code}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route(
            "/resource-categories/groups/{label}",
            put(categories::rename_group),
        )
}
