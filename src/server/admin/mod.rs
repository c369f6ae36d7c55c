mod groups;
mod metrics;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // User routes
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/roles", post(users::assign_role))
        .route("/users/{id}/roles/{role}", delete(users::revoke_role))
        // Group routes
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/groups/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/groups/{id}/members", post(groups::add_member))
        .route("/groups/{id}/members/{user_id}", delete(groups::remove_member))
        // Metrics routes
        .route("/metrics/history", get(metrics::history))
}
