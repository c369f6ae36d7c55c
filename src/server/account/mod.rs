mod auth;
mod me;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::AppState;

pub fn account_router() -> Router<Arc<AppState>> {
    Router::new()
        // Session routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        // Self-service routes
        .route("/me", get(me::get_me).delete(me::delete_me))
        .route("/me/profile", get(me::get_me).put(me::update_profile))
        .route("/me/password", put(me::change_password))
        .route("/me/ping", post(me::ping))
}
