//! Unauthenticated routes.

mod resources;
mod visits;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/resources", get(resources::list_resources))
        .route("/resources/categories", get(resources::list_categories))
        .route("/resources/{slug}", get(resources::get_resource))
        .route("/search", get(resources::search))
        .route("/visits", post(visits::record_visit))
        .route("/visits/count", get(visits::count_visits))
}
