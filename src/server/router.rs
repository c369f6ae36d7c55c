use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::account::account_router;
use super::admin::admin_router;
use super::media::media_router;
use super::public::public_router;
use super::student::student_router;
use super::teacher::teacher_router;
use super::ws::metrics_socket;
use crate::auth::{PasswordHasher, TokenService};
use crate::config::ServerConfig;
use crate::media::MediaStorage;
use crate::metrics::ObserverRegistry;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub hasher: PasswordHasher,
    pub media: MediaStorage,
    /// Shared with the metrics loop.
    pub observers: Arc<ObserverRegistry>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        observers: Arc<ObserverRegistry>,
        config: ServerConfig,
    ) -> Self {
        Self {
            store,
            tokens: TokenService::from_config(&config),
            hasher: PasswordHasher::new(),
            media: MediaStorage::new(&config.media_dir()),
            observers,
            config,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", account_router())
        .nest("/api/admin", admin_router())
        .nest("/api/teacher", teacher_router())
        .nest("/api/student", student_router())
        .nest("/api/public", public_router())
        .nest("/api/media", media_router())
        .route("/ws/metrics", get(metrics_socket))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::store::SqliteStore;

    fn router() -> (TempDir, Router) {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            jwt_secret: "router-test-secret-0123456789abcdef".to_string(),
            ..ServerConfig::default()
        };
        let store = SqliteStore::new(config.db_path()).unwrap();
        store.initialize().unwrap();

        let state = AppState::new(Arc::new(store), Arc::new(ObserverRegistry::new()), config);
        (temp, create_router(Arc::new(state)))
    }

    async fn status_of(router: Router, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_route_families() {
        let (_temp, router) = router();

        assert_eq!(status_of(router.clone(), "/health").await, StatusCode::OK);
        assert_eq!(
            status_of(router.clone(), "/api/admin/users").await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(router.clone(), "/api/public/visits/count").await,
            StatusCode::OK
        );
        assert_eq!(status_of(router, "/api/nowhere").await, StatusCode::NOT_FOUND);
    }
}
