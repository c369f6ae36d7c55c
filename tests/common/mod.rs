#![allow(dead_code)]

use std::sync::Arc;

use axum::http::{HeaderValue, header};
use axum_test::{TestRequest, TestServer};
use serde_json::{Value, json};
use tempfile::TempDir;

use lyceum::auth::PasswordHasher;
use lyceum::config::ServerConfig;
use lyceum::metrics::ObserverRegistry;
use lyceum::server::{AppState, create_router};
use lyceum::service::accounts::ProfileInput;
use lyceum::service::directory::ensure_all_role_groups;
use lyceum::service::users::{self, NewUser};
use lyceum::store::{SqliteStore, Store};

pub const PASSWORD: &str = "correct-horse";

/// An in-process server over a fresh data directory.
pub struct TestApp {
    pub temp_dir: TempDir,
    pub state: Arc<AppState>,
    pub server: TestServer,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            jwt_secret: "integration-test-secret-0123456789abcdef".to_string(),
            ..ServerConfig::default()
        };
        config.validate().expect("valid config");

        let store = SqliteStore::new(config.db_path()).expect("open store");
        store.initialize().expect("initialize store");
        ensure_all_role_groups(&store).expect("provision role groups");
        let store: Arc<dyn Store> = Arc::new(store);

        let state = Arc::new(AppState::new(
            store,
            Arc::new(ObserverRegistry::new()),
            config,
        ));
        let server = TestServer::new(create_router(state.clone())).expect("start test server");

        Self {
            temp_dir,
            state,
            server,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.state.store.as_ref()
    }

    /// Creates an account directly and returns its id.
    pub fn create_user(&self, email: &str, roles: &[&str]) -> String {
        let summary = users::create_user(
            self.store(),
            &PasswordHasher::new(),
            NewUser {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                status: None,
                roles: roles.iter().map(|r| r.to_string()).collect(),
                profile: ProfileInput::default(),
            },
        )
        .expect("create user");
        summary.user.id
    }

    pub async fn login(&self, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["data"]["accessToken"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    /// Creates an account with the given roles and signs it in.
    pub async fn user_with_token(&self, email: &str, roles: &[&str]) -> (String, String) {
        let id = self.create_user(email, roles);
        let token = self.login(email).await;
        (id, token)
    }
}

/// Adds `Authorization: Bearer <token>` to a request.
pub fn authed(request: TestRequest, token: &str) -> TestRequest {
    let value = HeaderValue::from_str(&format!("Bearer {token}")).expect("header value");
    request.add_header(header::AUTHORIZATION, value)
}
