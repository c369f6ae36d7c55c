use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::TokenKind;
use crate::server::AppState;
use crate::types::{Role, User, UserStatus};

/// The caller behind a verified access token, with roles as currently stored.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub roles: Vec<Role>,
}

impl AuthUser {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.user.id
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Extractor that requires any signed-in user
pub struct RequireUser(pub AuthUser);

/// Extractor that requires the ADMIN role
pub struct RequireAdmin(pub AuthUser);

/// Extractor that requires the TEACHER role
pub struct RequireTeacher(pub AuthUser);

/// Extractor that requires the STUDENT role
pub struct RequireStudent(pub AuthUser);

/// Extractor that requires TEACHER or ADMIN
pub struct RequireStaff(pub AuthUser);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    Disabled,
    MissingRole(&'static str),
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::Disabled => (StatusCode::FORBIDDEN, "Account is disabled"),
            AuthError::MissingRole(message) => (StatusCode::FORBIDDEN, message),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"lyceum\""),
            );
        }

        response
    }
}

/// Extracts the raw token from `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidScheme)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingAuth);
    }
    Ok(token)
}

/// Resolves an access token to its user. Roles are read from the store on
/// every call so that revocations apply immediately.
pub fn authenticate_token(state: &AppState, token: &str) -> Result<AuthUser, AuthError> {
    let claims = state
        .tokens
        .decode(token)
        .map_err(|_| AuthError::InvalidToken)?;

    if claims.typ != TokenKind::Access {
        return Err(AuthError::InvalidToken);
    }

    let user = state
        .store
        .get_user(&claims.sub)
        .map_err(|e| {
            tracing::error!("Failed to load user for token: {e}");
            AuthError::InternalError
        })?
        .ok_or(AuthError::InvalidToken)?;

    if user.status != UserStatus::Active {
        return Err(AuthError::Disabled);
    }

    let roles = state.store.list_user_roles(&user.id).map_err(|e| {
        tracing::error!("Failed to load roles: {e}");
        AuthError::InternalError
    })?;

    Ok(AuthUser { user, roles })
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthUser, AuthError> {
    let token = bearer_token(parts)?;
    authenticate_token(state, token)
}

fn require(
    parts: &Parts,
    state: &AppState,
    allowed: &[Role],
    message: &'static str,
) -> Result<AuthUser, AuthError> {
    let auth = authenticate(parts, state)?;
    if !allowed.iter().any(|role| auth.has_role(*role)) {
        return Err(AuthError::MissingRole(message));
    }
    Ok(auth)
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(RequireUser)
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, &[Role::Admin], "Admin access required").map(RequireAdmin)
    }
}

impl FromRequestParts<Arc<AppState>> for RequireTeacher {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, &[Role::Teacher], "Teacher access required").map(RequireTeacher)
    }
}

impl FromRequestParts<Arc<AppState>> for RequireStudent {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, &[Role::Student], "Student access required").map(RequireStudent)
    }
}

impl FromRequestParts<Arc<AppState>> for RequireStaff {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        require(
            parts,
            state,
            &[Role::Teacher, Role::Admin],
            "Teacher or admin access required",
        )
        .map(RequireStaff)
    }
}
