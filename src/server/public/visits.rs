use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{Extensions, HeaderMap, StatusCode, header::USER_AGENT},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{TotalResponse, VisitRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::visits::{self, VisitInput};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// The body is optional; an empty one records only the request metadata.
pub async fn record_visit(
    State(state): State<Arc<AppState>>,
    extensions: Extensions,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let req: VisitRequest = if body.iter().all(u8::is_ascii_whitespace) {
        VisitRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request("Invalid visit payload"))?
    };
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    visits::record_visit(
        state.store.as_ref(),
        VisitInput {
            ip_address: visits::client_ip(header(&headers, "x-forwarded-for"), peer.as_deref()),
            user_agent: header(&headers, USER_AGENT.as_str()).map(str::to_string),
            path: req.path,
            referrer: req.referrer,
        },
    )?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn count_visits(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let total = visits::count_visits(state.store.as_ref())?;
    Ok::<_, ApiError>(Json(ApiResponse::success(TotalResponse { total })))
}
