//! Live metrics over WebSocket for admins.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use serde::Deserialize;

use crate::auth::authenticate_token;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Only valid access tokens of ADMIN users get a stream.
fn is_authorized(state: &AppState, token: Option<&str>) -> bool {
    token
        .and_then(|t| authenticate_token(state, t).ok())
        .is_some_and(|auth| auth.is_admin())
}

pub async fn metrics_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<SocketQuery>,
) -> Response {
    let authorized = is_authorized(&state, params.token.as_deref());
    ws.on_upgrade(move |socket| async move {
        if authorized {
            stream_metrics(socket, state).await;
        } else {
            reject(socket).await;
        }
    })
}

async fn reject(mut socket: WebSocket) {
    tracing::debug!("Rejecting metrics socket");
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: "Unauthorized".into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

async fn stream_metrics(mut socket: WebSocket, state: Arc<AppState>) {
    let (id, mut samples) = state.observers.subscribe();

    loop {
        tokio::select! {
            sample = samples.recv() => {
                // None means the registry dropped this observer.
                let Some(payload) = sample else { break };
                if socket.send(Message::Text(payload.to_string().into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.observers.unsubscribe(id);
    tracing::debug!("Metrics socket {id} closed");
}
