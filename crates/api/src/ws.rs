//! Session-room WebSocket upgrade: `GET /ws`, `?session_id=` optional.
//!
//! Flow:
//! 1. Client connects; if `session_id` wasn't supplied, the server
//!    assigns one and sends it back as a `session_assigned` message.
//! 2. Client sends `{"type":"join_session","session_id":"..."}` to
//!    subscribe to that session's room.
//! 3. Every [`PipelineEvent`] emitted into that room is forwarded to
//!    the socket until it closes.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use goalconvo_domain::events::PipelineEvent;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    JoinSession { session_id: String },
}

/// `GET /ws` — upgrade to WebSocket.
pub async fn session_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.session_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, session_id: Option<String>) {
    let (mut sink, mut stream) = socket.split();

    let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if send_json(&mut sink, &serde_json::json!({ "type": "session_assigned", "session_id": session_id })).await.is_err() {
        return;
    }

    // Wait for the client's join_session before subscribing to anything,
    // so a slow client never misses events emitted right after connect.
    let joined_session = match wait_for_join(&mut stream, &session_id).await {
        Some(s) => s,
        None => {
            tracing::debug!(%session_id, "client disconnected before join_session");
            return;
        }
    };

    let mut rx = state.ctx.rooms.subscribe(&joined_session);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<PipelineEvent>(64);

    let forwarder = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if outbound_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            if send_json(&mut sink, &event).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
    }

    forwarder.abort();
    writer.abort();
    tracing::debug!(session_id = %joined_session, "session socket closed");
}

/// Wait up to 10s for `join_session`. Returns the joined session id, the
/// default (assigned) session id if the client never sends one in time,
/// or `None` if the socket closed first.
async fn wait_for_join(
    stream: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    default_session_id: &str,
) -> Option<String> {
    enum Outcome {
        Joined(String),
        Disconnected,
    }

    let result = tokio::time::timeout(std::time::Duration::from_secs(10), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(ClientMessage::JoinSession { session_id }) = serde_json::from_str(&text) {
                        return Outcome::Joined(session_id);
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Outcome::Disconnected,
                Some(Ok(_)) => continue,
                Some(Err(_)) => return Outcome::Disconnected,
            }
        }
    })
    .await;

    match result {
        Ok(Outcome::Joined(session_id)) => Some(session_id),
        Ok(Outcome::Disconnected) => None,
        Err(_) => Some(default_session_id.to_string()),
    }
}

async fn send_json(
    sink: &mut (impl SinkExt<Message> + Unpin),
    value: &impl serde::Serialize,
) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}
