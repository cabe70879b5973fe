/// Realtime WebSocket endpoint
///
/// # Endpoint
///
/// ```text
/// GET /api/ws?token=<access token>
/// ```
///
/// The access token may also be sent as `Authorization: Bearer`. Handshakes
/// without a valid token are refused with 401 before the upgrade.
///
/// Once connected, the client joins board rooms with `join:board` frames and
/// receives every board event it did not cause itself (see
/// [`taskflow_shared::realtime::protocol`] for the frame formats). Joining a
/// board requires membership.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use taskflow_shared::{
    auth::{
        authorization::verify_membership,
        middleware::{authenticate, AuthContext, AuthError},
    },
    error::ServiceError,
    realtime::{
        protocol::{error_frame, extract_token, Ack, ClientMessage},
        registry::OUTBOUND_BUFFER,
        ConnectionId,
    },
    store::Store,
};
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Authenticates the handshake, then upgrades
pub async fn connect<S: Store>(
    State(state): State<AppState<S>>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    upgrade: Option<WebSocketUpgrade>,
) -> ApiResult<Response> {
    let token = extract_token(params.token.as_deref(), &headers)
        .ok_or(AuthError::MissingCredentials)?;
    let auth = authenticate(&state.tokens, &token).map_err(|e| {
        tracing::warn!(error = %e, "Rejected realtime handshake");
        e
    })?;

    let upgrade =
        upgrade.ok_or_else(|| ApiError::BadRequest("Expected WebSocket upgrade".to_string()))?;

    Ok(upgrade.on_upgrade(move |socket| serve_socket(state, auth, socket)))
}

async fn serve_socket<S: Store>(state: AppState<S>, auth: AuthContext, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let id = state.registry.register(auth.user_id, tx);

    tracing::info!(user_id = %auth.user_id, connection = ?id, "Realtime connection opened");

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => handle_frame(&state, id, &auth, &text).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, connection = ?id, "Socket read failed");
                    break;
                }
            },
            _ = &mut writer => break,
        }
    }

    writer.abort();
    close_connection(&state, id, &auth);
}

/// Drops the connection from every room it joined
fn close_connection<S: Store>(state: &AppState<S>, id: ConnectionId, auth: &AuthContext) {
    state.registry.unregister(id);
    tracing::info!(user_id = %auth.user_id, connection = ?id, "Realtime connection closed");
}

async fn handle_frame<S: Store>(state: &AppState<S>, id: ConnectionId, auth: &AuthContext, text: &str) {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, connection = ?id, "Unrecognized frame");
            state.registry.send_to(id, error_frame("Unrecognized message"));
            return;
        }
    };

    match message {
        ClientMessage::JoinBoard { board_id } => {
            match verify_membership(state.store.as_ref(), board_id, auth.user_id).await {
                Ok(_) => {
                    state.registry.join(id, board_id);
                    state.registry.send_to(id, Ack::joined(board_id).to_frame());
                }
                Err(ServiceError::NotAMember) => {
                    state
                        .registry
                        .send_to(id, error_frame(&ServiceError::NotAMember.to_string()));
                }
                Err(e) => {
                    tracing::error!(error = %e, %board_id, "Membership lookup failed");
                    state.registry.send_to(id, error_frame("Could not join board"));
                }
            }
        }
        ClientMessage::LeaveBoard { board_id } => {
            state.registry.leave(id, board_id);
            state.registry.send_to(id, Ack::left(board_id).to_frame());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;
    use taskflow_shared::{
        realtime::{ConnectionRegistry, LocalPublisher},
        services::{NewBoard, Signup},
        store::MemoryStore,
    };
    use uuid::Uuid;

    struct Socket {
        id: ConnectionId,
        auth: AuthContext,
        rx: mpsc::Receiver<String>,
    }

    fn state() -> AppState<MemoryStore> {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgresql://localhost/taskflow_test"),
            ("JWT_SECRET", "test-access-secret-that-is-long-enough"),
            ("JWT_REFRESH_SECRET", "test-refresh-secret-that-is-long-enough"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        let registry = ConnectionRegistry::new();
        let events = Arc::new(LocalPublisher::new(registry.clone()));
        AppState::new(Arc::new(MemoryStore::new()), events, registry, config)
    }

    async fn open(state: &AppState<MemoryStore>, name: &str) -> Socket {
        let session = state
            .services
            .identity
            .signup(Signup {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password: "Corr3ct-Horse!".to_string(),
            })
            .await
            .unwrap();
        let (tx, rx) = mpsc::channel(16);
        let id = state.registry.register(session.user.id, tx);
        Socket {
            id,
            auth: AuthContext {
                user_id: session.user.id,
                email: session.user.email,
            },
            rx,
        }
    }

    async fn board(state: &AppState<MemoryStore>, owner: &Socket) -> Uuid {
        state
            .services
            .boards
            .create(
                owner.auth.user_id,
                NewBoard {
                    title: "Alpha".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap()
            .board
            .id
    }

    async fn send(state: &AppState<MemoryStore>, socket: &mut Socket, frame: Value) -> Value {
        handle_frame(state, socket.id, &socket.auth, &frame.to_string()).await;
        let reply = socket.rx.try_recv().expect("a reply frame");
        serde_json::from_str(&reply).unwrap()
    }

    #[tokio::test]
    async fn test_join_and_leave_are_acknowledged() {
        let state = state();
        let mut ada = open(&state, "Ada").await;
        let board_id = board(&state, &ada).await;

        let joined = send(
            &state,
            &mut ada,
            json!({ "event": "join:board", "data": { "boardId": board_id } }),
        )
        .await;
        assert_eq!(joined, json!({ "event": "joined", "boardId": board_id }));
        assert_eq!(state.registry.room_size(board_id), 1);

        let left = send(
            &state,
            &mut ada,
            json!({ "event": "leave:board", "data": { "boardId": board_id } }),
        )
        .await;
        assert_eq!(left, json!({ "event": "left", "boardId": board_id }));
        assert_eq!(state.registry.room_size(board_id), 0);
    }

    #[tokio::test]
    async fn test_join_requires_membership() {
        let state = state();
        let ada = open(&state, "Ada").await;
        let mut cleo = open(&state, "Cleo").await;
        let board_id = board(&state, &ada).await;

        let reply = send(
            &state,
            &mut cleo,
            json!({ "event": "join:board", "data": { "boardId": board_id } }),
        )
        .await;
        assert_eq!(reply["event"], "error");
        assert_eq!(reply["message"], ServiceError::NotAMember.to_string());
        assert_eq!(state.registry.room_size(board_id), 0);

        let missing = send(
            &state,
            &mut cleo,
            json!({ "event": "join:board", "data": { "boardId": Uuid::new_v4() } }),
        )
        .await;
        assert_eq!(missing["event"], "error");
    }

    #[tokio::test]
    async fn test_unrecognized_frames_get_error_reply() {
        let state = state();
        let mut ada = open(&state, "Ada").await;

        for frame in [
            "not json".to_string(),
            json!({ "event": "join:board" }).to_string(),
            json!({ "event": "shout", "data": {} }).to_string(),
            json!({ "event": "join:board", "data": { "boardId": "nope" } }).to_string(),
        ] {
            handle_frame(&state, ada.id, &ada.auth, &frame).await;
            let reply: Value = serde_json::from_str(&ada.rx.try_recv().unwrap()).unwrap();
            assert_eq!(
                reply,
                json!({ "event": "error", "message": "Unrecognized message" }),
                "frame {}",
                frame
            );
        }
        assert!(ada.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_connection_leaves_its_rooms() {
        let state = state();
        let mut ada = open(&state, "Ada").await;
        let board_id = board(&state, &ada).await;
        send(
            &state,
            &mut ada,
            json!({ "event": "join:board", "data": { "boardId": board_id } }),
        )
        .await;
        assert_eq!(state.registry.room_size(board_id), 1);

        close_connection(&state, ada.id, &ada.auth);

        assert_eq!(state.registry.room_size(board_id), 0);
        assert!(state.registry.connections_for(ada.auth.user_id).is_empty());
    }
}
