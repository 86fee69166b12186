use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Extension, State},
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::auth::Principal;
use crate::models::error::ErrorKind;
use crate::models::messages::{ClientMessage, ServerMessage};
use crate::ws::room::{Room, RoomEvent};
use crate::AppState;

type Joined = Option<(Arc<Room>, broadcast::Receiver<RoomEvent>)>;

/// WebSocket handler for the realtime channel
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, principal))
}

/// Per-connection task: pumps inbound frames and room events until the
/// transport closes, then leaves the room exactly once.
async fn handle_socket(socket: WebSocket, state: AppState, principal: Principal) {
    let (mut sender, mut receiver) = socket.split();
    let socket_id = Uuid::new_v4();
    let mut joined: Joined = None;

    info!(
        "WebSocket session {} established for user {}",
        socket_id, principal.user_id
    );

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_client_text(&text, socket_id, &principal, &state, &mut joined, &mut sender).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error on session {}: {}", socket_id, e);
                        break;
                    }
                }
            }

            event = room_event(&mut joined) => {
                match event {
                    Ok(event) => {
                        // Don't echo a session's own broadcasts back to it
                        if event.sender == socket_id {
                            continue;
                        }
                        if !send_message(&mut sender, &event.message).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Session {} lagged by {} room events", socket_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                }
            }
        }
    }

    if let Some((room, _)) = joined.take() {
        state.registry.leave(room.doc_id, socket_id).await;
    }
    info!("WebSocket session {} closed", socket_id);
}

async fn room_event(joined: &mut Joined) -> Result<RoomEvent, broadcast::error::RecvError> {
    match joined {
        Some((_, rx)) => rx.recv().await,
        // Not in a room yet, wait forever
        None => std::future::pending().await,
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> bool {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(text)).await.is_ok()
}

async fn send_error(sender: &mut SplitSink<WebSocket, Message>, message: impl Into<String>) -> bool {
    send_message(
        sender,
        &ServerMessage::Error {
            message: message.into(),
        },
    )
    .await
}

/// Dispatch one inbound frame. Returns false when the transport failed and
/// the connection loop should end; protocol errors only emit `error` or
/// `access-denied` messages and keep the session alive.
async fn handle_client_text(
    text: &str,
    socket_id: Uuid,
    principal: &Principal,
    state: &AppState,
    joined: &mut Joined,
    sender: &mut SplitSink<WebSocket, Message>,
) -> bool {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!("Unparseable message on session {}: {}", socket_id, e);
            return send_error(sender, "unrecognized message").await;
        }
    };

    match msg {
        ClientMessage::JoinDocument {
            document_id,
            user_id,
        } => {
            if user_id != principal.user_id {
                return send_error(sender, "userId does not match the authenticated principal")
                    .await;
            }
            if joined.is_some() {
                return send_error(sender, "leave the current document before joining another")
                    .await;
            }
            match state
                .registry
                .join(document_id, principal, socket_id, None)
                .await
            {
                Ok((room, rx, snapshot)) => {
                    *joined = Some((room, rx));
                    send_message(sender, &snapshot).await
                }
                Err(e) if matches!(e.kind, ErrorKind::NotFound | ErrorKind::Forbidden) => {
                    send_message(
                        sender,
                        &ServerMessage::AccessDenied { message: e.message },
                    )
                    .await
                }
                Err(e) => send_error(sender, e.message).await,
            }
        }

        ClientMessage::LeaveDocument { document_id } => {
            if joined.as_ref().map(|(room, _)| room.doc_id) == Some(document_id) {
                if let Some((room, _)) = joined.take() {
                    state.registry.leave(room.doc_id, socket_id).await;
                }
            }
            true
        }

        ClientMessage::CursorUpdate {
            document_id,
            user_id,
            position,
            selection,
            username,
        } => {
            if user_id != principal.user_id {
                return send_error(sender, "userId does not match the authenticated principal")
                    .await;
            }
            if let Some(sel) = selection {
                if sel.start > sel.end {
                    return send_error(sender, "selection start must not exceed end").await;
                }
            }
            let Some(room) = joined_room(joined, document_id) else {
                return send_error(sender, "join the document before sending cursor updates")
                    .await;
            };
            room.update_cursor(socket_id, position, selection, username)
                .await;
            true
        }

        ClientMessage::TypingStart {
            document_id,
            user_id,
        } => {
            handle_typing(joined, sender, socket_id, principal, document_id, &user_id, true).await
        }

        ClientMessage::TypingStop {
            document_id,
            user_id,
        } => {
            handle_typing(joined, sender, socket_id, principal, document_id, &user_id, false).await
        }

        ClientMessage::DocumentChange {
            document_id,
            user_id,
            change,
        } => {
            if user_id != principal.user_id {
                return send_error(sender, "userId does not match the authenticated principal")
                    .await;
            }
            let Some(room) = joined_room(joined, document_id) else {
                return send_error(sender, "join the document before pushing content").await;
            };
            match state
                .registry
                .push_content(&room, socket_id, &principal.user_id, change.new_content)
                .await
            {
                Ok(()) => true,
                Err(e) => send_error(sender, e.message).await,
            }
        }
    }
}

async fn handle_typing(
    joined: &Joined,
    sender: &mut SplitSink<WebSocket, Message>,
    socket_id: Uuid,
    principal: &Principal,
    document_id: Uuid,
    user_id: &str,
    typing: bool,
) -> bool {
    if user_id != principal.user_id {
        return send_error(sender, "userId does not match the authenticated principal").await;
    }
    let Some(room) = joined_room(joined, document_id) else {
        return send_error(sender, "join the document before sending typing updates").await;
    };
    room.set_typing(socket_id, typing).await;
    true
}

fn joined_room(joined: &Joined, document_id: Uuid) -> Option<Arc<Room>> {
    joined
        .as_ref()
        .filter(|(room, _)| room.doc_id == document_id)
        .map(|(room, _)| room.clone())
}
