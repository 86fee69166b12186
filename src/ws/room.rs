use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::models::messages::{RoomUser, SelectionRange, ServerMessage};

/// Fixed palette of display colors handed out to sessions.
pub const SESSION_COLORS: [&str; 10] = [
    "#e6194b", "#3cb44b", "#ffb000", "#4363d8", "#f58231", "#911eb4", "#46c3d0", "#f032e6",
    "#7fbf3f", "#008080",
];

/// An event on a room's outbound channel. The per-connection task drops
/// events whose `sender` matches its own session id.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub sender: Uuid,
    pub message: ServerMessage,
}

/// Live state of one connected session inside a room.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub socket_id: Uuid,
    pub user_id: String,
    pub username: Option<String>,
    pub color: String,
    pub cursor: Option<u64>,
    pub selection: Option<SelectionRange>,
    pub typing: bool,
}

impl SessionState {
    pub fn new(socket_id: Uuid, user_id: String, username: Option<String>, color: String) -> Self {
        Self {
            socket_id,
            user_id,
            username,
            color,
            cursor: None,
            selection: None,
            typing: false,
        }
    }

    fn to_room_user(&self) -> RoomUser {
        RoomUser {
            socket_id: self.socket_id,
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            color: self.color.clone(),
            cursor: self.cursor,
            selection: self.selection,
            typing: self.typing,
        }
    }
}

#[derive(Debug)]
struct RoomState {
    body: String,
    revision: i64,
    last_edited: DateTime<Utc>,
    sessions: HashMap<Uuid, SessionState>,
}

/// In-memory per-document fan-out structure.
///
/// Caches the latest body to seed new joiners; every broadcast goes through
/// one `tokio::sync::broadcast` channel so all subscribers observe the same
/// order. The roster mutex is never held across a transport send; the
/// channel send is synchronous.
#[derive(Debug)]
pub struct Room {
    pub doc_id: Uuid,
    events: broadcast::Sender<RoomEvent>,
    state: Mutex<RoomState>,
}

impl Room {
    pub fn new(
        doc_id: Uuid,
        body: String,
        revision: i64,
        last_edited: DateTime<Utc>,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            doc_id,
            events,
            state: Mutex::new(RoomState {
                body,
                revision,
                last_edited,
                sessions: HashMap::new(),
            }),
        }
    }

    /// Subscribe to the room's outbound channel. Call before `join` so no
    /// event between the two is missed.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    /// Add a session to the roster and return the state snapshot for it.
    /// Peers are told through a `user-joined` event.
    pub async fn join(&self, session: SessionState) -> ServerMessage {
        let socket_id = session.socket_id;
        let user_id = session.user_id.clone();
        let snapshot = {
            let mut state = self.state.lock().await;
            let current_users: Vec<RoomUser> =
                state.sessions.values().map(|s| s.to_room_user()).collect();
            state.sessions.insert(socket_id, session);
            ServerMessage::DocumentState {
                content: state.body.clone(),
                version: state.revision,
                last_edited: state.last_edited.to_rfc3339(),
                current_users,
            }
        };
        let _ = self.events.send(RoomEvent {
            sender: socket_id,
            message: ServerMessage::UserJoined {
                user_id,
                socket_id,
                timestamp: Utc::now().to_rfc3339(),
            },
        });
        snapshot
    }

    /// Remove a session from the roster, telling the remaining peers.
    /// Returns the number of sessions left.
    pub async fn leave(&self, socket_id: Uuid) -> usize {
        let remaining = {
            let mut state = self.state.lock().await;
            state.sessions.remove(&socket_id);
            state.sessions.len()
        };
        let _ = self.events.send(RoomEvent {
            sender: socket_id,
            message: ServerMessage::UserLeft {
                socket_id,
                timestamp: Utc::now().to_rfc3339(),
            },
        });
        remaining
    }

    /// Store the session's cursor state and fan it out to peers. Cursor
    /// state is included in snapshots sent to future joiners.
    pub async fn update_cursor(
        &self,
        socket_id: Uuid,
        position: u64,
        selection: Option<SelectionRange>,
        username: Option<String>,
    ) {
        let user_id = {
            let mut state = self.state.lock().await;
            let Some(session) = state.sessions.get_mut(&socket_id) else {
                return;
            };
            session.cursor = Some(position);
            session.selection = selection;
            if username.is_some() {
                session.username = username.clone();
            }
            session.user_id.clone()
        };
        let _ = self.events.send(RoomEvent {
            sender: socket_id,
            message: ServerMessage::CursorUpdate {
                user_id,
                socket_id,
                position,
                selection,
                username,
            },
        });
    }

    /// Flip the session's typing flag and fan the transition out to peers.
    pub async fn set_typing(&self, socket_id: Uuid, typing: bool) {
        let user_id = {
            let mut state = self.state.lock().await;
            let Some(session) = state.sessions.get_mut(&socket_id) else {
                return;
            };
            session.typing = typing;
            session.user_id.clone()
        };
        let message = if typing {
            ServerMessage::TypingStart { user_id, socket_id }
        } else {
            ServerMessage::TypingStop { user_id, socket_id }
        };
        let _ = self.events.send(RoomEvent {
            sender: socket_id,
            message,
        });
    }

    /// Publish a committed body to the room.
    ///
    /// The cache only moves forward: a notification whose revision is not
    /// strictly greater than the cached one still fans out (clients discard
    /// stale versions) but does not regress the cache.
    pub async fn publish_content(
        &self,
        sender: Uuid,
        user_id: &str,
        body: &str,
        revision: i64,
        timestamp: DateTime<Utc>,
    ) {
        {
            let mut state = self.state.lock().await;
            if revision > state.revision {
                state.body = body.to_string();
                state.revision = revision;
                state.last_edited = timestamp;
            }
        }
        let _ = self.events.send(RoomEvent {
            sender,
            message: ServerMessage::DocumentUpdated {
                user_id: user_id.to_string(),
                socket_id: sender,
                change: crate::models::messages::ContentChange {
                    new_content: body.to_string(),
                    version: revision,
                    timestamp: timestamp.to_rfc3339(),
                },
            },
        });
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Cached body and revision. Used by tests and diagnostics.
    pub async fn cached_content(&self) -> (String, i64) {
        let state = self.state.lock().await;
        (state.body.clone(), state.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user: &str) -> SessionState {
        SessionState::new(
            Uuid::new_v4(),
            user.to_string(),
            None,
            SESSION_COLORS[0].to_string(),
        )
    }

    #[tokio::test]
    async fn join_snapshot_lists_only_peers() {
        let room = Room::new(Uuid::new_v4(), "body".to_string(), 1, Utc::now(), 16);
        let s1 = session("alice");
        let s2 = session("bob");

        match room.join(s1.clone()).await {
            ServerMessage::DocumentState { current_users, .. } => {
                assert!(current_users.is_empty());
            }
            other => panic!("unexpected snapshot: {:?}", other),
        }

        match room.join(s2).await {
            ServerMessage::DocumentState {
                content,
                version,
                current_users,
                ..
            } => {
                assert_eq!(content, "body");
                assert_eq!(version, 1);
                assert_eq!(current_users.len(), 1);
                assert_eq!(current_users[0].user_id, "alice");
            }
            other => panic!("unexpected snapshot: {:?}", other),
        }
    }

    #[tokio::test]
    async fn cursor_state_shows_up_in_later_snapshots() {
        let room = Room::new(Uuid::new_v4(), String::new(), 1, Utc::now(), 16);
        let s1 = session("alice");
        let s1_id = s1.socket_id;
        room.join(s1).await;
        room.update_cursor(s1_id, 42, None, Some("Alice".to_string()))
            .await;

        match room.join(session("bob")).await {
            ServerMessage::DocumentState { current_users, .. } => {
                assert_eq!(current_users[0].cursor, Some(42));
                assert_eq!(current_users[0].username.as_deref(), Some("Alice"));
            }
            other => panic!("unexpected snapshot: {:?}", other),
        }
    }

    #[tokio::test]
    async fn stale_revision_does_not_regress_cache() {
        let room = Room::new(Uuid::new_v4(), "v5".to_string(), 5, Utc::now(), 16);
        room.publish_content(Uuid::nil(), "alice", "old", 4, Utc::now())
            .await;
        let (body, revision) = room.cached_content().await;
        assert_eq!(body, "v5");
        assert_eq!(revision, 5);

        room.publish_content(Uuid::nil(), "alice", "v6", 6, Utc::now())
            .await;
        let (body, revision) = room.cached_content().await;
        assert_eq!(body, "v6");
        assert_eq!(revision, 6);
    }

    #[tokio::test]
    async fn subscribers_observe_events_in_one_order() {
        let room = Room::new(Uuid::new_v4(), String::new(), 1, Utc::now(), 16);
        let s1 = session("alice");
        let s1_id = s1.socket_id;
        let mut rx_a = room.subscribe();
        let mut rx_b = room.subscribe();
        room.join(s1).await;
        room.set_typing(s1_id, true).await;
        room.set_typing(s1_id, false).await;

        for rx in [&mut rx_a, &mut rx_b] {
            assert!(matches!(
                rx.recv().await.unwrap().message,
                ServerMessage::UserJoined { .. }
            ));
            assert!(matches!(
                rx.recv().await.unwrap().message,
                ServerMessage::TypingStart { .. }
            ));
            assert!(matches!(
                rx.recv().await.unwrap().message,
                ServerMessage::TypingStop { .. }
            ));
        }
    }
}
