use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::auth::auth::Principal;
use crate::db::store::DocStore;
use crate::models::doc::{DocumentRecord, MAX_BODY_BYTES};
use crate::models::error::ApiError;
use crate::models::messages::ServerMessage;
use crate::services::access_service;
use crate::ws::room::{Room, RoomEvent, SessionState, SESSION_COLORS};

const ROOM_CHANNEL_CAPACITY: usize = 256;

/// Process-wide registry of active document rooms.
///
/// Rooms are created lazily on the first join, seeded from the persistence
/// port, and destroyed when the last session leaves. The port stays the
/// single source of truth: a room re-reads the document whenever it is
/// (re)created.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<Uuid, Arc<Room>>>,
    store: Arc<dyn DocStore>,
    color_seq: AtomicUsize,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn DocStore>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            store,
            color_seq: AtomicUsize::new(0),
        }
    }

    /// Join a session to a document's room.
    ///
    /// Performs the point-in-time read access check, creates the room if
    /// needed, and returns the room, the session's event receiver, and the
    /// `document-state` snapshot. Subsequent messages are not re-checked.
    pub async fn join(
        &self,
        document_id: Uuid,
        principal: &Principal,
        socket_id: Uuid,
        username: Option<String>,
    ) -> Result<(Arc<Room>, broadcast::Receiver<RoomEvent>, ServerMessage), ApiError> {
        let doc = self
            .store
            .get_document(document_id)
            .await?
            .ok_or_else(|| ApiError::not_found("document not found"))?;

        access_service::check_read(self.store.as_ref(), &doc, &principal.user_id).await?;

        let room = self.get_or_create(&doc).await;
        let rx = room.subscribe();

        let color = SESSION_COLORS[self.color_seq.fetch_add(1, Ordering::Relaxed) % SESSION_COLORS.len()];
        let session = SessionState::new(
            socket_id,
            principal.user_id.clone(),
            username.or_else(|| principal.display_name.clone()),
            color.to_string(),
        );
        let snapshot = room.join(session).await;

        info!(
            "Session {} ({}) joined room {}",
            socket_id, principal.user_id, document_id
        );
        Ok((room, rx, snapshot))
    }

    /// Remove a session from a room, destroying the room when it empties.
    pub async fn leave(&self, document_id: Uuid, socket_id: Uuid) {
        let room = { self.rooms.read().await.get(&document_id).cloned() };
        let Some(room) = room else {
            return;
        };
        let remaining = room.leave(socket_id).await;
        info!(
            "Session {} left room {} ({} remaining)",
            socket_id, document_id, remaining
        );
        if remaining == 0 {
            self.remove_if_empty(document_id).await;
        }
    }

    /// Write a realtime content push through the persistence port, then fan
    /// the committed body out to the room. The port transaction is the
    /// serialization point between this path and the change engine.
    pub async fn push_content(
        &self,
        room: &Arc<Room>,
        socket_id: Uuid,
        user_id: &str,
        new_content: String,
    ) -> Result<(), ApiError> {
        if new_content.len() > MAX_BODY_BYTES {
            return Err(ApiError::validation(format!(
                "document body exceeds {} bytes",
                MAX_BODY_BYTES
            )));
        }
        let commit = self
            .store
            .update_body(room.doc_id, &new_content, user_id)
            .await?;
        room.publish_content(
            socket_id,
            user_id,
            &new_content,
            commit.revision,
            commit.last_edited_at,
        )
        .await;
        Ok(())
    }

    /// Fan a change-engine commit out to the document's room, if one is
    /// live. The nil sender matches no session, so every peer receives it.
    pub async fn publish_update(
        &self,
        document_id: Uuid,
        user_id: &str,
        body: &str,
        revision: i64,
        timestamp: DateTime<Utc>,
    ) {
        let room = { self.rooms.read().await.get(&document_id).cloned() };
        if let Some(room) = room {
            room.publish_content(Uuid::nil(), user_id, body, revision, timestamp)
                .await;
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    async fn get_or_create(&self, doc: &DocumentRecord) -> Arc<Room> {
        // Fast path: read lock
        {
            let rooms = self.rooms.read().await;
            if let Some(room) = rooms.get(&doc.id) {
                return room.clone();
            }
        }

        // Slow path: write lock to create
        let mut rooms = self.rooms.write().await;
        // Double-check after acquiring write lock
        if let Some(room) = rooms.get(&doc.id) {
            return room.clone();
        }

        let room = Arc::new(Room::new(
            doc.id,
            doc.content.clone(),
            doc.revision,
            doc.last_edited_at,
            ROOM_CHANNEL_CAPACITY,
        ));
        rooms.insert(doc.id, room.clone());
        info!("Room created for document {}", doc.id);
        room
    }

    async fn remove_if_empty(&self, document_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(&document_id) {
            if room.session_count().await == 0 {
                rooms.remove(&document_id);
                info!("Room removed for document {} (empty)", document_id);
            }
        }
    }
}
