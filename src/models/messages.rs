use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Selection range on the client editor; `start <= end`, byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRange {
    pub start: u64,
    pub end: u64,
}

/// One member of a room roster, as seen in snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub socket_id: Uuid,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionRange>,
    pub typing: bool,
}

/// Body-content push carried by a `document-change` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPush {
    pub new_content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Body-content notification carried by a `document-updated` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChange {
    pub new_content: String,
    pub version: i64,
    pub timestamp: String,
}

/// Messages accepted from clients on the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ClientMessage {
    #[serde(rename = "join-document", rename_all = "camelCase")]
    JoinDocument { document_id: Uuid, user_id: String },
    #[serde(rename = "leave-document", rename_all = "camelCase")]
    LeaveDocument { document_id: Uuid },
    #[serde(rename = "cursor-update", rename_all = "camelCase")]
    CursorUpdate {
        document_id: Uuid,
        user_id: String,
        position: u64,
        #[serde(default)]
        selection: Option<SelectionRange>,
        #[serde(default)]
        username: Option<String>,
    },
    #[serde(rename = "typing-start", rename_all = "camelCase")]
    TypingStart { document_id: Uuid, user_id: String },
    #[serde(rename = "typing-stop", rename_all = "camelCase")]
    TypingStop { document_id: Uuid, user_id: String },
    #[serde(rename = "document-change", rename_all = "camelCase")]
    DocumentChange {
        document_id: Uuid,
        user_id: String,
        change: ContentPush,
    },
}

/// Messages emitted to clients on the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ServerMessage {
    #[serde(rename = "document-state", rename_all = "camelCase")]
    DocumentState {
        content: String,
        version: i64,
        last_edited: String,
        current_users: Vec<RoomUser>,
    },
    #[serde(rename = "user-joined", rename_all = "camelCase")]
    UserJoined {
        user_id: String,
        socket_id: Uuid,
        timestamp: String,
    },
    #[serde(rename = "user-left", rename_all = "camelCase")]
    UserLeft { socket_id: Uuid, timestamp: String },
    #[serde(rename = "cursor-update", rename_all = "camelCase")]
    CursorUpdate {
        user_id: String,
        socket_id: Uuid,
        position: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        selection: Option<SelectionRange>,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    #[serde(rename = "typing-start", rename_all = "camelCase")]
    TypingStart { user_id: String, socket_id: Uuid },
    #[serde(rename = "typing-stop", rename_all = "camelCase")]
    TypingStop { user_id: String, socket_id: Uuid },
    #[serde(rename = "document-updated", rename_all = "camelCase")]
    DocumentUpdated {
        user_id: String,
        socket_id: Uuid,
        change: ContentChange,
    },
    #[serde(rename = "access-denied", rename_all = "camelCase")]
    AccessDenied { message: String },
    #[serde(rename = "error", rename_all = "camelCase")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_kinds_round_trip() {
        let doc_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"kind":"join-document","documentId":"{}","userId":"alice"}}"#,
            doc_id
        );
        match serde_json::from_str::<ClientMessage>(&raw).unwrap() {
            ClientMessage::JoinDocument {
                document_id,
                user_id,
            } => {
                assert_eq!(document_id, doc_id);
                assert_eq!(user_id, "alice");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn cursor_update_accepts_optional_fields() {
        let doc_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"kind":"cursor-update","documentId":"{}","userId":"alice","position":12}}"#,
            doc_id
        );
        match serde_json::from_str::<ClientMessage>(&raw).unwrap() {
            ClientMessage::CursorUpdate {
                position,
                selection,
                username,
                ..
            } => {
                assert_eq!(position, 12);
                assert!(selection.is_none());
                assert!(username.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn server_message_uses_kebab_kind() {
        let msg = ServerMessage::DocumentUpdated {
            user_id: "alice".to_string(),
            socket_id: Uuid::nil(),
            change: ContentChange {
                new_content: "abc".to_string(),
                version: 2,
                timestamp: "2026-01-01T00:00:00Z".to_string(),
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "document-updated");
        assert_eq!(json["change"]["newContent"], "abc");
        assert_eq!(json["change"]["version"], 2);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = r#"{"kind":"self-destruct"}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }
}
