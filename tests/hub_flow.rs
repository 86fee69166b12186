use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

use syncdoc::auth::auth::Principal;
use syncdoc::db::memstore::MemStore;
use syncdoc::db::store::DocStore;
use syncdoc::models::doc::DocumentRecord;
use syncdoc::models::messages::ServerMessage;
use syncdoc::ws::registry::RoomRegistry;
use syncdoc::ws::room::RoomEvent;

fn principal(user: &str) -> Principal {
    Principal {
        user_id: user.to_string(),
        display_name: None,
    }
}

async fn seed(store: &dyn DocStore, owner: &str, body: &str, is_public: bool) -> Uuid {
    let now = Utc::now();
    let doc = DocumentRecord {
        id: Uuid::new_v4(),
        title: "Shared".to_string(),
        description: None,
        content: body.to_string(),
        tags: vec![],
        is_public,
        allow_comments: true,
        allow_suggestions: true,
        require_approval: false,
        owner_id: owner.to_string(),
        revision: 1,
        created_at: now,
        updated_at: now,
        last_edited_at: now,
    };
    store.create_document(&doc).await.unwrap();
    doc.id
}

/// Drain events until one passes the echo filter for `socket_id`, exactly
/// the way the connection task does.
async fn next_delivered(
    rx: &mut tokio::sync::broadcast::Receiver<RoomEvent>,
    socket_id: Uuid,
) -> ServerMessage {
    loop {
        let event = rx.recv().await.unwrap();
        if event.sender != socket_id {
            return event.message;
        }
    }
}

#[tokio::test]
async fn content_broadcast_reaches_peer_exactly_once() {
    let store: Arc<dyn DocStore> = Arc::new(MemStore::new());
    let registry = RoomRegistry::new(store.clone());
    let doc_id = seed(store.as_ref(), "alice", "", true).await;

    let s1 = Uuid::new_v4();
    let s2 = Uuid::new_v4();
    let (room1, mut rx1, snap1) = registry
        .join(doc_id, &principal("alice"), s1, None)
        .await
        .unwrap();
    let (_room2, mut rx2, snap2) = registry
        .join(doc_id, &principal("bob"), s2, None)
        .await
        .unwrap();

    // Both joiners get the snapshot of the empty seeded body
    for snapshot in [&snap1, &snap2] {
        match snapshot {
            ServerMessage::DocumentState {
                content, version, ..
            } => {
                assert_eq!(content, "");
                assert_eq!(*version, 1);
            }
            other => panic!("unexpected snapshot: {:?}", other),
        }
    }

    // C1 first observes C2's arrival
    match next_delivered(&mut rx1, s1).await {
        ServerMessage::UserJoined { user_id, .. } => assert_eq!(user_id, "bob"),
        other => panic!("unexpected message: {:?}", other),
    }

    registry
        .push_content(&room1, s1, "alice", "abc".to_string())
        .await
        .unwrap();

    // C2 observes the update exactly once
    match next_delivered(&mut rx2, s2).await {
        ServerMessage::DocumentUpdated { user_id, change, .. } => {
            assert_eq!(user_id, "alice");
            assert_eq!(change.new_content, "abc");
            assert_eq!(change.version, 2);
        }
        other => panic!("unexpected message: {:?}", other),
    }
    assert!(matches!(rx2.try_recv(), Err(TryRecvError::Empty)));

    // C1 only sees its own echo, which the connection task filters out
    loop {
        match rx1.try_recv() {
            Ok(event) => assert_eq!(event.sender, s1, "unexpected foreign event for sender"),
            Err(TryRecvError::Empty) => break,
            Err(e) => panic!("broadcast error: {:?}", e),
        }
    }

    // The persistence port holds the committed body and revision
    let doc = store.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.content, "abc");
    assert_eq!(doc.revision, 2);
}

#[tokio::test]
async fn peers_are_told_about_joins_and_leaves() {
    let store: Arc<dyn DocStore> = Arc::new(MemStore::new());
    let registry = RoomRegistry::new(store.clone());
    let doc_id = seed(store.as_ref(), "alice", "seed", true).await;

    let s1 = Uuid::new_v4();
    let s2 = Uuid::new_v4();
    let (_room1, mut rx1, _) = registry
        .join(doc_id, &principal("alice"), s1, None)
        .await
        .unwrap();
    registry
        .join(doc_id, &principal("bob"), s2, None)
        .await
        .unwrap();

    match next_delivered(&mut rx1, s1).await {
        ServerMessage::UserJoined {
            user_id, socket_id, ..
        } => {
            assert_eq!(user_id, "bob");
            assert_eq!(socket_id, s2);
        }
        other => panic!("unexpected message: {:?}", other),
    }

    registry.leave(doc_id, s2).await;
    match next_delivered(&mut rx1, s1).await {
        ServerMessage::UserLeft { socket_id, .. } => assert_eq!(socket_id, s2),
        other => panic!("unexpected message: {:?}", other),
    }
}

#[tokio::test]
async fn rooms_are_created_lazily_and_destroyed_when_empty() {
    let store: Arc<dyn DocStore> = Arc::new(MemStore::new());
    let registry = RoomRegistry::new(store.clone());
    let doc_id = seed(store.as_ref(), "alice", "seed", true).await;

    assert_eq!(registry.room_count().await, 0);

    let s1 = Uuid::new_v4();
    let s2 = Uuid::new_v4();
    registry
        .join(doc_id, &principal("alice"), s1, None)
        .await
        .unwrap();
    registry
        .join(doc_id, &principal("bob"), s2, None)
        .await
        .unwrap();
    assert_eq!(registry.room_count().await, 1);

    registry.leave(doc_id, s1).await;
    assert_eq!(registry.room_count().await, 1);
    registry.leave(doc_id, s2).await;
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test]
async fn join_is_denied_on_private_documents() {
    let store: Arc<dyn DocStore> = Arc::new(MemStore::new());
    let registry = RoomRegistry::new(store.clone());
    let doc_id = seed(store.as_ref(), "alice", "secret", false).await;

    let err = registry
        .join(doc_id, &principal("mallory"), Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 404);
    assert_eq!(registry.room_count().await, 0);
}

#[tokio::test]
async fn rejoin_seeds_room_from_persistence_port() {
    let store: Arc<dyn DocStore> = Arc::new(MemStore::new());
    let registry = RoomRegistry::new(store.clone());
    let doc_id = seed(store.as_ref(), "alice", "", true).await;

    let s1 = Uuid::new_v4();
    let (room1, _rx1, _) = registry
        .join(doc_id, &principal("alice"), s1, None)
        .await
        .unwrap();
    registry
        .push_content(&room1, s1, "alice", "persisted text".to_string())
        .await
        .unwrap();
    registry.leave(doc_id, s1).await;
    assert_eq!(registry.room_count().await, 0);

    // The fresh room re-reads the document, not a stale cache
    let (_room2, _rx2, snapshot) = registry
        .join(doc_id, &principal("bob"), Uuid::new_v4(), None)
        .await
        .unwrap();
    match snapshot {
        ServerMessage::DocumentState {
            content, version, ..
        } => {
            assert_eq!(content, "persisted text");
            assert_eq!(version, 2);
        }
        other => panic!("unexpected snapshot: {:?}", other),
    }
}

#[tokio::test]
async fn engine_commits_fan_out_to_live_rooms() {
    let store: Arc<dyn DocStore> = Arc::new(MemStore::new());
    let registry = RoomRegistry::new(store.clone());
    let doc_id = seed(store.as_ref(), "alice", "draft", true).await;

    let s1 = Uuid::new_v4();
    let (_room, mut rx1, _) = registry
        .join(doc_id, &principal("alice"), s1, None)
        .await
        .unwrap();

    registry
        .publish_update(doc_id, "bob", "draft v2", 2, Utc::now())
        .await;

    match next_delivered(&mut rx1, s1).await {
        ServerMessage::DocumentUpdated { user_id, change, .. } => {
            assert_eq!(user_id, "bob");
            assert_eq!(change.new_content, "draft v2");
            assert_eq!(change.version, 2);
        }
        other => panic!("unexpected message: {:?}", other),
    }
}

#[tokio::test]
async fn oversized_content_push_is_rejected() {
    let store: Arc<dyn DocStore> = Arc::new(MemStore::new());
    let registry = RoomRegistry::new(store.clone());
    let doc_id = seed(store.as_ref(), "alice", "", true).await;

    let s1 = Uuid::new_v4();
    let (room, _rx, _) = registry
        .join(doc_id, &principal("alice"), s1, None)
        .await
        .unwrap();

    let huge = "x".repeat(1_000_001);
    let err = registry
        .push_content(&room, s1, "alice", huge)
        .await
        .unwrap_err();
    assert_eq!(err.status().as_u16(), 422);

    let doc = store.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.revision, 1);
}
