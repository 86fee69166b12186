use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use syncdoc::auth::auth::Principal;
use syncdoc::db::memstore::MemStore;
use syncdoc::db::store::{DocStore, OperationKind};
use syncdoc::models::binding::{BindingRecord, Permission};
use syncdoc::models::change::ChangeRequestBody;
use syncdoc::models::doc::DocumentRecord;
use syncdoc::services::change_service::apply_changes;
use syncdoc::ws::registry::RoomRegistry;

fn principal(user: &str) -> Principal {
    Principal {
        user_id: user.to_string(),
        display_name: None,
    }
}

fn request(value: serde_json::Value) -> ChangeRequestBody {
    serde_json::from_value(value).expect("valid request body")
}

struct Harness {
    mem: Arc<MemStore>,
    store: Arc<dyn DocStore>,
    registry: RoomRegistry,
}

impl Harness {
    fn new() -> Self {
        let mem = Arc::new(MemStore::new());
        let store: Arc<dyn DocStore> = mem.clone();
        let registry = RoomRegistry::new(store.clone());
        Self {
            mem,
            store,
            registry,
        }
    }

    async fn seed(&self, owner: &str, body: &str, is_public: bool) -> Uuid {
        let now = Utc::now();
        let doc = DocumentRecord {
            id: Uuid::new_v4(),
            title: "Notes".to_string(),
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
        self.store.create_document(&doc).await.unwrap();
        doc.id
    }
}

#[tokio::test]
async fn single_change_by_owner() {
    let h = Harness::new();
    let doc_id = h.seed("alice", "I love reading books", false).await;

    let response = apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("alice"),
        request(json!({"textToReplace": "books", "newText": "emails"})),
    )
    .await
    .unwrap();

    assert_eq!(response.document_text, "I love reading emails");
    assert_eq!(response.changes.request_type, "single");
    assert_eq!(response.changes.applied_changes, 1);
    assert_eq!(response.changes.document_version, 2);

    let doc = h.store.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.content, "I love reading emails");
    assert_eq!(doc.revision, 2);

    let ops = h.mem.operations(doc_id);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].seq, 1);
    assert_eq!(ops[0].position, 15);
    assert_eq!(ops[0].length, 5);
    assert_eq!(ops[0].content, "emails");
    assert_eq!(ops[0].kind, OperationKind::Replace);
    assert_eq!(ops[0].user_id, "alice");
}

#[tokio::test]
async fn batch_with_one_miss() {
    let h = Harness::new();
    let doc_id = h.seed("alice", "Hello world", false).await;

    let response = apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("alice"),
        request(json!({"changes": [
            {"textToReplace": "Hello", "newText": "Hi"},
            {"textToReplace": "missing", "newText": "x"},
            {"textToReplace": "world", "newText": "universe"},
        ]})),
    )
    .await
    .unwrap();

    assert_eq!(response.document_text, "Hi universe");
    assert_eq!(response.changes.total_changes, 3);
    assert_eq!(response.changes.applied_changes, 2);

    let miss = response
        .changes
        .per_op
        .iter()
        .find(|op| op.text_replaced == "missing")
        .unwrap();
    assert!(!miss.applied);
    assert_eq!(miss.position, -1);

    assert_eq!(h.mem.operations(doc_id).len(), 2);
    let doc = h.store.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.revision, 2);
}

#[tokio::test]
async fn batch_with_overlapping_targets_applies_right_to_left() {
    let h = Harness::new();
    let doc_id = h.seed("alice", "Hello world", false).await;

    let response = apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("alice"),
        request(json!({"changes": [
            {"textToReplace": "Hello world", "newText": "Hi universe"},
            {"textToReplace": "Hello", "newText": "Hi"},
            {"textToReplace": "world", "newText": "universe"},
        ]})),
    )
    .await
    .unwrap();

    // "world" (pos 6) applies first, then "Hello world" no longer matches,
    // then "Hello" applies at 0.
    assert_eq!(response.document_text, "Hi universe");
    assert_eq!(response.changes.applied_changes, 2);

    let whole_line = response
        .changes
        .per_op
        .iter()
        .find(|op| op.text_replaced == "Hello world")
        .unwrap();
    assert!(!whole_line.applied);
}

#[tokio::test]
async fn zero_applied_ops_fail_without_side_effects() {
    let h = Harness::new();
    let doc_id = h.seed("alice", "Hello", false).await;

    let err = apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("alice"),
        request(json!({"textToReplace": "foo", "newText": "bar"})),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status().as_u16(), 400);

    let doc = h.store.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.content, "Hello");
    assert_eq!(doc.revision, 1);
    assert!(h.mem.operations(doc_id).is_empty());
    assert!(h.mem.analytics().is_empty());
}

#[tokio::test]
async fn public_document_writable_by_authenticated_stranger() {
    let h = Harness::new();
    let doc_id = h.seed("alice", "open document", true).await;

    let response = apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("bob"),
        request(json!({"textToReplace": "open", "newText": "shared"})),
    )
    .await
    .unwrap();

    assert_eq!(response.document_text, "shared document");

    let analytics = h.mem.analytics();
    assert_eq!(analytics.len(), 1);
    assert_eq!(analytics[0].user_id, "bob");
    assert_eq!(analytics[0].kind, "single");
}

#[tokio::test]
async fn explicit_viewer_binding_denies_write_despite_public_flag() {
    let h = Harness::new();
    let doc_id = h.seed("alice", "open document", true).await;
    h.store
        .upsert_binding(&BindingRecord {
            document_id: doc_id,
            user_id: "bob".to_string(),
            permission: Permission::Viewer,
            active: true,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let err = apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("bob"),
        request(json!({"textToReplace": "open", "newText": "shared"})),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status().as_u16(), 403);
    let doc = h.store.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.content, "open document");
    assert_eq!(doc.revision, 1);
}

#[tokio::test]
async fn missing_document_is_404() {
    let h = Harness::new();
    let err = apply_changes(
        h.store.clone(),
        &h.registry,
        Uuid::new_v4(),
        &principal("alice"),
        request(json!({"textToReplace": "a", "newText": "b"})),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status().as_u16(), 404);
}

#[tokio::test]
async fn sequences_stay_contiguous_across_requests() {
    let h = Harness::new();
    let doc_id = h.seed("alice", "one two three four", false).await;

    apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("alice"),
        request(json!({"changes": [
            {"textToReplace": "one", "newText": "1"},
            {"textToReplace": "two", "newText": "2"},
        ]})),
    )
    .await
    .unwrap();

    apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("alice"),
        request(json!({"textToReplace": "three", "newText": "3"})),
    )
    .await
    .unwrap();

    let seqs: Vec<i64> = h.mem.operations(doc_id).iter().map(|op| op.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);

    let doc = h.store.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.revision, 3);
    assert_eq!(doc.content, "1 2 3 four");
}

#[tokio::test]
async fn applied_count_matches_operation_records() {
    let h = Harness::new();
    let doc_id = h.seed("alice", "alpha beta gamma", false).await;

    let response = apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("alice"),
        request(json!({"changes": [
            {"textToReplace": "alpha", "newText": "a"},
            {"textToReplace": "nope", "newText": "n"},
            {"textToReplace": "gamma", "newText": "g"},
        ]})),
    )
    .await
    .unwrap();

    assert_eq!(
        response.changes.applied_changes,
        h.mem.operations(doc_id).len()
    );
}

#[tokio::test]
async fn mixed_shape_request_is_rejected_without_side_effects() {
    let h = Harness::new();
    let doc_id = h.seed("alice", "Hello", false).await;

    let err = apply_changes(
        h.store.clone(),
        &h.registry,
        doc_id,
        &principal("alice"),
        request(json!({
            "changes": [{"textToReplace": "Hello", "newText": "Hi"}],
            "textToReplace": "Hello",
            "newText": "Hi",
        })),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status().as_u16(), 400);
    let doc = h.store.get_document(doc_id).await.unwrap().unwrap();
    assert_eq!(doc.revision, 1);
}
