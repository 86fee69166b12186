use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::auth::Principal;
use crate::db::store::{AnalyticsRecord, DocStore, NewOperation, OperationKind};
use crate::models::change::{
    AppliedChange, ApplyChangesResponse, ChangeOp, ChangeRequestBody, ChangeSummary,
};
use crate::models::doc::MAX_BODY_BYTES;
use crate::models::error::ApiError;
use crate::services::access_service;
use crate::ws::registry::RoomRegistry;

/// An op with its first-occurrence position in the original body, used to
/// establish the right-to-left application order.
#[derive(Debug, Clone)]
struct PlannedOp {
    op: ChangeOp,
    initial_position: i64,
}

/// Result of walking the planned ops over the working copy.
#[derive(Debug)]
struct WalkOutcome {
    new_body: String,
    per_op: Vec<AppliedChange>,
    records: Vec<NewOperation>,
}

/// Order ops by their first occurrence in the original body, descending,
/// keeping the input order on ties. Targets absent from the original body
/// sort as -1 and therefore run last.
fn plan_ops(body: &str, ops: Vec<ChangeOp>) -> Vec<PlannedOp> {
    let mut planned: Vec<PlannedOp> = ops
        .into_iter()
        .map(|op| {
            let initial_position = body
                .find(&op.text_to_replace)
                .map(|p| p as i64)
                .unwrap_or(-1);
            PlannedOp {
                op,
                initial_position,
            }
        })
        .collect();
    // Stable sort keeps input order on equal positions
    planned.sort_by(|a, b| b.initial_position.cmp(&a.initial_position));
    planned
}

/// Walk the planned ops against a mutable working copy. Each op searches the
/// working copy's current state for its first occurrence; misses are marked
/// not-applied with position -1.
fn apply_planned(body: &str, planned: &[PlannedOp]) -> WalkOutcome {
    let mut working = body.to_string();
    let mut per_op = Vec::with_capacity(planned.len());
    let mut records = Vec::new();

    for p in planned {
        match working.find(&p.op.text_to_replace) {
            Some(pos) => {
                working.replace_range(pos..pos + p.op.text_to_replace.len(), &p.op.new_text);
                per_op.push(AppliedChange {
                    text_replaced: p.op.text_to_replace.clone(),
                    new_text: p.op.new_text.clone(),
                    position: pos as i64,
                    applied: true,
                });
                records.push(NewOperation {
                    kind: operation_kind(&p.op),
                    position: pos as i64,
                    length: p.op.text_to_replace.len() as i64,
                    content: p.op.new_text.clone(),
                });
            }
            None => per_op.push(AppliedChange {
                text_replaced: p.op.text_to_replace.clone(),
                new_text: p.op.new_text.clone(),
                position: -1,
                applied: false,
            }),
        }
    }

    WalkOutcome {
        new_body: working,
        per_op,
        records,
    }
}

fn operation_kind(op: &ChangeOp) -> OperationKind {
    if op.text_to_replace.is_empty() {
        OperationKind::Insert
    } else if op.new_text.is_empty() {
        OperationKind::Delete
    } else {
        OperationKind::Replace
    }
}

/// Validate, authorize, and apply a change request, producing a new durable
/// revision and notifying the document's room of the new content.
///
/// # Arguments
/// * `store` - Persistence port
/// * `registry` - Room registry used to fan out the committed content
/// * `document_id` - Target document UUID
/// * `principal` - Authenticated caller
/// * `body` - Raw request body (single or batch shape)
pub async fn apply_changes(
    store: Arc<dyn DocStore>,
    registry: &RoomRegistry,
    document_id: Uuid,
    principal: &Principal,
    body: ChangeRequestBody,
) -> Result<ApplyChangesResponse, ApiError> {
    let request = body.into_request()?;
    let request_type = request.request_type();
    let ops = request.ops();
    let total_changes = ops.len();

    let doc = store
        .get_document(document_id)
        .await?
        .ok_or_else(|| ApiError::not_found("document not found"))?;

    access_service::check_write(store.as_ref(), &doc, &principal.user_id).await?;

    let planned = plan_ops(&doc.content, ops);
    let outcome = apply_planned(&doc.content, &planned);
    let applied_changes = outcome.records.len();

    if applied_changes == 0 {
        info!(
            "No change matched document {} ({} requested)",
            document_id, total_changes
        );
        return Err(ApiError::bad_request("no requested change matched the document text")
            .with_details(json!({
                "requestType": request_type,
                "totalChanges": total_changes,
            })));
    }

    if outcome.new_body.len() > MAX_BODY_BYTES {
        return Err(ApiError::validation(format!(
            "resulting document body exceeds {} bytes",
            MAX_BODY_BYTES
        )));
    }

    let analytics = AnalyticsRecord {
        document_id,
        user_id: principal.user_id.clone(),
        kind: request_type.to_string(),
        metadata: json!({
            "requestType": request_type,
            "totalChanges": total_changes,
            "appliedChanges": applied_changes,
            "perOp": &outcome.per_op,
        }),
    };

    // Detached so a client disconnect cannot cancel the transaction
    // mid-flight; it commits or rolls back on its own outcome.
    let commit = {
        let store = store.clone();
        let new_body = outcome.new_body.clone();
        let user_id = principal.user_id.clone();
        let records = outcome.records.clone();
        tokio::spawn(async move {
            store
                .commit_change(document_id, &new_body, &user_id, &records, &analytics)
                .await
        })
        .await
        .map_err(|e| ApiError::internal(format!("change commit task failed: {e}")))??
    };

    info!(
        "User {} applied {}/{} changes to document {} (revision {})",
        principal.user_id, applied_changes, total_changes, document_id, commit.revision
    );

    registry
        .publish_update(
            document_id,
            &principal.user_id,
            &outcome.new_body,
            commit.revision,
            commit.last_edited_at,
        )
        .await;

    Ok(ApplyChangesResponse {
        document_text: outcome.new_body,
        changes: ChangeSummary {
            request_type: request_type.to_string(),
            total_changes,
            applied_changes,
            per_op: outcome.per_op,
            document_version: commit.revision,
        },
    })
}
