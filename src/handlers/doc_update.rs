use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::auth::auth::Principal;
use crate::db::store::DocumentPatch;
use crate::handlers::doc_get::parse_doc_id;
use crate::models::doc::{DocumentResponse, UpdateDocumentRequest};
use crate::models::error::ApiError;
use crate::services::access_service;
use crate::AppState;

/// Partially update a document. A patch carrying `content` bumps the
/// revision in the same transaction as the body write.
pub async fn doc_update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(doc_id): Path<String>,
    Json(req): Json<UpdateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let doc_uuid = parse_doc_id(&doc_id)?;
    state.rate_limiter.check(&principal.user_id)?;
    req.validate()?;

    let doc = state
        .store
        .get_document(doc_uuid)
        .await?
        .ok_or_else(|| ApiError::not_found("document not found"))?;

    access_service::check_write(state.store.as_ref(), &doc, &principal.user_id).await?;

    let patch = DocumentPatch {
        title: req.title,
        description: req.description,
        content: req.content,
        tags: req.tags,
        is_public: req.is_public,
        allow_comments: req.allow_comments,
        allow_suggestions: req.allow_suggestions,
        require_approval: req.require_approval,
    };
    let had_content = patch.content.is_some();

    let updated = state
        .store
        .update_document(doc_uuid, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("document not found"))?;

    if had_content {
        state
            .registry
            .publish_update(
                doc_uuid,
                &principal.user_id,
                &updated.content,
                updated.revision,
                updated.last_edited_at,
            )
            .await;
    }

    info!("User {} updated document {}", principal.user_id, doc_uuid);
    Ok((StatusCode::OK, Json(updated.into())))
}
