use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::auth::Principal;
use crate::models::doc::{CreateDocumentRequest, DocumentRecord, DocumentResponse};
use crate::models::error::ApiError;
use crate::AppState;

/// Create a document. The caller becomes the owner and receives an implicit
/// owner binding.
pub async fn doc_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    state.rate_limiter.check(&principal.user_id)?;
    req.validate()?;

    let now = Utc::now();
    let doc = DocumentRecord {
        id: Uuid::new_v4(),
        title: req.title,
        description: req.description,
        content: req.content.unwrap_or_default(),
        tags: req.tags.unwrap_or_default(),
        is_public: req.is_public.unwrap_or(false),
        allow_comments: req.allow_comments.unwrap_or(true),
        allow_suggestions: req.allow_suggestions.unwrap_or(true),
        require_approval: req.require_approval.unwrap_or(false),
        owner_id: principal.user_id.clone(),
        revision: 1,
        created_at: now,
        updated_at: now,
        last_edited_at: now,
    };

    state.store.create_document(&doc).await?;
    info!("User {} created document {}", principal.user_id, doc.id);

    Ok((StatusCode::CREATED, Json(doc.into())))
}
