use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use tracing::error;
use uuid::Uuid;

use crate::auth::auth::Principal;
use crate::models::doc::DocumentResponse;
use crate::models::error::ApiError;
use crate::services::access_service;
use crate::AppState;

/// Fetch a document. Missing and unreadable documents are both 404.
pub async fn doc_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(doc_id): Path<String>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let doc_uuid = parse_doc_id(&doc_id)?;

    let doc = state
        .store
        .get_document(doc_uuid)
        .await?
        .ok_or_else(|| ApiError::not_found("document not found"))?;

    access_service::check_read(state.store.as_ref(), &doc, &principal.user_id).await?;

    Ok((StatusCode::OK, Json(doc.into())))
}

/// Parse a path segment as a document UUID
pub fn parse_doc_id(doc_id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(doc_id).map_err(|e| {
        error!("Invalid document UUID '{}': {}", doc_id, e);
        ApiError::bad_request(format!("Invalid document UUID '{}'", doc_id))
    })
}
