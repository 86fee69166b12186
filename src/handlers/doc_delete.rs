use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::auth::Principal;
use crate::handlers::doc_get::parse_doc_id;
use crate::models::error::ApiError;
use crate::AppState;

/// Hard-delete a document. Only the owner may call; everyone else sees 404.
pub async fn doc_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(doc_id): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let doc_uuid = parse_doc_id(&doc_id)?;
    state.rate_limiter.check(&principal.user_id)?;

    let doc = state
        .store
        .get_document(doc_uuid)
        .await?
        .ok_or_else(|| ApiError::not_found("document not found"))?;

    if doc.owner_id != principal.user_id {
        return Err(ApiError::not_found("document not found"));
    }

    if !state.store.delete_document(doc_uuid).await? {
        return Err(ApiError::not_found("document not found"));
    }

    info!("User {} deleted document {}", principal.user_id, doc_uuid);
    Ok((StatusCode::OK, Json(json!({ "deleted": doc_uuid }))))
}
