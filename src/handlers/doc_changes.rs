use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::auth::Principal;
use crate::handlers::doc_get::parse_doc_id;
use crate::models::change::{ApplyChangesResponse, ChangeRequestBody};
use crate::models::error::ApiError;
use crate::services::change_service;
use crate::AppState;

/// Apply a single change or a batch of changes to a document body.
pub async fn doc_changes(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(doc_id): Path<String>,
    Json(body): Json<ChangeRequestBody>,
) -> Result<(StatusCode, Json<ApplyChangesResponse>), ApiError> {
    let doc_uuid = parse_doc_id(&doc_id)?;
    state.rate_limiter.check(&principal.user_id)?;

    let response = change_service::apply_changes(
        state.store.clone(),
        &state.registry,
        doc_uuid,
        &principal,
        body,
    )
    .await?;

    Ok((StatusCode::OK, Json(response)))
}
