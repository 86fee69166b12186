use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::auth::Principal;
use crate::db::store::DocumentFilter;
use crate::models::doc::{DocumentResponse, ListDocumentsQuery};
use crate::models::error::ApiError;
use crate::AppState;

/// List documents readable by the caller, optionally filtered by a title or
/// description search term and the public flag.
pub async fn doc_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<(StatusCode, Json<Vec<DocumentResponse>>), ApiError> {
    let params = query.validate()?;

    let filter = DocumentFilter {
        user_id: principal.user_id.clone(),
        search: params.search,
        search_content: false,
        public: params.public,
        limit: params.limit,
        offset: params.offset,
    };

    let docs = state.store.list_documents(&filter).await?;
    Ok((
        StatusCode::OK,
        Json(docs.into_iter().map(DocumentResponse::from).collect()),
    ))
}
