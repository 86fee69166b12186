use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::auth::Principal;
use crate::db::store::DocumentFilter;
use crate::models::doc::{validate_search_term, DocumentResponse};
use crate::models::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Substring search across title, description, and body of documents the
/// caller may read.
pub async fn doc_search(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<SearchQuery>,
) -> Result<(StatusCode, Json<Vec<DocumentResponse>>), ApiError> {
    let q = query
        .q
        .ok_or_else(|| ApiError::bad_request("query parameter 'q' is required"))?;
    validate_search_term(&q)?;

    let filter = DocumentFilter {
        user_id: principal.user_id.clone(),
        search: Some(q),
        search_content: true,
        public: None,
        limit: 10,
        offset: 0,
    };

    let docs = state.store.list_documents(&filter).await?;
    Ok((
        StatusCode::OK,
        Json(docs.into_iter().map(DocumentResponse::from).collect()),
    ))
}
