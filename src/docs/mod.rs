use crate::models::*;
use utoipa::OpenApi;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Create a document
#[utoipa::path(
    post,
    path = "/api/documents",
    tag = "documents",
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document created with owner binding", body = DocumentResponse),
        (status = 422, description = "Field constraint failed", body = ErrorBody),
        (status = 429, description = "Rate limited", body = ErrorBody)
    )
)]
#[allow(dead_code)]
pub async fn doc_create_doc() {}

/// List readable documents
#[utoipa::path(
    get,
    path = "/api/documents",
    tag = "documents",
    responses(
        (status = 200, description = "Documents readable by the caller", body = [DocumentResponse]),
        (status = 400, description = "Invalid query parameter", body = ErrorBody)
    ),
    params(
        ("search" = Option<String>, Query, description = "Title/description search term, 1-100 chars"),
        ("public" = Option<String>, Query, description = "Visibility filter, literal 'true' or 'false'"),
        ("limit" = Option<i64>, Query, description = "Page size, 1-100, default 10"),
        ("offset" = Option<i64>, Query, description = "Page offset, default 0")
    )
)]
#[allow(dead_code)]
pub async fn doc_list_doc() {}

/// Fetch a document
#[utoipa::path(
    get,
    path = "/api/documents/{doc_id}",
    tag = "documents",
    responses(
        (status = 200, description = "Document retrieved successfully", body = DocumentResponse),
        (status = 404, description = "Document missing or not readable", body = ErrorBody)
    ),
    params(
        ("doc_id" = String, Path, description = "Document ID")
    )
)]
#[allow(dead_code)]
pub async fn doc_get_doc() {}

/// Partially update a document
#[utoipa::path(
    put,
    path = "/api/documents/{doc_id}",
    tag = "documents",
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Document updated successfully", body = DocumentResponse),
        (status = 403, description = "Write access denied", body = ErrorBody),
        (status = 404, description = "Document missing or not readable", body = ErrorBody),
        (status = 429, description = "Rate limited", body = ErrorBody)
    ),
    params(
        ("doc_id" = String, Path, description = "Document ID")
    )
)]
#[allow(dead_code)]
pub async fn doc_update_doc() {}

/// Delete a document
#[utoipa::path(
    delete,
    path = "/api/documents/{doc_id}",
    tag = "documents",
    responses(
        (status = 200, description = "Document deleted"),
        (status = 404, description = "Document missing or caller is not the owner", body = ErrorBody),
        (status = 429, description = "Rate limited", body = ErrorBody)
    ),
    params(
        ("doc_id" = String, Path, description = "Document ID")
    )
)]
#[allow(dead_code)]
pub async fn doc_delete_doc() {}

/// Apply find-and-replace changes to a document
#[utoipa::path(
    post,
    path = "/api/documents/{doc_id}/changes",
    tag = "changes",
    request_body = ChangeRequestBody,
    responses(
        (status = 200, description = "Changes applied, new revision committed", body = ApplyChangesResponse),
        (status = 400, description = "Malformed request or no change matched", body = ErrorBody),
        (status = 403, description = "Write access denied", body = ErrorBody),
        (status = 404, description = "Document missing", body = ErrorBody),
        (status = 429, description = "Rate limited", body = ErrorBody)
    ),
    params(
        ("doc_id" = String, Path, description = "Document ID")
    )
)]
#[allow(dead_code)]
pub async fn doc_changes_doc() {}

/// Search documents
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "documents",
    responses(
        (status = 200, description = "Matching readable documents", body = [DocumentResponse]),
        (status = 400, description = "Invalid search term", body = ErrorBody)
    ),
    params(
        ("q" = String, Query, description = "Search term, 1-100 chars")
    )
)]
#[allow(dead_code)]
pub async fn doc_search_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        doc_create_doc,
        doc_list_doc,
        doc_get_doc,
        doc_update_doc,
        doc_delete_doc,
        doc_changes_doc,
        doc_search_doc,
    ),
    components(schemas(
        HealthResponse,
        ReadyResponse,
        ErrorBody,
        DocumentResponse,
        CreateDocumentRequest,
        UpdateDocumentRequest,
        ChangeRequestBody,
        ChangeOp,
        AppliedChange,
        ChangeSummary,
        ApplyChangesResponse,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "documents", description = "Document CRUD and search"),
        (name = "changes", description = "Find-and-replace change engine"),
    )
)]
pub struct ApiDoc;
