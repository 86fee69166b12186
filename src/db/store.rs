use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::models::binding::BindingRecord;
use crate::models::doc::DocumentRecord;
use crate::models::error::ApiError;

/// Kind of one applied text mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Insert,
    Delete,
    Replace,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Delete => "delete",
            OperationKind::Replace => "replace",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "insert" => Some(OperationKind::Insert),
            "delete" => Some(OperationKind::Delete),
            "replace" => Some(OperationKind::Replace),
            _ => None,
        }
    }
}

/// One applied mutation, before it is assigned a sequence number.
#[derive(Debug, Clone)]
pub struct NewOperation {
    pub kind: OperationKind,
    pub position: i64,
    pub length: i64,
    pub content: String,
}

/// Append-only log entry describing one applied text mutation.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub document_id: Uuid,
    pub seq: i64,
    pub kind: OperationKind,
    pub position: i64,
    pub length: i64,
    pub content: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// One analytics record summarizing a change request.
#[derive(Debug, Clone)]
pub struct AnalyticsRecord {
    pub document_id: Uuid,
    pub user_id: String,
    pub kind: String,
    pub metadata: Value,
}

/// Result of a committed body write.
#[derive(Debug, Clone, Copy)]
pub struct BodyCommit {
    pub revision: i64,
    pub updated_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

/// Partial update of document metadata (and optionally the body).
#[derive(Debug, Default, Clone)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub allow_comments: Option<bool>,
    pub allow_suggestions: Option<bool>,
    pub require_approval: Option<bool>,
}

/// Listing filter; `user_id` scopes visibility to readable documents.
#[derive(Debug, Clone)]
pub struct DocumentFilter {
    pub user_id: String,
    pub search: Option<String>,
    pub search_content: bool,
    pub public: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

/// Narrow persistence port for the mutation plane.
///
/// Implementable on any relational store with row-level locking and a UTF-8
/// text column. Body-mutating operations serialize per document through the
/// implementation's row locking; `commit_change` performs every persistence
/// step of a change request in one transaction.
#[async_trait]
pub trait DocStore: Send + Sync {
    /// Insert a document together with its implicit owner binding.
    async fn create_document(&self, doc: &DocumentRecord) -> Result<(), ApiError>;

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRecord>, ApiError>;

    /// Apply a partial update. A patch carrying `content` bumps the revision
    /// and the last-edit timestamp in the same transaction.
    async fn update_document(
        &self,
        id: Uuid,
        patch: &DocumentPatch,
    ) -> Result<Option<DocumentRecord>, ApiError>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete_document(&self, id: Uuid) -> Result<bool, ApiError>;

    /// List documents readable by `filter.user_id`.
    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRecord>, ApiError>;

    async fn get_binding(
        &self,
        document_id: Uuid,
        user_id: &str,
    ) -> Result<Option<BindingRecord>, ApiError>;

    /// Insert or replace the binding for (document, principal).
    async fn upsert_binding(&self, binding: &BindingRecord) -> Result<(), ApiError>;

    /// Commit a change request: replace the body, bump the revision, append
    /// one operation record per applied op with contiguous sequence numbers,
    /// and append one analytics record. All in one transaction.
    async fn commit_change(
        &self,
        document_id: Uuid,
        new_body: &str,
        user_id: &str,
        ops: &[NewOperation],
        analytics: &AnalyticsRecord,
    ) -> Result<BodyCommit, ApiError>;

    /// Replace the body and bump the revision in one transaction, without
    /// operation or analytics records. Used by the realtime content path.
    async fn update_body(
        &self,
        document_id: Uuid,
        new_body: &str,
        user_id: &str,
    ) -> Result<BodyCommit, ApiError>;
}
