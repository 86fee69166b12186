use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::db::store::{
    AnalyticsRecord, BodyCommit, DocStore, DocumentFilter, DocumentPatch, NewOperation,
    OperationRecord,
};
use crate::models::binding::BindingRecord;
use crate::models::doc::DocumentRecord;
use crate::models::error::ApiError;

/// In-memory document store.
///
/// Used by the test suite and as the dev fallback when no database URL is
/// configured. Nothing survives a restart. A single mutex plays the role of
/// the database's row locking, which is stricter but observationally
/// equivalent for the revision-monotonicity contract.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<MemState>,
}

#[derive(Default)]
struct MemState {
    docs: HashMap<Uuid, DocumentRecord>,
    bindings: HashMap<(Uuid, String), BindingRecord>,
    operations: HashMap<Uuid, Vec<OperationRecord>>,
    analytics: Vec<AnalyticsRecord>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operation log of a document, oldest first. Test inspection hook.
    pub fn operations(&self, document_id: Uuid) -> Vec<OperationRecord> {
        let state = self.inner.lock().unwrap();
        state
            .operations
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }

    /// All analytics records, oldest first. Test inspection hook.
    pub fn analytics(&self) -> Vec<AnalyticsRecord> {
        self.inner.lock().unwrap().analytics.clone()
    }
}

fn matches_filter(doc: &DocumentRecord, filter: &DocumentFilter, has_binding: bool) -> bool {
    let readable = doc.owner_id == filter.user_id || doc.is_public || has_binding;
    if !readable {
        return false;
    }
    if let Some(public) = filter.public {
        if doc.is_public != public {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let in_title = doc.title.to_lowercase().contains(&needle);
        let in_description = doc
            .description
            .as_deref()
            .map(|d| d.to_lowercase().contains(&needle))
            .unwrap_or(false);
        let in_content = filter.search_content && doc.content.to_lowercase().contains(&needle);
        if !(in_title || in_description || in_content) {
            return false;
        }
    }
    true
}

#[async_trait]
impl DocStore for MemStore {
    async fn create_document(&self, doc: &DocumentRecord) -> Result<(), ApiError> {
        let mut state = self.inner.lock().unwrap();
        if state.docs.contains_key(&doc.id) {
            return Err(ApiError::conflict("document already exists"));
        }
        state.bindings.insert(
            (doc.id, doc.owner_id.clone()),
            BindingRecord {
                document_id: doc.id,
                user_id: doc.owner_id.clone(),
                permission: crate::models::binding::Permission::Owner,
                active: true,
                created_at: doc.created_at,
            },
        );
        state.docs.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRecord>, ApiError> {
        Ok(self.inner.lock().unwrap().docs.get(&id).cloned())
    }

    async fn update_document(
        &self,
        id: Uuid,
        patch: &DocumentPatch,
    ) -> Result<Option<DocumentRecord>, ApiError> {
        let mut state = self.inner.lock().unwrap();
        let Some(doc) = state.docs.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            doc.title = title.clone();
        }
        if let Some(description) = &patch.description {
            doc.description = Some(description.clone());
        }
        if let Some(tags) = &patch.tags {
            doc.tags = tags.clone();
        }
        if let Some(is_public) = patch.is_public {
            doc.is_public = is_public;
        }
        if let Some(allow_comments) = patch.allow_comments {
            doc.allow_comments = allow_comments;
        }
        if let Some(allow_suggestions) = patch.allow_suggestions {
            doc.allow_suggestions = allow_suggestions;
        }
        if let Some(require_approval) = patch.require_approval {
            doc.require_approval = require_approval;
        }
        let now = Utc::now();
        if let Some(content) = &patch.content {
            doc.content = content.clone();
            doc.revision += 1;
            doc.last_edited_at = now;
        }
        doc.updated_at = now;
        Ok(Some(doc.clone()))
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut state = self.inner.lock().unwrap();
        let removed = state.docs.remove(&id).is_some();
        if removed {
            state.bindings.retain(|(doc_id, _), _| *doc_id != id);
            state.operations.remove(&id);
        }
        Ok(removed)
    }

    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<DocumentRecord>, ApiError> {
        let state = self.inner.lock().unwrap();
        let mut docs: Vec<DocumentRecord> = state
            .docs
            .values()
            .filter(|doc| {
                let has_binding = state
                    .bindings
                    .get(&(doc.id, filter.user_id.clone()))
                    .map(|b| b.active)
                    .unwrap_or(false);
                matches_filter(doc, filter, has_binding)
            })
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(docs
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn get_binding(
        &self,
        document_id: Uuid,
        user_id: &str,
    ) -> Result<Option<BindingRecord>, ApiError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bindings
            .get(&(document_id, user_id.to_string()))
            .cloned())
    }

    async fn upsert_binding(&self, binding: &BindingRecord) -> Result<(), ApiError> {
        self.inner.lock().unwrap().bindings.insert(
            (binding.document_id, binding.user_id.clone()),
            binding.clone(),
        );
        Ok(())
    }

    async fn commit_change(
        &self,
        document_id: Uuid,
        new_body: &str,
        user_id: &str,
        ops: &[NewOperation],
        analytics: &AnalyticsRecord,
    ) -> Result<BodyCommit, ApiError> {
        let mut state = self.inner.lock().unwrap();
        let Some(doc) = state.docs.get_mut(&document_id) else {
            return Err(ApiError::not_found("document not found"));
        };
        let now = Utc::now();
        doc.content = new_body.to_string();
        doc.revision += 1;
        doc.updated_at = now;
        doc.last_edited_at = now;
        let commit = BodyCommit {
            revision: doc.revision,
            updated_at: now,
            last_edited_at: now,
        };

        let log = state.operations.entry(document_id).or_default();
        let mut seq = log.last().map(|op| op.seq).unwrap_or(0);
        for op in ops {
            seq += 1;
            log.push(OperationRecord {
                document_id,
                seq,
                kind: op.kind,
                position: op.position,
                length: op.length,
                content: op.content.clone(),
                user_id: user_id.to_string(),
                created_at: now,
            });
        }
        state.analytics.push(analytics.clone());
        Ok(commit)
    }

    async fn update_body(
        &self,
        document_id: Uuid,
        new_body: &str,
        _user_id: &str,
    ) -> Result<BodyCommit, ApiError> {
        let mut state = self.inner.lock().unwrap();
        let Some(doc) = state.docs.get_mut(&document_id) else {
            return Err(ApiError::not_found("document not found"));
        };
        let now = Utc::now();
        doc.content = new_body.to_string();
        doc.revision += 1;
        doc.updated_at = now;
        doc.last_edited_at = now;
        Ok(BodyCommit {
            revision: doc.revision,
            updated_at: now,
            last_edited_at: now,
        })
    }
}
