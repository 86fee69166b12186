use tracing::info;

use crate::db::store::DocStore;
use crate::models::doc::DocumentRecord;
use crate::models::error::ApiError;

/// Check whether a principal may read a document.
///
/// Readable when the principal owns it, holds any active binding on it, or
/// the document is public. Unreadable documents surface as NotFound so their
/// existence is not revealed.
pub async fn check_read(
    store: &dyn DocStore,
    doc: &DocumentRecord,
    user_id: &str,
) -> Result<(), ApiError> {
    if doc.owner_id == user_id {
        return Ok(());
    }
    if let Some(binding) = store.get_binding(doc.id, user_id).await? {
        if binding.active {
            return Ok(());
        }
    }
    if doc.is_public {
        return Ok(());
    }
    info!("User {} may not read document {}", user_id, doc.id);
    Err(ApiError::not_found("document not found"))
}

/// Check whether a principal may mutate a document body.
///
/// Writable when the principal owns it, holds an active owner/editor
/// binding, or the document is public. An active lower-tier binding
/// (viewer/commenter) is a hard deny even on public documents.
pub async fn check_write(
    store: &dyn DocStore,
    doc: &DocumentRecord,
    user_id: &str,
) -> Result<(), ApiError> {
    if doc.owner_id == user_id {
        return Ok(());
    }
    if let Some(binding) = store.get_binding(doc.id, user_id).await? {
        if binding.active {
            if binding.permission.can_write() {
                return Ok(());
            }
            info!(
                "User {} holds a {} binding on document {}: write denied",
                user_id,
                binding.permission.as_str(),
                doc.id
            );
            return Err(ApiError::forbidden("write access denied"));
        }
    }
    if doc.is_public {
        return Ok(());
    }
    info!("User {} may not write document {}", user_id, doc.id);
    Err(ApiError::forbidden("write access denied"))
}
