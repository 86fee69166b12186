use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::error::ApiError;

/// Maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 255;
/// Maximum description length in characters
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
/// Maximum document body size in bytes
pub const MAX_BODY_BYTES: usize = 1_000_000;
/// Maximum tag length in characters
pub const MAX_TAG_CHARS: usize = 50;

/// A named, versioned, UTF-8 text body with metadata and visibility policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub allow_comments: bool,
    pub allow_suggestions: bool,
    pub require_approval: bool,
    pub owner_id: String,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

/// Request body for creating a document
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub content: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub allow_comments: Option<bool>,
    pub allow_suggestions: Option<bool>,
    pub require_approval: Option<bool>,
}

impl CreateDocumentRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_title(&self.title)?;
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(content) = &self.content {
            validate_body(content)?;
        }
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        Ok(())
    }
}

/// Request body for a partial document update
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub allow_comments: Option<bool>,
    pub allow_suggestions: Option<bool>,
    pub require_approval: Option<bool>,
}

impl UpdateDocumentRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        if let Some(content) = &self.content {
            validate_body(content)?;
        }
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        Ok(())
    }
}

/// API representation of a document
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub allow_comments: bool,
    pub allow_suggestions: bool,
    pub require_approval: bool,
    pub owner_id: String,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

impl From<DocumentRecord> for DocumentResponse {
    fn from(doc: DocumentRecord) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            content: doc.content,
            tags: doc.tags,
            is_public: doc.is_public,
            allow_comments: doc.allow_comments,
            allow_suggestions: doc.allow_suggestions,
            require_approval: doc.require_approval,
            owner_id: doc.owner_id,
            revision: doc.revision,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            last_edited_at: doc.last_edited_at,
        }
    }
}

/// Raw query string for document listing; validated into `ListParams`.
#[derive(Debug, Default, Deserialize)]
pub struct ListDocumentsQuery {
    pub search: Option<String>,
    pub public: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Validated listing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub search: Option<String>,
    pub public: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

impl ListDocumentsQuery {
    pub fn validate(self) -> Result<ListParams, ApiError> {
        let limit = match self.limit.as_deref() {
            None => 10,
            Some(raw) => {
                let parsed: i64 = raw
                    .parse()
                    .map_err(|_| ApiError::bad_request(format!("Invalid limit '{}'", raw)))?;
                if !(1..=100).contains(&parsed) {
                    return Err(ApiError::bad_request("limit must be between 1 and 100"));
                }
                parsed
            }
        };

        let offset = match self.offset.as_deref() {
            None => 0,
            Some(raw) => {
                let parsed: i64 = raw
                    .parse()
                    .map_err(|_| ApiError::bad_request(format!("Invalid offset '{}'", raw)))?;
                if parsed < 0 {
                    return Err(ApiError::bad_request("offset must not be negative"));
                }
                parsed
            }
        };

        // Case-sensitive boolean literal
        let public = match self.public.as_deref() {
            None => None,
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                return Err(ApiError::bad_request(format!(
                    "Invalid public filter '{}'. Use 'true' or 'false'.",
                    other
                )))
            }
        };

        let search = match self.search {
            None => None,
            Some(s) => {
                validate_search_term(&s)?;
                Some(s)
            }
        };

        Ok(ListParams {
            search,
            public,
            limit,
            offset,
        })
    }
}

pub fn validate_search_term(s: &str) -> Result<(), ApiError> {
    let chars = s.chars().count();
    if chars == 0 || chars > 100 {
        return Err(ApiError::bad_request(
            "search term must be between 1 and 100 characters",
        ));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.is_empty() {
        return Err(ApiError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::validation(format!(
            "title exceeds {} characters",
            MAX_TITLE_CHARS
        )));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ApiError::validation(format!(
            "description exceeds {} characters",
            MAX_DESCRIPTION_CHARS
        )));
    }
    Ok(())
}

pub fn validate_body(body: &str) -> Result<(), ApiError> {
    if body.len() > MAX_BODY_BYTES {
        return Err(ApiError::validation(format!(
            "document body exceeds {} bytes",
            MAX_BODY_BYTES
        )));
    }
    Ok(())
}

pub fn validate_tags(tags: &[String]) -> Result<(), ApiError> {
    for tag in tags {
        if tag.is_empty() || tag.chars().count() > MAX_TAG_CHARS {
            return Err(ApiError::validation(format!(
                "tag '{}' must be between 1 and {} characters",
                tag, MAX_TAG_CHARS
            )));
        }
    }
    Ok(())
}
