use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::doc::MAX_BODY_BYTES;
use crate::models::error::ApiError;

/// A single find-and-replace pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeOp {
    pub text_to_replace: String,
    pub new_text: String,
}

impl ChangeOp {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.text_to_replace.len() > MAX_BODY_BYTES {
            return Err(ApiError::bad_request(format!(
                "textToReplace exceeds {} bytes",
                MAX_BODY_BYTES
            )));
        }
        if self.new_text.len() > MAX_BODY_BYTES {
            return Err(ApiError::bad_request(format!(
                "newText exceeds {} bytes",
                MAX_BODY_BYTES
            )));
        }
        Ok(())
    }
}

/// Wire shape of the change endpoint body. Either the single fields or the
/// `changes` array may be present, never both.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestBody {
    #[serde(default)]
    pub changes: Option<Vec<ChangeOp>>,
    #[serde(default)]
    pub text_to_replace: Option<String>,
    #[serde(default)]
    pub new_text: Option<String>,
}

/// Normalized change request.
#[derive(Debug, Clone)]
pub enum ChangeRequest {
    Single(ChangeOp),
    Batch(Vec<ChangeOp>),
}

impl ChangeRequest {
    pub fn request_type(&self) -> &'static str {
        match self {
            ChangeRequest::Single(_) => "single",
            ChangeRequest::Batch(_) => "batch",
        }
    }

    pub fn ops(&self) -> Vec<ChangeOp> {
        match self {
            ChangeRequest::Single(op) => vec![op.clone()],
            ChangeRequest::Batch(ops) => ops.clone(),
        }
    }
}

impl ChangeRequestBody {
    /// Resolve the union into its tagged form, rejecting mixed shapes.
    pub fn into_request(self) -> Result<ChangeRequest, ApiError> {
        match (self.changes, self.text_to_replace, self.new_text) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(ApiError::bad_request(
                "request must be either a single change or a batch, not both",
            )),
            (Some(changes), None, None) => {
                for op in &changes {
                    op.validate()?;
                }
                Ok(ChangeRequest::Batch(changes))
            }
            (None, Some(text_to_replace), Some(new_text)) => {
                let op = ChangeOp {
                    text_to_replace,
                    new_text,
                };
                op.validate()?;
                Ok(ChangeRequest::Single(op))
            }
            _ => Err(ApiError::bad_request(
                "request must carry textToReplace/newText or a changes array",
            )),
        }
    }
}

/// Outcome of one op against the working copy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    pub text_replaced: String,
    pub new_text: String,
    /// Byte position in the working copy at the moment of application, or -1.
    pub position: i64,
    pub applied: bool,
}

/// Summary block of a change response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub request_type: String,
    pub total_changes: usize,
    pub applied_changes: usize,
    pub per_op: Vec<AppliedChange>,
    pub document_version: i64,
}

/// Response of `POST /documents/{id}/changes`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyChangesResponse {
    pub document_text: String,
    pub changes: ChangeSummary,
}
