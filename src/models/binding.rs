use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Permission tier of a collaborator binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Owner,
    Editor,
    Viewer,
    Commenter,
}

impl Permission {
    /// Whether this tier may mutate the document body.
    pub fn can_write(self) -> bool {
        matches!(self, Permission::Owner | Permission::Editor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Owner => "owner",
            Permission::Editor => "editor",
            Permission::Viewer => "viewer",
            Permission::Commenter => "commenter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Permission::Owner),
            "editor" => Some(Permission::Editor),
            "viewer" => Some(Permission::Viewer),
            "commenter" => Some(Permission::Commenter),
            _ => None,
        }
    }
}

/// Explicit (document, principal, permission) association.
/// At most one binding exists per (document, principal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingRecord {
    pub document_id: Uuid,
    pub user_id: String,
    pub permission: Permission,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
