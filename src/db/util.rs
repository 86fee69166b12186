use sqlx::Error as SqlxError;

use crate::models::error::ApiError;

/// Map a driver error onto the service error taxonomy.
///
/// Fixed table: uniqueness -> Conflict, foreign key -> BadRequest,
/// not-null/check -> Validation, connection/pool -> ServiceUnavailable,
/// schema (undefined table/column) -> Internal.
pub fn map_sqlx_error(e: SqlxError) -> ApiError {
    match e {
        SqlxError::RowNotFound => ApiError::not_found("not found"),
        SqlxError::PoolTimedOut | SqlxError::PoolClosed => {
            ApiError::service_unavailable("database connection unavailable")
        }
        SqlxError::Io(_) => ApiError::service_unavailable("database connection failed"),
        SqlxError::Database(db) => match db.code().as_deref() {
            Some("23505") => ApiError::conflict("resource already exists"),
            Some("23503") => ApiError::bad_request("referenced resource does not exist"),
            Some("23502") | Some("23514") => {
                ApiError::validation(format!("constraint violated: {}", db.message()))
            }
            Some(code) if code.starts_with("08") => {
                ApiError::service_unavailable("database connection failed")
            }
            Some(code) if code.starts_with("42") => {
                ApiError::internal(format!("schema error: {}", db.message()))
            }
            _ => ApiError::internal(format!("database error: {}", db.message())),
        },
        other => ApiError::internal(format!("database error: {}", other)),
    }
}

impl From<SqlxError> for ApiError {
    fn from(e: SqlxError) -> Self {
        map_sqlx_error(e)
    }
}

/// Escape LIKE/ILIKE metacharacters so user search terms match literally.
/// Patterns built with this must use `ESCAPE '\'`.
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
