use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{debug, error};

use crate::auth::auth::{authenticate_token, get_auth_token};
use crate::config;
use crate::models::error::ApiError;

/// Validate the caller's bearer token (header or `auth_token` cookie) and
/// insert the authenticated `Principal` into the request extensions.
pub async fn auth_middleware(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = get_auth_token(&req)?;

    let config = config::get_config();
    let secret = config.auth_jwt_secret.as_ref().ok_or_else(|| {
        error!("Auth JWT secret not configured");
        ApiError::internal("authentication is not configured")
    })?;

    let principal = authenticate_token(&token, secret)?;
    debug!("Authenticated principal {}", principal.user_id);

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
