use axum::http::{self};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

use crate::models::error::ApiError;

/// Authenticated identity supplied by the external identity provider.
///
/// The provider issues a JWT whose `sub` claim is the opaque principal id;
/// an optional `name` claim carries the display name used in rosters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl Principal {
    pub fn from_claims(claims: &serde_json::Value) -> Option<Self> {
        let user_id = claims.get("sub").and_then(|v| v.as_str())?.to_string();
        let display_name = claims
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        Some(Self {
            user_id,
            display_name,
        })
    }
}

/// Pull the bearer token from the Authorization header, or fall back to the
/// `auth_token` cookie the browser client sends on WebSocket upgrades.
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, ApiError> {
    if let Some(value) = req.headers().get(http::header::AUTHORIZATION) {
        let raw = value
            .to_str()
            .map_err(|_| ApiError::unauthorized("malformed Authorization header"))?;
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
        if token.is_empty() {
            return Err(ApiError::unauthorized("empty bearer token"));
        }
        return Ok(token.to_string());
    }

    let cookies = req
        .headers()
        .get(http::header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("no credentials presented"))?;

    cookie::Cookie::split_parse(cookies)
        .flatten()
        .find(|c| c.name() == "auth_token")
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("no credentials presented"))
}

/// Validate an HS256 token against the shared secret and extract the
/// principal from its claims.
pub fn authenticate_token(token: &str, secret: &str) -> Result<Principal, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<serde_json::Value>(token, &key, &validation).map_err(|e| {
        debug!("Token rejected: {}", e);
        ApiError::unauthorized("invalid token")
    })?;

    Principal::from_claims(&data.claims)
        .ok_or_else(|| ApiError::unauthorized("token carries no subject"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn issue(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn principal_from_claims() {
        let claims = serde_json::json!({"sub": "u-123", "name": "Alice"});
        let principal = Principal::from_claims(&claims).unwrap();
        assert_eq!(principal.user_id, "u-123");
        assert_eq!(principal.display_name.as_deref(), Some("Alice"));

        let claims = serde_json::json!({"iss": "someone"});
        assert!(Principal::from_claims(&claims).is_none());
    }

    #[test]
    fn token_from_bearer_header() {
        let req = Request::builder()
            .header("Authorization", "Bearer abc.def.ghi")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn token_from_cookie_fallback() {
        let req = Request::builder()
            .header("Cookie", "theme=dark; auth_token=tok123")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "tok123");
    }

    #[test]
    fn missing_credentials_are_401() {
        let req = Request::builder().body(()).unwrap();
        assert_eq!(get_auth_token(&req).unwrap_err().status().as_u16(), 401);

        let req = Request::builder()
            .header("Cookie", "theme=dark")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap_err().status().as_u16(), 401);
    }

    #[test]
    fn valid_token_authenticates() {
        // exp is required by the default validation
        let token = issue(
            serde_json::json!({"sub": "u-9", "name": "Bea", "exp": 4_102_444_800i64}),
            "sekrit",
        );
        let principal = authenticate_token(&token, "sekrit").unwrap();
        assert_eq!(principal.user_id, "u-9");
        assert_eq!(principal.display_name.as_deref(), Some("Bea"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue(
            serde_json::json!({"sub": "u-9", "exp": 4_102_444_800i64}),
            "sekrit",
        );
        let err = authenticate_token(&token, "other").unwrap_err();
        assert_eq!(err.status().as_u16(), 401);
    }

    #[test]
    fn token_without_subject_is_rejected() {
        let token = issue(
            serde_json::json!({"name": "nobody", "exp": 4_102_444_800i64}),
            "sekrit",
        );
        let err = authenticate_token(&token, "sekrit").unwrap_err();
        assert_eq!(err.status().as_u16(), 401);
    }
}
