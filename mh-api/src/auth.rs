//! Caller credentials and the API key guard

use crate::error::ApiError;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use mh_http_client::Credentials;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Header carrying the hunter's `HG_TOKEN`
pub const TOKEN_HEADER: &str = "hgToken";
/// Header carrying the hunter's unique hash
pub const UNIQUE_HASH_HEADER: &str = "uniqueHash";

/// Read the hunter's session credentials from the request headers
pub fn credentials_from_headers(headers: &HeaderMap) -> Result<Credentials, ApiError> {
    let token = required_header(headers, TOKEN_HEADER)?;
    let unique_hash = required_header(headers, UNIQUE_HASH_HEADER)?;
    Ok(Credentials::new(token, unique_hash))
}

fn required_header<'h>(headers: &'h HeaderMap, name: &str) -> Result<&'h str, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {name} header")))
}

/// Rejects requests without the configured bearer key; open when no key is set
pub async fn require_api_key(
    State(api_key): State<Option<Arc<Zeroizing<String>>>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = api_key.as_deref() {
        let presented = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().strip_prefix("Bearer "))
            .map(str::trim);

        if presented != Some(expected.as_str()) {
            return ApiError::Unauthorized("Unauthorized".to_string()).into_response();
        }
    }
    next.run(request).await
}
