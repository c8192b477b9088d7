//! Custom-authorizer context
//!
//! The authorizer in front of this service resolves the active Forge token
//! and forwards it on the request: `authToken` arrives as the
//! `Authorization` header (`"Bearer <token>"`) and `expiresAt` as
//! `X-Token-Expires-At`. Extraction never rejects; a missing token is handled
//! by the route with its own reply.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

/// Header carrying the token expiry set by the authorizer
pub const EXPIRES_AT_HEADER: &str = "x-token-expires-at";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizerContext {
    /// Raw authorization value, usually `"Bearer <token>"`
    pub auth_token: Option<String>,
    /// Expiry as stored in the token table; empty when not supplied
    pub expires_at: String,
}

impl AuthorizerContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let auth_token = header_str(headers, axum::http::header::AUTHORIZATION.as_str())
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        let expires_at = header_str(headers, EXPIRES_AT_HEADER)
            .unwrap_or_default()
            .to_owned();
        Self {
            auth_token,
            expires_at,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl<S: Send + Sync> FromRequestParts<S> for AuthorizerContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
