//! Identity intake.
//!
//! Sessions are verified by an upstream gateway, which forwards the caller as
//! three headers, alongside the shared `GATEWAY_TOKEN` as a bearer token.
//! Only a server started with `ALLOW_UNVERIFIED_IDENTITY=true` has no token
//! and takes the headers as sent.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use strongroom_shared::{Identity, Role, UserId};
use subtle::ConstantTimeEq;

use crate::api::AppState;
use crate::error::ServerError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_GROUP_HEADER: &str = "x-user-group";

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(expected) = state.config.gateway_token.as_deref() {
            verify_gateway_token(&parts.headers, expected)?;
        }
        identity_from_headers(&parts.headers).map(Caller)
    }
}

fn verify_gateway_token(headers: &HeaderMap, expected: &str) -> Result<(), ServerError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or("");

    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        tracing::debug!("gateway token rejected");
        return Err(ServerError::Unauthorized);
    }
    Ok(())
}

fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, ServerError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ServerError::Unauthorized)
    };

    let user_id = header(USER_ID_HEADER)?
        .parse::<i64>()
        .map_err(|_| ServerError::Unauthorized)?;
    let role = header(USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|_| ServerError::Unauthorized)?;
    let group = header(USER_GROUP_HEADER)?;

    Ok(Identity::new(UserId(user_id), role, group))
}
