use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use strongroom_shared::{AccessError, CryptoError};
use strongroom_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Missing or invalid identity")]
    Unauthorized,

    /// Same body whether or not the resource exists.
    #[error("Access denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// A stored secret failed authentication on decrypt.
    #[error("Stored secret failed its integrity check")]
    Integrity,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::NotFound("Record not found".into()),
            StoreError::Conflict(msg) => ServerError::Conflict(msg),
            e @ StoreError::GroupInUse { .. } => ServerError::Conflict(e.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<AccessError> for ServerError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::PermissionDenied => ServerError::Forbidden,
            AccessError::RepositoryUnavailable(detail) => {
                ServerError::Internal(format!("ACL lookup failed: {detail}"))
            }
        }
    }
}

impl From<CryptoError> for ServerError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Integrity => ServerError::Integrity,
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.to_string())
            }
            ServerError::BlobStorage(detail) => {
                tracing::error!(error = %detail, "blob storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Blob storage error".to_string())
            }
            ServerError::Integrity => {
                tracing::error!("stored secret failed integrity check");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ServerError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_http_semantics() {
        assert!(matches!(
            ServerError::from(StoreError::NotFound),
            ServerError::NotFound(_)
        ));
        assert!(matches!(
            ServerError::from(StoreError::GroupInUse {
                name: "ops".into(),
                users: 2
            }),
            ServerError::Conflict(msg) if msg.contains("ops")
        ));
        assert!(matches!(
            ServerError::from(StoreError::Migration("boom".into())),
            ServerError::Internal(_)
        ));
    }

    #[test]
    fn access_errors_stay_distinct() {
        assert!(matches!(
            ServerError::from(AccessError::PermissionDenied),
            ServerError::Forbidden
        ));
        assert!(matches!(
            ServerError::from(AccessError::RepositoryUnavailable("locked".into())),
            ServerError::Internal(_)
        ));
    }

    #[test]
    fn opaque_statuses() {
        let integrity = ServerError::from(CryptoError::Integrity).into_response();
        assert_eq!(integrity.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let forbidden = ServerError::Forbidden.into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let unauthorized = ServerError::Unauthorized.into_response();
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
