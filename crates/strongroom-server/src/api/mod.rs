//! REST API. Every route except `/api/health` needs a [`Caller`].
//!
//! [`Caller`]: crate::auth::Caller

mod credentials;
mod documents;
mod folders;
mod groups;
mod services;
mod users;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{delete, get, put},
    Json, Router,
};
use serde::Serialize;
use strongroom_shared::{require, AccessResolver, FolderAction, FolderId, Identity, SecretCipher};
use strongroom_store::{Database, StoreError};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::blob_store::BlobStore;
use crate::config::ServerConfig;
use crate::error::ServerError;

/// Room for multipart framing and the description field on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub cipher: Arc<SecretCipher>,
    pub blob_store: Arc<BlobStore>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/users", get(users::list).post(users::create))
        .route("/users/:id", put(users::update).delete(users::remove))
        .route("/groups", get(groups::list).post(groups::create))
        .route(
            "/groups/:id",
            get(groups::get).put(groups::update).delete(groups::remove),
        )
        .route("/folders", get(folders::list).post(folders::create))
        .route("/folders/:id", delete(folders::remove))
        .route("/folders/:id/permissions", put(folders::set_permission))
        .route(
            "/credentials",
            get(credentials::list).post(credentials::create),
        )
        .route(
            "/credentials/:id",
            get(credentials::get)
                .put(credentials::update)
                .delete(credentials::remove),
        )
        .route("/documents", get(documents::list).post(documents::upload))
        .route("/documents/:id", delete(documents::remove))
        .route("/documents/:id/view", get(documents::view))
        .route("/documents/:id/download", get(documents::download))
        .route(
            "/documents/:id/permissions",
            put(documents::set_permission),
        )
        .route("/services", get(services::list).post(services::create))
        .route(
            "/services/:id",
            get(services::get)
                .put(services::update)
                .delete(services::remove),
        );

    let body_limit = state.config.max_upload_size + MULTIPART_OVERHEAD;

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn require_admin(identity: &Identity) -> Result<(), ServerError> {
    if identity.is_admin() {
        return Ok(());
    }
    debug!(user = %identity.user_id, "admin-only route refused");
    Err(ServerError::Forbidden)
}

/// Non-admins get the same 403 for an unknown id as for one they may not
/// see.
fn load_or_forbid<T>(identity: &Identity, result: Result<T, StoreError>) -> Result<T, ServerError> {
    match result {
        Err(StoreError::NotFound) if !identity.is_admin() => Err(ServerError::Forbidden),
        other => other.map_err(ServerError::from),
    }
}

/// Write access to `folder_id`. Admins pass, but the folder must exist.
fn require_folder_write(
    db: &Database,
    identity: &Identity,
    folder_id: FolderId,
) -> Result<(), ServerError> {
    if identity.is_admin() {
        db.get_folder(folder_id)?;
        return Ok(());
    }
    require(AccessResolver::new(db).can_access_folder(identity, folder_id, FolderAction::Write)?)?;
    Ok(())
}

fn non_empty(value: &str, field: &str) -> Result<(), ServerError> {
    if value.trim().is_empty() {
        return Err(ServerError::BadRequest(format!("'{field}' is required")));
    }
    Ok(())
}

/// `Some("")` counts as "not supplied".
fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn health_needs_no_identity() {
        let app = app().await;
        let (status, body) = app
            .send(request(Method::GET, "/api/health", None, None))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let app = app().await;
        let (status, body) = app
            .send(request(Method::GET, "/api/credentials", None, None))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn gateway_token_enforced_when_configured() {
        let app = app_with(|c| c.gateway_token = Some("gw-token".into())).await;
        let admin = admin();

        let (status, _) = app.call(Method::GET, "/api/folders", &admin, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut req = request(Method::GET, "/api/folders", Some(&admin), None);
        req.headers_mut()
            .insert("authorization", "Bearer gw-token".parse().unwrap());
        let (status, _) = app.send(req).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn unknown_ids_hidden_from_non_admins() {
        let missing: Result<(), StoreError> = Err(StoreError::NotFound);
        assert!(matches!(
            load_or_forbid(&member(2, "ops"), missing),
            Err(ServerError::Forbidden)
        ));
        let missing: Result<(), StoreError> = Err(StoreError::NotFound);
        assert!(matches!(
            load_or_forbid(&admin(), missing),
            Err(ServerError::NotFound(_))
        ));
    }
}
