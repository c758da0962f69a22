//! # strongroom-server
//!
//! HTTP server for Strongroom, an organisation's store for service
//! credentials, endpoints and shared documents.
//!
//! This binary provides:
//! - **REST API** (axum) for users, groups, folders, credentials, documents
//!   and services, every call checked by the access resolver
//! - **At-rest sealing** of credential secrets with a single deployment key
//! - **Local document storage** for uploaded files
//!
//! Callers are authenticated upstream; see [`auth`] for how the identity
//! reaches this process.

mod api;
mod auth;
mod blob_store;
mod config;
mod error;

use std::sync::Arc;

use strongroom_shared::constants::APP_NAME;
use strongroom_shared::SecretCipher;
use strongroom_store::Database;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::blob_store::BlobStore;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strongroom_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration (no key or gateway token, no server)
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env()?;
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.database_path)?;

    let blob_store = Arc::new(
        BlobStore::new(config.blob_storage_path.clone(), config.max_upload_size).await?,
    );

    let cipher = Arc::new(SecretCipher::new(config.secret_key.clone()));

    let http_addr = config.http_addr;
    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        cipher,
        blob_store,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
