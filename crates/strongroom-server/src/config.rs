//! Server configuration loaded from environment variables.
//!
//! The secret key and the gateway token are mandatory. Everything else has
//! a default. A development server without a gateway must opt in with
//! `ALLOW_UNVERIFIED_IDENTITY=true`, in which case identity headers are
//! trusted as sent.

use std::net::SocketAddr;
use std::path::PathBuf;

use strongroom_shared::constants::{DEFAULT_HTTP_PORT, MAX_UPLOAD_SIZE};
use strongroom_shared::{CryptoError, DocumentSeedPolicy, KeyMaterial, SeedPolicyError};
use thiserror::Error;

pub const SECRET_KEY_VAR: &str = "STRONGROOM_SECRET_KEY";
pub const GATEWAY_TOKEN_VAR: &str = "GATEWAY_TOKEN";
pub const ALLOW_UNVERIFIED_VAR: &str = "ALLOW_UNVERIFIED_IDENTITY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("STRONGROOM_SECRET_KEY is not set")]
    MissingSecretKey,

    #[error("STRONGROOM_SECRET_KEY is invalid: {0}")]
    InvalidSecretKey(#[from] CryptoError),

    #[error("GATEWAY_TOKEN is not set (set ALLOW_UNVERIFIED_IDENTITY=true to run without one)")]
    MissingGatewayToken,

    #[error("DOCUMENT_DEFAULT_PERMISSIONS is invalid: {0}")]
    InvalidSeedPolicy(#[from] SeedPolicyError),
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./strongroom.db`
    pub database_path: PathBuf,

    /// Directory where uploaded documents are stored.
    /// Env: `BLOB_STORAGE_PATH`
    /// Default: `./uploads`
    pub blob_storage_path: PathBuf,

    /// Maximum document size in bytes.
    /// Env: `MAX_UPLOAD_SIZE`
    /// Default: 50 MiB
    pub max_upload_size: usize,

    /// Bearer token the upstream session gateway presents on every request.
    /// Env: `GATEWAY_TOKEN`
    /// Required unless `ALLOW_UNVERIFIED_IDENTITY=true`, in which case it is
    /// `None` and identity headers are trusted as-is.
    pub gateway_token: Option<String>,

    /// Key for sealing credential secrets at rest.
    /// Env: `STRONGROOM_SECRET_KEY` (64 hex chars or base64 of 32 bytes)
    pub secret_key: KeyMaterial,

    /// ACL rows written onto every new document.
    /// Env: `DOCUMENT_DEFAULT_PERMISSIONS`
    /// Default: `admin:view+download;senior:view+download;junior:view`
    pub document_permissions: DocumentSeedPolicy,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("blob_storage_path", &self.blob_storage_path)
            .field("max_upload_size", &self.max_upload_size)
            .field("gateway_token", &self.gateway_token.as_ref().map(|_| "<redacted>"))
            .field("secret_key", &self.secret_key)
            .field("document_permissions", &self.document_permissions.entries().len())
            .finish()
    }
}

impl ServerConfig {
    /// Defaults for everything but the key.
    pub fn with_key(secret_key: KeyMaterial) -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./strongroom.db"),
            blob_storage_path: PathBuf::from("./uploads"),
            max_upload_size: MAX_UPLOAD_SIZE,
            gateway_token: None,
            secret_key,
            document_permissions: DocumentSeedPolicy::default(),
        }
    }

    /// Load configuration from environment variables, falling back to
    /// defaults. Fails when the key is missing or unusable, when no gateway
    /// token is configured without the explicit opt-out, or when the
    /// document permission table does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let key = var(SECRET_KEY_VAR)
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingSecretKey)?;
        let mut config = Self::with_key(KeyMaterial::parse(&key)?);

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(path) = var("BLOB_STORAGE_PATH") {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Some(val) = var("MAX_UPLOAD_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default"),
            }
        }

        config.gateway_token = var(GATEWAY_TOKEN_VAR).filter(|t| !t.trim().is_empty());
        if config.gateway_token.is_none() {
            let unverified = var(ALLOW_UNVERIFIED_VAR)
                .is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes"));
            if !unverified {
                return Err(ConfigError::MissingGatewayToken);
            }
            tracing::warn!("{ALLOW_UNVERIFIED_VAR} set: identity headers will not be verified");
        }

        if let Some(table) = var("DOCUMENT_DEFAULT_PERMISSIONS") {
            config.document_permissions = DocumentSeedPolicy::parse(&table)?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| map.get(name).cloned())
    }

    fn hex_key() -> String {
        "ab".repeat(32)
    }

    const TOKEN: (&str, &str) = (GATEWAY_TOKEN_VAR, "gw-token");

    #[test]
    fn test_defaults() {
        let key = hex_key();
        let config = load(&[(SECRET_KEY_VAR, key.as_str()), TOKEN]).unwrap();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_upload_size, 50 * 1024 * 1024);
        assert_eq!(config.blob_storage_path, PathBuf::from("./uploads"));
        assert_eq!(config.gateway_token.as_deref(), Some("gw-token"));
        assert_eq!(config.document_permissions, DocumentSeedPolicy::default());
    }

    #[test]
    fn test_missing_key_is_fatal() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingSecretKey)));
        assert!(matches!(
            load(&[(SECRET_KEY_VAR, "  ")]),
            Err(ConfigError::MissingSecretKey)
        ));
    }

    #[test]
    fn test_bad_key_is_fatal() {
        assert!(matches!(
            load(&[(SECRET_KEY_VAR, "abcd")]),
            Err(ConfigError::InvalidSecretKey(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let key = hex_key();
        let config = load(&[
            (SECRET_KEY_VAR, key.as_str()),
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/var/lib/strongroom/db.sqlite"),
            ("MAX_UPLOAD_SIZE", "1024"),
            ("GATEWAY_TOKEN", "s3cret"),
            ("DOCUMENT_DEFAULT_PERMISSIONS", "ops:view"),
        ])
        .unwrap();

        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.max_upload_size, 1024);
        assert_eq!(config.gateway_token.as_deref(), Some("s3cret"));
        assert_eq!(config.document_permissions.entries().len(), 1);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let key = hex_key();
        let config = load(&[
            (SECRET_KEY_VAR, key.as_str()),
            TOKEN,
            ("HTTP_ADDR", "not-an-addr"),
            ("MAX_UPLOAD_SIZE", "lots"),
        ])
        .unwrap();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_upload_size, 50 * 1024 * 1024);
    }

    #[test]
    fn test_bad_seed_table_is_fatal() {
        let key = hex_key();
        assert!(matches!(
            load(&[
                (SECRET_KEY_VAR, key.as_str()),
                TOKEN,
                ("DOCUMENT_DEFAULT_PERMISSIONS", "ops:edit"),
            ]),
            Err(ConfigError::InvalidSeedPolicy(_))
        ));
    }

    #[test]
    fn test_missing_gateway_token_is_fatal() {
        let key = hex_key();
        assert!(matches!(
            load(&[(SECRET_KEY_VAR, key.as_str())]),
            Err(ConfigError::MissingGatewayToken)
        ));
        assert!(matches!(
            load(&[(SECRET_KEY_VAR, key.as_str()), (GATEWAY_TOKEN_VAR, " ")]),
            Err(ConfigError::MissingGatewayToken)
        ));
        assert!(matches!(
            load(&[(SECRET_KEY_VAR, key.as_str()), (ALLOW_UNVERIFIED_VAR, "no")]),
            Err(ConfigError::MissingGatewayToken)
        ));
    }

    #[test]
    fn test_unverified_identity_needs_opt_in() {
        let key = hex_key();
        let config = load(&[(SECRET_KEY_VAR, key.as_str()), (ALLOW_UNVERIFIED_VAR, "true")])
            .unwrap();
        assert!(config.gateway_token.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let key = hex_key();
        let config = load(&[
            (SECRET_KEY_VAR, key.as_str()),
            ("GATEWAY_TOKEN", "s3cret"),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains(&key));
    }
}
