//! Local-disk storage for uploaded document bytes, addressed by key.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::ServerError;

/// Keys are generated server-side, but anything that could climb out of the
/// base directory is refused anyway.
fn validate_key(key: &str) -> Result<(), ServerError> {
    if key.is_empty()
        || key.contains('/')
        || key.contains('\\')
        || key.contains("..")
        || key.contains('\0')
    {
        return Err(ServerError::BadRequest("Invalid storage key".to_string()));
    }
    Ok(())
}

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ServerError> {
    let mut resolved = base.to_path_buf();
    for component in target.strip_prefix(base).unwrap_or(target).components() {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            _ => {
                return Err(ServerError::BadRequest(
                    "Path traversal detected".to_string(),
                ));
            }
        }
    }
    if !resolved.starts_with(base) {
        return Err(ServerError::BadRequest(
            "Path traversal detected".to_string(),
        ));
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    max_size: usize,
}

impl BlobStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::BlobStorage(format!(
                "Failed to create blob directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;
        let base_path = base_path.canonicalize().unwrap_or(base_path);

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> Result<(), ServerError> {
        if data.len() > self.max_size {
            return Err(ServerError::PayloadTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let path = self.path_for(key)?;
        fs::write(&path, data)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to write blob {key}: {e}")))?;

        debug!(key = %key, size = data.len(), "Stored blob");
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Vec<u8>, ServerError> {
        let path = self.path_for(key)?;

        match fs::read(&path).await {
            Ok(data) => {
                debug!(key = %key, size = data.len(), "Retrieved blob");
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ServerError::NotFound("File not found".to_string()))
            }
            Err(e) => Err(ServerError::BlobStorage(format!(
                "Failed to read blob {key}: {e}"
            ))),
        }
    }

    /// Remove a blob. Deleting a key that is already gone is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), ServerError> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServerError::BlobStorage(format!(
                "Failed to delete blob {key}: {e}"
            ))),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ServerError> {
        validate_key(key)?;
        ensure_within(&self.base_path, &self.base_path.join(key))
    }
}
