//! Document endpoints: metadata and ACLs in SQLite, bytes in the blob store.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strongroom_shared::{
    require, AccessResolver, Document, DocumentAction, DocumentId, DocumentPermission, Identity,
};
use strongroom_store::NewDocument;
use tracing::{info, warn};
use uuid::Uuid;

use super::{load_or_forbid, non_empty, require_admin, AppState};
use crate::auth::Caller;
use crate::error::ServerError;

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Deserialize)]
pub(super) struct SetPermissionRequest {
    group: String,
    #[serde(default)]
    can_view: bool,
    #[serde(default)]
    can_download: bool,
}

#[derive(Serialize)]
pub(super) struct DocumentView {
    #[serde(flatten)]
    document: Document,
    /// Only filled in for admins.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    permissions: Vec<DocumentPermission>,
}

/// Strip any client-side directory part from an uploaded file name.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Storage key: a fresh UUID, keeping a short alphanumeric extension.
fn storage_key(original: &str) -> String {
    let ext = std::path::Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match ext {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
        None => Uuid::new_v4().to_string(),
    }
}

/// `Content-Disposition` value with a header-safe file name.
fn disposition(kind: &str, filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{kind}; filename=\"{safe}\"")
}

pub(super) async fn list(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<Vec<DocumentView>>, ServerError> {
    let db = state.db.lock().await;
    let documents = db.list_documents()?;

    if identity.is_admin() {
        let mut views = Vec::with_capacity(documents.len());
        for document in documents {
            let permissions = db.list_document_permissions(document.id)?;
            views.push(DocumentView {
                document,
                permissions,
            });
        }
        return Ok(Json(views));
    }

    let snapshot = db.acl_snapshot()?;
    drop(db);

    let visible = AccessResolver::new(&snapshot).filter_documents(&identity, documents)?;
    Ok(Json(
        visible
            .into_iter()
            .map(|document| DocumentView {
                document,
                permissions: Vec::new(),
            })
            .collect(),
    ))
}

/// Multipart upload with a `file` part and an optional `description` part.
/// The blob is written first; if the metadata insert then fails the blob is
/// removed again.
pub(super) async fn upload(
    State(state): State<AppState>,
    Caller(identity): Caller,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>), ServerError> {
    require_admin(&identity)?;

    let mut file: Option<(String, String, Bytes)> = None;
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = base_name(field.file_name().unwrap_or("upload")).to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_MIME_TYPE)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {}", e)))?;
                file = Some((filename, mime_type, data));
            }
            "description" => {
                description = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {}", e)))?;
            }
            _ => {}
        }
    }

    let (original_filename, mime_type, data) = file.ok_or_else(|| {
        ServerError::BadRequest("Missing 'file' field in multipart form".to_string())
    })?;
    non_empty(&original_filename, "file name")?;
    if data.is_empty() {
        return Err(ServerError::BadRequest("Uploaded file is empty".into()));
    }

    let key = storage_key(&original_filename);
    state.blob_store.put(&key, &data).await?;

    let created = {
        let db = state.db.lock().await;
        db.create_document(
            &NewDocument {
                stored_filename: key.clone(),
                original_filename,
                size: data.len() as i64,
                mime_type,
                owner: identity.user_id,
                description,
            },
            &state.config.document_permissions,
        )
    };

    let document = match created {
        Ok(document) => document,
        Err(e) => {
            if let Err(cleanup) = state.blob_store.delete(&key).await {
                warn!(key = %key, error = %cleanup, "Failed to remove orphaned blob");
            }
            return Err(e.into());
        }
    };

    info!(
        id = %document.id,
        key = %key,
        size = document.size,
        "Document uploaded"
    );
    Ok((StatusCode::CREATED, Json(document)))
}

async fn serve_document(
    state: AppState,
    identity: Identity,
    id: i64,
    action: DocumentAction,
) -> Result<Response, ServerError> {
    let document = {
        let db = state.db.lock().await;
        let document = load_or_forbid(&identity, db.get_document(DocumentId(id)))?;
        require(AccessResolver::new(&*db).can_access_document(&identity, &document, action)?)?;
        document
    };

    let data = state.blob_store.get(&document.stored_filename).await?;
    let kind = match action {
        DocumentAction::View => "inline",
        DocumentAction::Download => "attachment",
    };

    Ok((
        [
            (header::CONTENT_TYPE, document.mime_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                disposition(kind, &document.original_filename),
            ),
        ],
        data,
    )
        .into_response())
}

pub(super) async fn view(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Response, ServerError> {
    serve_document(state, identity, id, DocumentAction::View).await
}

pub(super) async fn download(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Response, ServerError> {
    serve_document(state, identity, id, DocumentAction::Download).await
}

pub(super) async fn set_permission(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
    Json(req): Json<SetPermissionRequest>,
) -> Result<Json<Vec<DocumentPermission>>, ServerError> {
    require_admin(&identity)?;
    non_empty(&req.group, "group")?;

    let document_id = DocumentId(id);
    let row = DocumentPermission {
        document_id,
        group: req.group.trim().to_string(),
        can_view: req.can_view,
        can_download: req.can_download,
    };

    let db = state.db.lock().await;
    db.set_document_permission(&row)?;
    info!(
        document = %document_id,
        group = %row.group,
        view = row.can_view,
        download = row.can_download,
        "Document permission set"
    );
    Ok(Json(db.list_document_permissions(document_id)?))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ServerError> {
    require_admin(&identity)?;

    let document = {
        let db = state.db.lock().await;
        let document = db.get_document(DocumentId(id))?;
        db.delete_document(document.id)?;
        document
    };

    if let Err(e) = state.blob_store.delete(&document.stored_filename).await {
        warn!(id, key = %document.stored_filename, error = %e, "Document row deleted but blob remains");
    }

    info!(id, "Document deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}
