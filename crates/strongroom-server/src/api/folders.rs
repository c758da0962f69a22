use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use strongroom_shared::{
    AccessResolver, AclSnapshot, DocumentPermission, Folder, FolderAction, FolderId,
    FolderPermission, Identity,
};
use tracing::info;

use super::{non_empty, require_admin, AppState};
use crate::auth::Caller;
use crate::error::ServerError;

#[derive(Deserialize)]
pub(super) struct CreateFolderRequest {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
pub(super) struct SetPermissionRequest {
    group: String,
    #[serde(default)]
    can_read: bool,
    #[serde(default)]
    can_write: bool,
    #[serde(default)]
    can_delete: bool,
}

/// What the caller may do in a folder.
#[derive(Serialize)]
struct EffectiveAccess {
    can_read: bool,
    can_write: bool,
    can_delete: bool,
}

#[derive(Serialize)]
pub(super) struct FolderView {
    #[serde(flatten)]
    folder: Folder,
    permissions: Vec<FolderPermission>,
    access: EffectiveAccess,
}

fn effective_access(
    resolver: &AccessResolver<'_, AclSnapshot>,
    identity: &Identity,
    folder_id: FolderId,
) -> Result<EffectiveAccess, ServerError> {
    Ok(EffectiveAccess {
        can_read: resolver.can_access_folder(identity, folder_id, FolderAction::Read)?,
        can_write: resolver.can_access_folder(identity, folder_id, FolderAction::Write)?,
        can_delete: resolver.can_access_folder(identity, folder_id, FolderAction::Delete)?,
    })
}

/// Every folder, its ACL rows and the caller's effective rights.
pub(super) async fn list(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<Vec<FolderView>>, ServerError> {
    let (folders, rows) = {
        let db = state.db.lock().await;
        (db.list_folders()?, db.list_all_folder_permissions()?)
    };

    let snapshot = AclSnapshot::from_rows(rows.iter().cloned(), Vec::<DocumentPermission>::new());
    let resolver = AccessResolver::new(&snapshot);

    let mut by_folder: HashMap<FolderId, Vec<FolderPermission>> = HashMap::new();
    for row in rows {
        by_folder.entry(row.folder_id).or_default().push(row);
    }

    let mut views = Vec::with_capacity(folders.len());
    for folder in folders {
        let access = effective_access(&resolver, &identity, folder.id)?;
        let mut permissions = by_folder.remove(&folder.id).unwrap_or_default();
        permissions.sort_by(|a, b| a.group.cmp(&b.group));
        views.push(FolderView {
            folder,
            permissions,
            access,
        });
    }
    Ok(Json(views))
}

pub(super) async fn create(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(req): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<Folder>), ServerError> {
    require_admin(&identity)?;
    non_empty(&req.name, "name")?;

    let folder = state
        .db
        .lock()
        .await
        .create_folder(req.name.trim(), &req.description)?;

    info!(id = %folder.id, name = %folder.name, "Folder created");
    Ok((StatusCode::CREATED, Json(folder)))
}

/// Upsert one group's row; returns the folder's full ACL afterwards.
pub(super) async fn set_permission(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
    Json(req): Json<SetPermissionRequest>,
) -> Result<Json<Vec<FolderPermission>>, ServerError> {
    require_admin(&identity)?;
    non_empty(&req.group, "group")?;

    let folder_id = FolderId(id);
    let row = FolderPermission {
        folder_id,
        group: req.group.trim().to_string(),
        can_read: req.can_read,
        can_write: req.can_write,
        can_delete: req.can_delete,
    };

    let db = state.db.lock().await;
    db.set_folder_permission(&row)?;
    info!(
        folder = %folder_id,
        group = %row.group,
        read = row.can_read,
        write = row.can_write,
        delete = row.can_delete,
        "Folder permission set"
    );
    Ok(Json(db.list_folder_permissions(folder_id)?))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ServerError> {
    require_admin(&identity)?;

    if !state.db.lock().await.delete_folder(FolderId(id))? {
        return Err(ServerError::NotFound("Folder not found".into()));
    }

    info!(id, "Folder deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}
