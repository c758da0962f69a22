//! Credential endpoints. The only place secrets are sealed or opened.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongroom_shared::{
    require, AccessResolver, Credential, FolderAction, FolderId, SecretCipher, UserId,
};
use strongroom_store::NewCredential;
use tracing::{debug, info};

use super::{load_or_forbid, non_empty, require_folder_write, supplied, AppState};
use crate::auth::Caller;
use crate::error::ServerError;

#[derive(Deserialize)]
pub(super) struct CreateCredentialRequest {
    folder_id: Option<FolderId>,
    service_name: String,
    username: String,
    password: String,
    #[serde(default)]
    notes: String,
}

/// Every field optional; absent or empty keeps the stored value.
#[derive(Deserialize, Default)]
#[serde(default)]
pub(super) struct UpdateCredentialRequest {
    folder_id: Option<FolderId>,
    service_name: Option<String>,
    username: Option<String>,
    password: Option<String>,
    notes: Option<String>,
}

/// A credential as returned to a caller who may read it.
#[derive(Serialize)]
pub(super) struct CredentialView {
    id: i64,
    user_id: UserId,
    folder_id: Option<FolderId>,
    service_name: String,
    username: String,
    password: String,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CredentialView {
    fn open(cipher: &SecretCipher, cred: Credential) -> Result<Self, ServerError> {
        let password = cipher.decrypt(&cred.secret).map_err(|e| {
            debug!(credential = cred.id, "stored secret could not be opened");
            ServerError::from(e)
        })?;
        Ok(Self::with_password(cred, password))
    }

    fn with_password(cred: Credential, password: String) -> Self {
        Self {
            id: cred.id,
            user_id: cred.owner,
            folder_id: cred.folder_id,
            service_name: cred.service_name,
            username: cred.username,
            password,
            notes: cred.notes,
            created_at: cred.created_at,
            updated_at: cred.updated_at,
        }
    }
}

pub(super) async fn list(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<Vec<CredentialView>>, ServerError> {
    let (credentials, snapshot) = {
        let db = state.db.lock().await;
        (db.list_credentials()?, db.acl_snapshot()?)
    };

    let visible = AccessResolver::new(&snapshot).filter_credentials(&identity, credentials)?;
    let views = visible
        .into_iter()
        .map(|cred| CredentialView::open(&state.cipher, cred))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

pub(super) async fn get(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<CredentialView>, ServerError> {
    let cred = {
        let db = state.db.lock().await;
        let cred = load_or_forbid(&identity, db.get_credential(id))?;
        require(AccessResolver::new(&*db).can_access_credential(
            &identity,
            &cred,
            FolderAction::Read,
        )?)?;
        cred
    };
    Ok(Json(CredentialView::open(&state.cipher, cred)?))
}

/// Admins may create anywhere. Others need write on the target folder, or
/// create an unscoped credential only they (and admins) can see.
pub(super) async fn create(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(req): Json<CreateCredentialRequest>,
) -> Result<(StatusCode, Json<CredentialView>), ServerError> {
    non_empty(&req.service_name, "service_name")?;
    non_empty(&req.username, "username")?;
    non_empty(&req.password, "password")?;

    let secret = state.cipher.encrypt(&req.password)?;

    let db = state.db.lock().await;
    if let Some(folder_id) = req.folder_id {
        require_folder_write(&db, &identity, folder_id)?;
    }

    let cred = db.create_credential(&NewCredential {
        owner: identity.user_id,
        folder_id: req.folder_id,
        service_name: req.service_name,
        username: req.username,
        secret,
        notes: req.notes,
    })?;

    info!(
        id = cred.id,
        owner = %cred.owner,
        folder = ?cred.folder_id.map(|f| f.0),
        "Credential created"
    );
    Ok((
        StatusCode::CREATED,
        Json(CredentialView::with_password(cred, req.password)),
    ))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCredentialRequest>,
) -> Result<Json<CredentialView>, ServerError> {
    let updated = {
        let db = state.db.lock().await;
        let mut cred = load_or_forbid(&identity, db.get_credential(id))?;
        require(AccessResolver::new(&*db).can_access_credential(
            &identity,
            &cred,
            FolderAction::Write,
        )?)?;

        if let Some(target) = req.folder_id.filter(|f| Some(*f) != cred.folder_id) {
            require_folder_write(&db, &identity, target)?;
            cred.folder_id = Some(target);
        }
        if let Some(service_name) = supplied(req.service_name) {
            cred.service_name = service_name;
        }
        if let Some(username) = supplied(req.username) {
            cred.username = username;
        }
        if let Some(password) = supplied(req.password) {
            cred.secret = state.cipher.encrypt(&password)?;
        }
        if let Some(notes) = supplied(req.notes) {
            cred.notes = notes;
        }

        db.update_credential(&cred)?
    };

    info!(id, by = %identity.user_id, "Credential updated");
    Ok(Json(CredentialView::open(&state.cipher, updated)?))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let db = state.db.lock().await;
    let cred = load_or_forbid(&identity, db.get_credential(id))?;
    require(AccessResolver::new(&*db).can_access_credential(
        &identity,
        &cred,
        FolderAction::Delete,
    )?)?;
    db.delete_credential(id)?;

    info!(id, by = %identity.user_id, "Credential deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}
