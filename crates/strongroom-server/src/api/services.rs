use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use strongroom_shared::{require, AccessResolver, FolderId, Identity, Service};
use strongroom_store::NewService;
use tracing::{debug, info};

use super::{load_or_forbid, non_empty, require_folder_write, supplied, AppState};
use crate::auth::Caller;
use crate::error::ServerError;

#[derive(Deserialize)]
pub(super) struct CreateServiceRequest {
    folder_id: Option<FolderId>,
    service_name: String,
    #[serde(default)]
    hostname: String,
    #[serde(default)]
    ip_address: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub(super) struct UpdateServiceRequest {
    folder_id: Option<FolderId>,
    service_name: Option<String>,
    hostname: Option<String>,
    ip_address: Option<String>,
    port: Option<u16>,
    description: Option<String>,
}

/// Editing and deleting a service is reserved to admins and its owner,
/// whatever the folder grants.
fn require_manager(identity: &Identity, service: &Service) -> Result<(), ServerError> {
    if identity.is_admin() || service.owner == identity.user_id {
        return Ok(());
    }
    debug!(user = %identity.user_id, service = service.id, "service change refused");
    Err(ServerError::Forbidden)
}

pub(super) async fn list(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<Vec<Service>>, ServerError> {
    let (services, snapshot) = {
        let db = state.db.lock().await;
        (db.list_services()?, db.acl_snapshot()?)
    };
    Ok(Json(
        AccessResolver::new(&snapshot).filter_services(&identity, services)?,
    ))
}

pub(super) async fn get(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<Service>, ServerError> {
    let db = state.db.lock().await;
    let service = load_or_forbid(&identity, db.get_service(id))?;
    require(AccessResolver::new(&*db).can_access_service(&identity, &service)?)?;
    Ok(Json(service))
}

/// Any caller may register a service and becomes its owner. Placing it in
/// a folder needs write there.
pub(super) async fn create(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(req): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), ServerError> {
    non_empty(&req.service_name, "service_name")?;

    let db = state.db.lock().await;
    if let Some(folder_id) = req.folder_id {
        require_folder_write(&db, &identity, folder_id)?;
    }

    let service = db.create_service(&NewService {
        owner: identity.user_id,
        folder_id: req.folder_id,
        service_name: req.service_name,
        hostname: req.hostname,
        ip_address: req.ip_address,
        port: req.port,
        description: req.description,
    })?;

    info!(id = service.id, owner = %service.owner, "Service created");
    Ok((StatusCode::CREATED, Json(service)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<Service>, ServerError> {
    let db = state.db.lock().await;
    let mut service = load_or_forbid(&identity, db.get_service(id))?;
    require_manager(&identity, &service)?;

    if let Some(target) = req.folder_id.filter(|f| Some(*f) != service.folder_id) {
        require_folder_write(&db, &identity, target)?;
        service.folder_id = Some(target);
    }
    if let Some(name) = supplied(req.service_name) {
        service.service_name = name;
    }
    if let Some(hostname) = supplied(req.hostname) {
        service.hostname = hostname;
    }
    if let Some(ip_address) = supplied(req.ip_address) {
        service.ip_address = ip_address;
    }
    if let Some(port) = req.port {
        service.port = port;
    }
    if let Some(description) = supplied(req.description) {
        service.description = description;
    }

    let updated = db.update_service(&service)?;
    info!(id, by = %identity.user_id, "Service updated");
    Ok(Json(updated))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let db = state.db.lock().await;
    let service = load_or_forbid(&identity, db.get_service(id))?;
    require_manager(&identity, &service)?;
    db.delete_service(id)?;

    info!(id, by = %identity.user_id, "Service deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}
