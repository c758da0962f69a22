use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use strongroom_shared::Group;
use strongroom_store::GroupUpdate;
use tracing::info;

use super::{non_empty, require_admin, AppState};
use crate::auth::Caller;
use crate::error::ServerError;

#[derive(Deserialize)]
pub(super) struct CreateGroupRequest {
    name: String,
    #[serde(default)]
    description: String,
}

pub(super) async fn list(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<Vec<Group>>, ServerError> {
    require_admin(&identity)?;
    Ok(Json(state.db.lock().await.list_groups()?))
}

pub(super) async fn get(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<Group>, ServerError> {
    require_admin(&identity)?;
    Ok(Json(state.db.lock().await.get_group(id)?))
}

pub(super) async fn create(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), ServerError> {
    require_admin(&identity)?;
    non_empty(&req.name, "name")?;

    let group = state
        .db
        .lock()
        .await
        .create_group(req.name.trim(), &req.description)?;

    info!(id = group.id, name = %group.name, "Group created");
    Ok((StatusCode::CREATED, Json(group)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
    Json(req): Json<GroupUpdate>,
) -> Result<Json<Group>, ServerError> {
    require_admin(&identity)?;
    let group = state.db.lock().await.update_group(id, &req)?;
    Ok(Json(group))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ServerError> {
    require_admin(&identity)?;
    state.db.lock().await.delete_group(id)?;

    info!(id, "Group deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}
