use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use strongroom_shared::UserId;
use strongroom_store::{Database, NewUser, User, UserUpdate};
use tracing::info;

use super::{non_empty, require_admin, supplied, AppState};
use crate::auth::Caller;
use crate::error::ServerError;

fn valid_email(email: &str) -> Result<(), ServerError> {
    if !email.contains('@') {
        return Err(ServerError::BadRequest("Invalid email address".into()));
    }
    Ok(())
}

/// Users may only be placed in groups that exist.
fn require_group(db: &Database, group: &str) -> Result<(), ServerError> {
    if db.find_group_by_name(group)?.is_none() {
        return Err(ServerError::BadRequest(format!("Unknown group '{group}'")));
    }
    Ok(())
}

pub(super) async fn list(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<Vec<User>>, ServerError> {
    require_admin(&identity)?;
    let users = state.db.lock().await.list_users()?;
    Ok(Json(users))
}

pub(super) async fn create(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    require_admin(&identity)?;
    non_empty(&req.email, "email")?;
    non_empty(&req.group, "group")?;
    valid_email(&req.email)?;

    let db = state.db.lock().await;
    require_group(&db, &req.group)?;
    let user = db.create_user(&req)?;

    info!(id = %user.id, group = %user.group, role = %user.role, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
    Json(req): Json<UserUpdate>,
) -> Result<Json<User>, ServerError> {
    require_admin(&identity)?;

    let update = UserUpdate {
        email: supplied(req.email),
        role: req.role,
        group: supplied(req.group),
    };
    if let Some(email) = update.email.as_deref() {
        valid_email(email)?;
    }

    let db = state.db.lock().await;
    if let Some(group) = update.group.as_deref() {
        require_group(&db, group)?;
    }
    let user = db.update_user(UserId(id), &update)?;

    info!(id = %user.id, group = %user.group, role = %user.role, "User updated");
    Ok(Json(user))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ServerError> {
    require_admin(&identity)?;
    if identity.user_id == UserId(id) {
        return Err(ServerError::BadRequest("Cannot delete your own account".into()));
    }

    state.db.lock().await.delete_user(UserId(id))?;

    info!(id, by = %identity.user_id, "User deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn admin_manages_directory() {
        let app = app().await;
        let admin = admin();
        app.state.db.lock().await.create_group("ops", "").unwrap();

        let (status, body) = app
            .call(
                Method::POST,
                "/api/users",
                &admin,
                Some(json!({ "email": "kim@example.com", "role": "user", "group": "ops" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["group"], "ops");

        let (status, body) = app.call(Method::GET, "/api/users", &admin, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_unknown_group_and_duplicates() {
        let app = app().await;
        let admin = admin();
        app.state.db.lock().await.create_group("ops", "").unwrap();

        let user = json!({ "email": "kim@example.com", "role": "user", "group": "nope" });
        let (status, _) = app
            .call(Method::POST, "/api/users", &admin, Some(user))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let user = json!({ "email": "kim@example.com", "role": "user", "group": "ops" });
        app.call(Method::POST, "/api/users", &admin, Some(user.clone()))
            .await;
        let (status, _) = app
            .call(Method::POST, "/api/users", &admin, Some(user))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn moving_users_frees_a_group_for_deletion() {
        let app = app().await;
        let admin = admin();
        let (ops, eng) = {
            let db = app.state.db.lock().await;
            (db.create_group("ops", "").unwrap(), db.create_group("eng", "").unwrap())
        };
        let (_, user) = app
            .call(
                Method::POST,
                "/api/users",
                &admin,
                Some(json!({ "email": "kim@example.com", "role": "user", "group": "ops" })),
            )
            .await;
        let uri = format!("/api/users/{}", user["id"]);
        let group_uri = format!("/api/groups/{}", ops.id);

        let (status, _) = app.call(Method::DELETE, &group_uri, &admin, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .call(Method::PUT, &uri, &admin, Some(json!({ "group": "nope" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, moved) = app
            .call(Method::PUT, &uri, &admin, Some(json!({ "group": eng.name, "email": "" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["group"], "eng");
        assert_eq!(moved["email"], "kim@example.com");

        let (status, _) = app.call(Method::DELETE, &group_uri, &admin, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn delete_user() {
        let app = app().await;
        let admin = admin();
        app.state.db.lock().await.create_group("ops", "").unwrap();
        for email in ["root@example.com", "kim@example.com"] {
            app.call(
                Method::POST,
                "/api/users",
                &admin,
                Some(json!({ "email": email, "role": "user", "group": "ops" })),
            )
            .await;
        }
        let uri = "/api/users/2";

        let (status, _) = app.call(Method::DELETE, uri, &member(3, "ops"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.call(Method::DELETE, uri, &admin, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call(Method::DELETE, uri, &admin, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The calling admin is user 1.
        let (status, _) = app.call(Method::DELETE, "/api/users/1", &admin, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn members_cannot_list_users() {
        let app = app().await;
        let (status, _) = app
            .call(Method::GET, "/api/users", &member(2, "ops"), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
