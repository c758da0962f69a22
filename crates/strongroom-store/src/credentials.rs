//! CRUD operations for [`Credential`] records. Secrets are stored exactly as
//! the caller sealed them.

use chrono::Utc;
use rusqlite::params;
use strongroom_shared::{Credential, FolderId, SealedSecret, UserId};

use crate::database::{parse_timestamp, Database};
use crate::error::{conflict, not_found, Result, StoreError};
use crate::models::NewCredential;

const CREDENTIAL_COLUMNS: &str =
    "id, user_id, folder_id, service_name, username, secret, notes, created_at, updated_at";

impl Database {
    pub fn create_credential(&self, cred: &NewCredential) -> Result<Credential> {
        let now = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO credentials
                     (user_id, folder_id, service_name, username, secret, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    cred.owner.0,
                    cred.folder_id.map(|f| f.0),
                    cred.service_name,
                    cred.username,
                    cred.secret.as_str(),
                    cred.notes,
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| conflict(e, "folder does not exist"))?;

        Ok(Credential {
            id: self.conn().last_insert_rowid(),
            owner: cred.owner,
            folder_id: cred.folder_id,
            service_name: cred.service_name.clone(),
            username: cred.username.clone(),
            secret: cred.secret.clone(),
            notes: cred.notes.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_credential(&self, id: i64) -> Result<Credential> {
        self.conn()
            .query_row(
                &format!("SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE id = ?1"),
                params![id],
                row_to_credential,
            )
            .map_err(not_found)
    }

    /// All credentials, newest first.
    pub fn list_credentials(&self) -> Result<Vec<Credential>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], row_to_credential)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Persist every mutable field of `cred` and bump `updated_at`.
    /// Ownership and creation time are never rewritten.
    pub fn update_credential(&self, cred: &Credential) -> Result<Credential> {
        let now = Utc::now();
        let affected = self
            .conn()
            .execute(
                "UPDATE credentials
                 SET folder_id = ?1, service_name = ?2, username = ?3, secret = ?4,
                     notes = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    cred.folder_id.map(|f| f.0),
                    cred.service_name,
                    cred.username,
                    cred.secret.as_str(),
                    cred.notes,
                    now.to_rfc3339(),
                    cred.id,
                ],
            )
            .map_err(|e| conflict(e, "folder does not exist"))?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_credential(cred.id)
    }

    /// Delete a credential by id.  Returns `true` if a row was deleted.
    pub fn delete_credential(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM credentials WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

fn row_to_credential(row: &rusqlite::Row<'_>) -> rusqlite::Result<Credential> {
    let folder_id: Option<i64> = row.get(2)?;
    let secret: String = row.get(5)?;
    let created_str: String = row.get(7)?;
    let updated_str: String = row.get(8)?;

    Ok(Credential {
        id: row.get(0)?,
        owner: UserId(row.get(1)?),
        folder_id: folder_id.map(FolderId),
        service_name: row.get(3)?,
        username: row.get(4)?,
        secret: SealedSecret::from_stored(secret),
        notes: row.get(6)?,
        created_at: parse_timestamp(7, &created_str)?,
        updated_at: parse_timestamp(8, &updated_str)?,
    })
}
