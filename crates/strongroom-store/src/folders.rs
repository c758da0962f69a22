//! CRUD operations for [`Folder`] records and their per-group ACL rows.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use strongroom_shared::{Folder, FolderId, FolderPermission};

use crate::database::{parse_timestamp, Database};
use crate::error::{conflict, not_found, Result, StoreError};

const PERMISSION_COLUMNS: &str = "folder_id, user_group, can_read, can_write, can_delete";

impl Database {
    // ------------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------------

    pub fn create_folder(&self, name: &str, description: &str) -> Result<Folder> {
        let now = Utc::now();
        self.conn().execute(
            "INSERT INTO folders (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![name, description, now.to_rfc3339()],
        )?;

        Ok(Folder {
            id: FolderId(self.conn().last_insert_rowid()),
            name: name.to_string(),
            description: description.to_string(),
            created_at: now,
        })
    }

    pub fn get_folder(&self, id: FolderId) -> Result<Folder> {
        self.conn()
            .query_row(
                "SELECT id, name, description, created_at FROM folders WHERE id = ?1",
                params![id.0],
                row_to_folder,
            )
            .map_err(not_found)
    }

    /// List all folders, ordered by name.
    pub fn list_folders(&self) -> Result<Vec<Folder>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name, description, created_at FROM folders ORDER BY name ASC")?;
        let rows = stmt.query_map([], row_to_folder)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Delete a folder and its ACL rows. Refused while credentials or
    /// services still live in it, so nothing silently loses its folder
    /// scope. Returns `true` if a row was deleted.
    pub fn delete_folder(&self, id: FolderId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM folders WHERE id = ?1", params![id.0])
            .map_err(|e| conflict(e, "folder still holds credentials or services"))?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// The row for `(folder, group)`, if any.
    pub fn get_folder_permission(
        &self,
        folder_id: FolderId,
        group: &str,
    ) -> Result<Option<FolderPermission>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {PERMISSION_COLUMNS} FROM folder_permissions
                     WHERE folder_id = ?1 AND user_group = ?2"
                ),
                params![folder_id.0, group],
                row_to_permission,
            )
            .optional()?)
    }

    pub fn list_folder_permissions(&self, folder_id: FolderId) -> Result<Vec<FolderPermission>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM folder_permissions
             WHERE folder_id = ?1 ORDER BY user_group ASC"
        ))?;
        let rows = stmt.query_map(params![folder_id.0], row_to_permission)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn list_all_folder_permissions(&self) -> Result<Vec<FolderPermission>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {PERMISSION_COLUMNS} FROM folder_permissions"))?;
        let rows = stmt.query_map([], row_to_permission)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Upsert keyed by `(folder_id, group)`: an existing row is overwritten
    /// in place, never duplicated.
    pub fn set_folder_permission(&self, perm: &FolderPermission) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO folder_permissions (folder_id, user_group, can_read, can_write, can_delete)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (folder_id, user_group)
                 DO UPDATE SET can_read = excluded.can_read,
                               can_write = excluded.can_write,
                               can_delete = excluded.can_delete",
                params![
                    perm.folder_id.0,
                    perm.group,
                    perm.can_read,
                    perm.can_write,
                    perm.can_delete,
                ],
            )
            .map_err(|e| match conflict(e, "folder does not exist") {
                StoreError::Conflict(_) => StoreError::NotFound,
                other => other,
            })?;
        Ok(())
    }
}

fn row_to_folder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Folder> {
    let created_str: String = row.get(3)?;
    Ok(Folder {
        id: FolderId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_timestamp(3, &created_str)?,
    })
}

fn row_to_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<FolderPermission> {
    Ok(FolderPermission {
        folder_id: FolderId(row.get(0)?),
        group: row.get(1)?,
        can_read: row.get(2)?,
        can_write: row.get(3)?,
        can_delete: row.get(4)?,
    })
}
