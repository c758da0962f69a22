//! CRUD operations for [`Group`] records.
//!
//! Users and ACL rows refer to groups by name, so a rename rewrites those
//! references in the same transaction.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use strongroom_shared::Group;

use crate::database::{parse_timestamp, Database};
use crate::error::{conflict, not_found, Result, StoreError};
use crate::models::GroupUpdate;

impl Database {
    /// Insert a group. Names are unique.
    pub fn create_group(&self, name: &str, description: &str) -> Result<Group> {
        if self.find_group_by_name(name)?.is_some() {
            return Err(StoreError::Conflict(format!("group '{name}' already exists")));
        }

        let now = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO user_groups (name, description, created_at) VALUES (?1, ?2, ?3)",
                params![name, description, now.to_rfc3339()],
            )
            .map_err(|e| conflict(e, "group already exists"))?;

        Ok(Group {
            id: self.conn().last_insert_rowid(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: now,
        })
    }

    pub fn get_group(&self, id: i64) -> Result<Group> {
        self.conn()
            .query_row(
                "SELECT id, name, description, created_at FROM user_groups WHERE id = ?1",
                params![id],
                row_to_group,
            )
            .map_err(not_found)
    }

    pub fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, name, description, created_at FROM user_groups WHERE name = ?1",
                params![name],
                row_to_group,
            )
            .optional()?)
    }

    pub fn list_groups(&self) -> Result<Vec<Group>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name, description, created_at FROM user_groups ORDER BY name ASC")?;
        let rows = stmt.query_map([], row_to_group)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Apply a partial update. Empty strings count as "keep".
    pub fn update_group(&self, id: i64, update: &GroupUpdate) -> Result<Group> {
        let mut group = self.get_group(id)?;
        let old_name = group.name.clone();

        if let Some(name) = update.name.as_deref().filter(|n| !n.is_empty()) {
            group.name = name.to_string();
        }
        if let Some(description) = update.description.as_deref().filter(|d| !d.is_empty()) {
            group.description = description.to_string();
        }

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "UPDATE user_groups SET name = ?1, description = ?2 WHERE id = ?3",
            params![group.name, group.description, id],
        )
        .map_err(|e| conflict(e, "group name already taken"))?;

        if group.name != old_name {
            for table in ["users", "folder_permissions", "document_permissions"] {
                tx.execute(
                    &format!("UPDATE {table} SET user_group = ?1 WHERE user_group = ?2"),
                    params![group.name, old_name],
                )
                .map_err(|e| conflict(e, "renamed group collides with an existing ACL row"))?;
            }
            tracing::info!(from = %old_name, to = %group.name, "group renamed");
        }
        tx.commit()?;

        Ok(group)
    }

    /// Delete a group and every folder and document grant made to its name.
    /// Refused while any user still belongs to it.
    pub fn delete_group(&self, id: i64) -> Result<()> {
        let group = self.get_group(id)?;

        let users = self.count_users_in_group(&group.name)?;
        if users > 0 {
            return Err(StoreError::GroupInUse {
                name: group.name,
                users,
            });
        }

        let tx = self.conn().unchecked_transaction()?;
        let mut revoked = 0;
        for table in ["folder_permissions", "document_permissions"] {
            revoked += tx.execute(
                &format!("DELETE FROM {table} WHERE user_group = ?1"),
                params![group.name],
            )?;
        }
        tx.execute("DELETE FROM user_groups WHERE id = ?1", params![id])?;
        tx.commit()?;

        tracing::info!(group = %group.name, revoked, "group deleted");
        Ok(())
    }
}

fn row_to_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    let created_str: String = row.get(3)?;
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_timestamp(3, &created_str)?,
    })
}
