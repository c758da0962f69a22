//! CRUD operations for [`User`] directory entries.

use chrono::Utc;
use rusqlite::params;
use strongroom_shared::{Role, UserId};

use crate::database::{parse_timestamp, Database};
use crate::error::{conflict, not_found, Result, StoreError};
use crate::models::{NewUser, User, UserUpdate};

const USER_COLUMNS: &str = "id, email, role, user_group, created_at";

impl Database {
    /// Insert a user. Email addresses are unique.
    pub fn create_user(&self, user: &NewUser) -> Result<User> {
        let now = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO users (email, role, user_group, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user.email, user.role.as_str(), user.group, now.to_rfc3339()],
            )
            .map_err(|e| conflict(e, "email already registered"))?;

        Ok(User {
            id: UserId(self.conn().last_insert_rowid()),
            email: user.email.clone(),
            role: user.role,
            group: user.group.clone(),
            created_at: now,
        })
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.0],
                row_to_user,
            )
            .map_err(not_found)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY email ASC"))?;
        let rows = stmt.query_map([], row_to_user)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Apply a partial update: move a user between groups, change role or
    /// email. Empty strings count as "keep".
    pub fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<User> {
        let mut user = self.get_user(id)?;

        if let Some(email) = update.email.as_deref().filter(|e| !e.is_empty()) {
            user.email = email.to_string();
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(group) = update.group.as_deref().filter(|g| !g.is_empty()) {
            user.group = group.to_string();
        }

        self.conn()
            .execute(
                "UPDATE users SET email = ?1, role = ?2, user_group = ?3 WHERE id = ?4",
                params![user.email, user.role.as_str(), user.group, id.0],
            )
            .map_err(|e| conflict(e, "email already registered"))?;
        Ok(user)
    }

    /// Remove a directory entry. Credentials, documents and services the user
    /// owns stay in place.
    pub fn delete_user(&self, id: UserId) -> Result<()> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id.0])?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Number of users whose group is `group`.
    pub fn count_users_in_group(&self, group: &str) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE user_group = ?1",
            params![group],
            |row| row.get(0),
        )?)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(2)?;
    let created_str: String = row.get(4)?;

    let role = role_str.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(User {
        id: UserId(row.get(0)?),
        email: row.get(1)?,
        role,
        group: row.get(3)?,
        created_at: parse_timestamp(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, group: &str) -> NewUser {
        NewUser {
            email: email.into(),
            role: Role::User,
            group: group.into(),
        }
    }

    #[test]
    fn create_get_list() {
        let db = Database::open_in_memory().unwrap();
        let bob = db.create_user(&new_user("bob@example.com", "ops")).unwrap();
        db.create_user(&new_user("alice@example.com", "eng")).unwrap();

        assert_eq!(db.get_user(bob.id).unwrap(), bob);
        let emails: Vec<String> = db.list_users().unwrap().into_iter().map(|u| u.email).collect();
        assert_eq!(emails, vec!["alice@example.com", "bob@example.com"]);
    }

    #[test]
    fn duplicate_email_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("bob@example.com", "ops")).unwrap();
        assert!(matches!(
            db.create_user(&new_user("bob@example.com", "eng")),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn count_by_group() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("a@example.com", "ops")).unwrap();
        db.create_user(&new_user("b@example.com", "ops")).unwrap();
        db.create_user(&new_user("c@example.com", "eng")).unwrap();

        assert_eq!(db.count_users_in_group("ops").unwrap(), 2);
        assert_eq!(db.count_users_in_group("hr").unwrap(), 0);
    }

    #[test]
    fn update_moves_user_between_groups() {
        let db = Database::open_in_memory().unwrap();
        let bob = db.create_user(&new_user("bob@example.com", "ops")).unwrap();

        let updated = db
            .update_user(
                bob.id,
                &UserUpdate {
                    email: Some(String::new()),
                    role: Some(Role::Admin),
                    group: Some("eng".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.email, "bob@example.com");
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.group, "eng");
        assert_eq!(db.get_user(bob.id).unwrap(), updated);
        assert_eq!(db.count_users_in_group("ops").unwrap(), 0);
    }

    #[test]
    fn update_to_taken_email_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("alice@example.com", "ops")).unwrap();
        let bob = db.create_user(&new_user("bob@example.com", "ops")).unwrap();

        let taken = UserUpdate {
            email: Some("alice@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_user(bob.id, &taken),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            db.update_user(UserId(404), &UserUpdate::default()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn delete_user() {
        let db = Database::open_in_memory().unwrap();
        let bob = db.create_user(&new_user("bob@example.com", "ops")).unwrap();

        db.delete_user(bob.id).unwrap();
        assert!(matches!(db.get_user(bob.id), Err(StoreError::NotFound)));
        assert!(matches!(db.delete_user(bob.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn missing_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_user(UserId(404)), Err(StoreError::NotFound)));
    }
}
