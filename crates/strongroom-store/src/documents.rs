//! CRUD operations for [`Document`] metadata and per-group document ACLs.
//!
//! The file bytes live in the server's blob store under `stored_filename`;
//! this table only records where they are.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use strongroom_shared::{Document, DocumentId, DocumentPermission, DocumentSeedPolicy, UserId};

use crate::database::{parse_timestamp, Database};
use crate::error::{conflict, not_found, Result, StoreError};
use crate::models::NewDocument;

const DOCUMENT_COLUMNS: &str = "id, stored_filename, original_filename, file_size, mime_type, \
                                uploaded_by, description, created_at, updated_at";

const PERMISSION_COLUMNS: &str = "document_id, user_group, can_view, can_download";

const UPSERT_PERMISSION_SQL: &str =
    "INSERT INTO document_permissions (document_id, user_group, can_view, can_download)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (document_id, user_group)
     DO UPDATE SET can_view = excluded.can_view,
                   can_download = excluded.can_download";

impl Database {
    /// Insert a document row together with the ACL rows `seed` dictates.
    /// Both land in one transaction: a document is never visible without
    /// its initial permissions.
    pub fn create_document(&self, doc: &NewDocument, seed: &DocumentSeedPolicy) -> Result<Document> {
        let now = Utc::now();
        let tx = self.conn().unchecked_transaction()?;

        tx.execute(
            "INSERT INTO documents
                 (stored_filename, original_filename, file_size, mime_type, uploaded_by,
                  description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                doc.stored_filename,
                doc.original_filename,
                doc.size,
                doc.mime_type,
                doc.owner.0,
                doc.description,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| conflict(e, "stored filename already in use"))?;

        let id = DocumentId(tx.last_insert_rowid());
        for row in seed.rows_for(id) {
            upsert_permission(&tx, &row)?;
        }
        tx.commit()?;

        tracing::debug!(document_id = %id, groups = seed.entries().len(), "document seeded");

        Ok(Document {
            id,
            stored_filename: doc.stored_filename.clone(),
            original_filename: doc.original_filename.clone(),
            size: doc.size,
            mime_type: doc.mime_type.clone(),
            owner: doc.owner,
            description: doc.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_document(&self, id: DocumentId) -> Result<Document> {
        self.conn()
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
                params![id.0],
                row_to_document,
            )
            .map_err(not_found)
    }

    /// All documents, newest first.
    pub fn list_documents(&self) -> Result<Vec<Document>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([], row_to_document)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Delete the document row; its ACL rows go with it.
    pub fn delete_document(&self, id: DocumentId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM documents WHERE id = ?1", params![id.0])?;
        Ok(affected > 0)
    }

    pub fn get_document_permission(
        &self,
        document_id: DocumentId,
        group: &str,
    ) -> Result<Option<DocumentPermission>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {PERMISSION_COLUMNS} FROM document_permissions
                     WHERE document_id = ?1 AND user_group = ?2"
                ),
                params![document_id.0, group],
                row_to_permission,
            )
            .optional()?)
    }

    pub fn list_document_permissions(
        &self,
        document_id: DocumentId,
    ) -> Result<Vec<DocumentPermission>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM document_permissions
             WHERE document_id = ?1 ORDER BY user_group ASC"
        ))?;
        let rows = stmt.query_map(params![document_id.0], row_to_permission)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn list_all_document_permissions(&self) -> Result<Vec<DocumentPermission>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {PERMISSION_COLUMNS} FROM document_permissions"))?;
        let rows = stmt.query_map([], row_to_permission)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Upsert keyed by `(document_id, group)`.
    pub fn set_document_permission(&self, perm: &DocumentPermission) -> Result<()> {
        upsert_permission(self.conn(), perm).map_err(|e| match e {
            StoreError::Conflict(_) => StoreError::NotFound,
            other => other,
        })
    }
}

fn upsert_permission(conn: &Connection, perm: &DocumentPermission) -> Result<()> {
    conn.execute(
        UPSERT_PERMISSION_SQL,
        params![
            perm.document_id.0,
            perm.group,
            perm.can_view,
            perm.can_download,
        ],
    )
    .map_err(|e| conflict(e, "document does not exist"))?;
    Ok(())
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let created_str: String = row.get(7)?;
    let updated_str: String = row.get(8)?;

    Ok(Document {
        id: DocumentId(row.get(0)?),
        stored_filename: row.get(1)?,
        original_filename: row.get(2)?,
        size: row.get(3)?,
        mime_type: row.get(4)?,
        owner: UserId(row.get(5)?),
        description: row.get(6)?,
        created_at: parse_timestamp(7, &created_str)?,
        updated_at: parse_timestamp(8, &updated_str)?,
    })
}

fn row_to_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentPermission> {
    Ok(DocumentPermission {
        document_id: DocumentId(row.get(0)?),
        group: row.get(1)?,
        can_view: row.get(2)?,
        can_download: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use strongroom_shared::DocumentAction;

    use super::*;

    fn new_doc(key: &str) -> NewDocument {
        NewDocument {
            stored_filename: key.into(),
            original_filename: "runbook.pdf".into(),
            size: 1024,
            mime_type: "application/pdf".into(),
            owner: UserId(1),
            description: "on-call runbook".into(),
        }
    }

    #[test]
    fn create_seeds_default_permissions() {
        let db = Database::open_in_memory().unwrap();
        let doc = db
            .create_document(&new_doc("a1"), &DocumentSeedPolicy::default())
            .unwrap();

        let rows = db.list_document_permissions(doc.id).unwrap();
        let groups: Vec<&str> = rows.iter().map(|r| r.group.as_str()).collect();
        assert_eq!(groups, vec!["admin", "junior", "senior"]);

        let junior = db.get_document_permission(doc.id, "junior").unwrap().unwrap();
        assert!(junior.allows(DocumentAction::View));
        assert!(!junior.allows(DocumentAction::Download));
        let senior = db.get_document_permission(doc.id, "senior").unwrap().unwrap();
        assert!(senior.allows(DocumentAction::Download));
    }

    #[test]
    fn custom_seed_policy() {
        let db = Database::open_in_memory().unwrap();
        let seed = DocumentSeedPolicy::parse("ops:view").unwrap();
        let doc = db.create_document(&new_doc("a1"), &seed).unwrap();

        assert_eq!(db.list_document_permissions(doc.id).unwrap().len(), 1);
        assert!(db.get_document_permission(doc.id, "senior").unwrap().is_none());
    }

    #[test]
    fn duplicate_key_rolls_back_everything() {
        let db = Database::open_in_memory().unwrap();
        db.create_document(&new_doc("a1"), &DocumentSeedPolicy::default())
            .unwrap();

        assert!(matches!(
            db.create_document(&new_doc("a1"), &DocumentSeedPolicy::default()),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(db.list_documents().unwrap().len(), 1);
        assert_eq!(db.list_all_document_permissions().unwrap().len(), 3);
    }

    #[test]
    fn upsert_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let doc = db
            .create_document(&new_doc("a1"), &DocumentSeedPolicy::default())
            .unwrap();

        db.set_document_permission(&DocumentPermission {
            document_id: doc.id,
            group: "junior".into(),
            can_view: true,
            can_download: true,
        })
        .unwrap();
        let junior = db.get_document_permission(doc.id, "junior").unwrap().unwrap();
        assert!(junior.can_download);
        assert_eq!(db.list_document_permissions(doc.id).unwrap().len(), 3);

        assert!(db.delete_document(doc.id).unwrap());
        assert!(db.list_all_document_permissions().unwrap().is_empty());
        assert!(matches!(db.get_document(doc.id), Err(StoreError::NotFound)));
    }

    #[test]
    fn permission_on_missing_document_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.set_document_permission(&DocumentPermission {
                document_id: DocumentId(5),
                group: "ops".into(),
                can_view: true,
                can_download: false,
            }),
            Err(StoreError::NotFound)
        ));
    }
}
