//! CRUD operations for [`Service`] endpoint records.

use chrono::Utc;
use rusqlite::params;
use strongroom_shared::{FolderId, Service, UserId};

use crate::database::{parse_timestamp, Database};
use crate::error::{conflict, not_found, Result, StoreError};
use crate::models::NewService;

const SERVICE_COLUMNS: &str = "id, user_id, folder_id, service_name, hostname, ip_address, port, \
                               description, created_at, updated_at";

impl Database {
    pub fn create_service(&self, svc: &NewService) -> Result<Service> {
        let now = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO services
                     (user_id, folder_id, service_name, hostname, ip_address, port, description,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    svc.owner.0,
                    svc.folder_id.map(|f| f.0),
                    svc.service_name,
                    svc.hostname,
                    svc.ip_address,
                    svc.port,
                    svc.description,
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| conflict(e, "folder does not exist"))?;

        Ok(Service {
            id: self.conn().last_insert_rowid(),
            owner: svc.owner,
            folder_id: svc.folder_id,
            service_name: svc.service_name.clone(),
            hostname: svc.hostname.clone(),
            ip_address: svc.ip_address.clone(),
            port: svc.port,
            description: svc.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_service(&self, id: i64) -> Result<Service> {
        self.conn()
            .query_row(
                &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
                params![id],
                row_to_service,
            )
            .map_err(not_found)
    }

    pub fn list_services(&self) -> Result<Vec<Service>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services ORDER BY service_name ASC, id ASC"
        ))?;
        let rows = stmt.query_map([], row_to_service)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Persist the mutable fields of `svc` and bump `updated_at`.
    pub fn update_service(&self, svc: &Service) -> Result<Service> {
        let affected = self
            .conn()
            .execute(
                "UPDATE services
                 SET folder_id = ?1, service_name = ?2, hostname = ?3, ip_address = ?4,
                     port = ?5, description = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    svc.folder_id.map(|f| f.0),
                    svc.service_name,
                    svc.hostname,
                    svc.ip_address,
                    svc.port,
                    svc.description,
                    Utc::now().to_rfc3339(),
                    svc.id,
                ],
            )
            .map_err(|e| conflict(e, "folder does not exist"))?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_service(svc.id)
    }

    pub fn delete_service(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM services WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

fn row_to_service(row: &rusqlite::Row<'_>) -> rusqlite::Result<Service> {
    let folder_id: Option<i64> = row.get(2)?;
    let created_str: String = row.get(8)?;
    let updated_str: String = row.get(9)?;

    Ok(Service {
        id: row.get(0)?,
        owner: UserId(row.get(1)?),
        folder_id: folder_id.map(FolderId),
        service_name: row.get(3)?,
        hostname: row.get(4)?,
        ip_address: row.get(5)?,
        port: row.get(6)?,
        description: row.get(7)?,
        created_at: parse_timestamp(8, &created_str)?,
        updated_at: parse_timestamp(9, &updated_str)?,
    })
}
