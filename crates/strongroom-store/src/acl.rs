//! The store as an ACL source for [`AccessResolver`].
//!
//! Single-resource checks go straight to SQLite through the
//! [`AclSource`] impl on [`Database`]. Listings load everything once with
//! [`Database::acl_snapshot`] and filter in memory.
//!
//! [`AccessResolver`]: strongroom_shared::AccessResolver

use strongroom_shared::{
    AccessError, AclSnapshot, AclSource, DocumentId, DocumentPermission, FolderId,
    FolderPermission,
};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Every folder and document ACL row, indexed for lookup.
    pub fn acl_snapshot(&self) -> Result<AclSnapshot> {
        Ok(AclSnapshot::from_rows(
            self.list_all_folder_permissions()?,
            self.list_all_document_permissions()?,
        ))
    }
}

fn unavailable(e: StoreError) -> AccessError {
    tracing::warn!(error = %e, "ACL lookup failed");
    AccessError::RepositoryUnavailable(e.to_string())
}

impl AclSource for Database {
    fn folder_permission(
        &self,
        folder_id: FolderId,
        group: &str,
    ) -> std::result::Result<Option<FolderPermission>, AccessError> {
        self.get_folder_permission(folder_id, group)
            .map_err(unavailable)
    }

    fn document_permission(
        &self,
        document_id: DocumentId,
        group: &str,
    ) -> std::result::Result<Option<DocumentPermission>, AccessError> {
        self.get_document_permission(document_id, group)
            .map_err(unavailable)
    }
}
