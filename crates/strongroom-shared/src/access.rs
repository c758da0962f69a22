//! Authorization decisions for folders, credentials, documents and services.
//!
//! Three ACL shapes, one decision function each:
//!
//! | resource   | admin | owner  | no folder | otherwise                          |
//! |------------|-------|--------|-----------|------------------------------------|
//! | Folder     | allow | n/a    | n/a       | folder row flag for the action     |
//! | Credential | allow | allow  | deny      | folder row flag for the action     |
//! | Document   | allow | no say | n/a       | document row flag for the action   |
//! | Service    | allow | allow  | allow     | folder row exists with `can_read`  |
//!
//! A missing row is a plain "no". Only a failing lookup is an error.

use std::collections::HashMap;

use tracing::debug;

use crate::error::AccessError;
use crate::types::{
    Credential, Document, DocumentAction, DocumentId, DocumentPermission, FolderAction, FolderId,
    FolderPermission, Identity, Service,
};

/// Read access to ACL rows, keyed by `(resource, group)`.
///
/// Implementations return `Ok(None)` when no row exists and
/// `Err(AccessError::RepositoryUnavailable)` only when the lookup itself
/// failed.
pub trait AclSource {
    fn folder_permission(
        &self,
        folder_id: FolderId,
        group: &str,
    ) -> Result<Option<FolderPermission>, AccessError>;

    fn document_permission(
        &self,
        document_id: DocumentId,
        group: &str,
    ) -> Result<Option<DocumentPermission>, AccessError>;
}

/// All ACL rows loaded up front, so filtering a listing never goes back to
/// storage per item.
#[derive(Debug, Clone, Default)]
pub struct AclSnapshot {
    folders: HashMap<FolderId, HashMap<String, FolderPermission>>,
    documents: HashMap<DocumentId, HashMap<String, DocumentPermission>>,
}

impl AclSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(
        folder_rows: impl IntoIterator<Item = FolderPermission>,
        document_rows: impl IntoIterator<Item = DocumentPermission>,
    ) -> Self {
        let mut snapshot = Self::new();
        for row in folder_rows {
            snapshot.put_folder_permission(row);
        }
        for row in document_rows {
            snapshot.put_document_permission(row);
        }
        snapshot
    }

    /// Upsert: a second row for the same `(folder, group)` replaces the first.
    pub fn put_folder_permission(&mut self, row: FolderPermission) {
        self.folders
            .entry(row.folder_id)
            .or_default()
            .insert(row.group.clone(), row);
    }

    /// Upsert: a second row for the same `(document, group)` replaces the first.
    pub fn put_document_permission(&mut self, row: DocumentPermission) {
        self.documents
            .entry(row.document_id)
            .or_default()
            .insert(row.group.clone(), row);
    }
}

impl AclSource for AclSnapshot {
    fn folder_permission(
        &self,
        folder_id: FolderId,
        group: &str,
    ) -> Result<Option<FolderPermission>, AccessError> {
        Ok(self
            .folders
            .get(&folder_id)
            .and_then(|rows| rows.get(group))
            .cloned())
    }

    fn document_permission(
        &self,
        document_id: DocumentId,
        group: &str,
    ) -> Result<Option<DocumentPermission>, AccessError> {
        Ok(self
            .documents
            .get(&document_id)
            .and_then(|rows| rows.get(group))
            .cloned())
    }
}

/// Turn a decision into `Err(PermissionDenied)` for `?`-style handlers.
pub fn require(granted: bool) -> Result<(), AccessError> {
    if granted {
        Ok(())
    } else {
        Err(AccessError::PermissionDenied)
    }
}

/// Stateless decision maker over an [`AclSource`].
pub struct AccessResolver<'a, S: AclSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: AclSource + ?Sized> AccessResolver<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Folder ACL: the row for the caller's group decides, flag by flag.
    /// `write` does not imply `read`.
    pub fn can_access_folder(
        &self,
        identity: &Identity,
        folder_id: FolderId,
        action: FolderAction,
    ) -> Result<bool, AccessError> {
        if identity.is_admin() {
            return Ok(true);
        }

        let granted = self
            .source
            .folder_permission(folder_id, &identity.group)?
            .map(|row| row.allows(action))
            .unwrap_or(false);

        if !granted {
            debug!(
                user = %identity.user_id,
                group = %identity.group,
                folder = %folder_id,
                action = action.as_str(),
                "folder access denied"
            );
        }
        Ok(granted)
    }

    /// Owners keep full control whatever the folder says. Without a folder,
    /// nobody but the owner gets in.
    pub fn can_access_credential(
        &self,
        identity: &Identity,
        credential: &Credential,
        action: FolderAction,
    ) -> Result<bool, AccessError> {
        if identity.is_admin() || credential.owner == identity.user_id {
            return Ok(true);
        }

        match credential.folder_id {
            Some(folder_id) => self.can_access_folder(identity, folder_id, action),
            None => {
                debug!(
                    user = %identity.user_id,
                    credential = credential.id,
                    "unscoped credential is owner-only"
                );
                Ok(false)
            }
        }
    }

    /// Document ACL. The uploader gets no special treatment: only the row
    /// for their group counts.
    pub fn can_access_document(
        &self,
        identity: &Identity,
        document: &Document,
        action: DocumentAction,
    ) -> Result<bool, AccessError> {
        if identity.is_admin() {
            return Ok(true);
        }

        let granted = self
            .source
            .document_permission(document.id, &identity.group)?
            .map(|row| row.allows(action))
            .unwrap_or(false);

        if !granted {
            debug!(
                user = %identity.user_id,
                group = %identity.group,
                document = %document.id,
                action = action.as_str(),
                "document access denied"
            );
        }
        Ok(granted)
    }

    /// Service visibility. Unscoped services are visible to everyone; scoped
    /// ones need a folder row with `can_read` for the caller's group.
    pub fn can_access_service(
        &self,
        identity: &Identity,
        service: &Service,
    ) -> Result<bool, AccessError> {
        if identity.is_admin() || service.owner == identity.user_id {
            return Ok(true);
        }

        let Some(folder_id) = service.folder_id else {
            return Ok(true);
        };

        Ok(self
            .source
            .folder_permission(folder_id, &identity.group)?
            .is_some_and(|row| row.can_read))
    }

    pub fn filter_credentials(
        &self,
        identity: &Identity,
        credentials: Vec<Credential>,
    ) -> Result<Vec<Credential>, AccessError> {
        retain_visible(credentials, |c| {
            self.can_access_credential(identity, c, FolderAction::Read)
        })
    }

    pub fn filter_documents(
        &self,
        identity: &Identity,
        documents: Vec<Document>,
    ) -> Result<Vec<Document>, AccessError> {
        retain_visible(documents, |d| {
            self.can_access_document(identity, d, DocumentAction::View)
        })
    }

    pub fn filter_services(
        &self,
        identity: &Identity,
        services: Vec<Service>,
    ) -> Result<Vec<Service>, AccessError> {
        retain_visible(services, |s| self.can_access_service(identity, s))
    }
}

// Order-preserving; the first lookup failure aborts the whole listing.
fn retain_visible<T>(
    items: Vec<T>,
    mut visible: impl FnMut(&T) -> Result<bool, AccessError>,
) -> Result<Vec<T>, AccessError> {
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        if visible(&item)? {
            kept.push(item);
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::crypto::SealedSecret;
    use crate::types::{Role, UserId};

    struct Unavailable;

    impl AclSource for Unavailable {
        fn folder_permission(
            &self,
            _: FolderId,
            _: &str,
        ) -> Result<Option<FolderPermission>, AccessError> {
            Err(AccessError::RepositoryUnavailable("connection refused".into()))
        }

        fn document_permission(
            &self,
            _: DocumentId,
            _: &str,
        ) -> Result<Option<DocumentPermission>, AccessError> {
            Err(AccessError::RepositoryUnavailable("connection refused".into()))
        }
    }

    const F: FolderId = FolderId(10);

    fn user(id: i64, group: &str) -> Identity {
        Identity::new(UserId(id), Role::User, group)
    }

    fn admin() -> Identity {
        Identity::new(UserId(99), Role::Admin, "nobody")
    }

    fn folder_row(group: &str, read: bool, write: bool, delete: bool) -> FolderPermission {
        FolderPermission {
            folder_id: F,
            group: group.into(),
            can_read: read,
            can_write: write,
            can_delete: delete,
        }
    }

    fn credential(id: i64, owner: i64, folder_id: Option<FolderId>) -> Credential {
        Credential {
            id,
            owner: UserId(owner),
            folder_id,
            service_name: "postgres".into(),
            username: "app".into(),
            secret: SealedSecret::from_stored("sealed"),
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn document(id: i64, owner: i64) -> Document {
        Document {
            id: DocumentId(id),
            stored_filename: format!("{id}.pdf"),
            original_filename: "runbook.pdf".into(),
            size: 1024,
            mime_type: "application/pdf".into(),
            owner: UserId(owner),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(id: i64, owner: i64, folder_id: Option<FolderId>) -> Service {
        Service {
            id,
            owner: UserId(owner),
            folder_id,
            service_name: "grafana".into(),
            hostname: "grafana.internal".into(),
            ip_address: "10.0.0.5".into(),
            port: 3000,
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ops_read_only() -> AclSnapshot {
        AclSnapshot::from_rows([folder_row("ops", true, false, false)], [])
    }

    #[test]
    fn test_ops_reader_can_read_but_not_write_folder_credential() {
        let acl = ops_read_only();
        let resolver = AccessResolver::new(&acl);
        let cred = credential(1, 2, Some(F));
        let ops = user(1, "ops");

        assert!(resolver
            .can_access_credential(&ops, &cred, FolderAction::Read)
            .unwrap());
        assert!(!resolver
            .can_access_credential(&ops, &cred, FolderAction::Write)
            .unwrap());
    }

    #[test]
    fn test_owner_keeps_full_control_regardless_of_folder() {
        let acl = ops_read_only();
        let resolver = AccessResolver::new(&acl);
        let cred = credential(1, 2, Some(F));
        let owner = user(2, "eng");

        for action in [FolderAction::Read, FolderAction::Write, FolderAction::Delete] {
            assert!(resolver.can_access_credential(&owner, &cred, action).unwrap());
        }
    }

    #[test]
    fn test_folder_without_row_denies_every_action() {
        let acl = AclSnapshot::new();
        let resolver = AccessResolver::new(&acl);
        let cred = credential(1, 2, Some(F));
        let stranger = user(3, "ops");

        for action in [FolderAction::Read, FolderAction::Write, FolderAction::Delete] {
            assert!(!resolver.can_access_folder(&stranger, F, action).unwrap());
            assert!(!resolver
                .can_access_credential(&stranger, &cred, action)
                .unwrap());
        }
    }

    #[test]
    fn test_write_does_not_imply_read() {
        let acl = AclSnapshot::from_rows([folder_row("ops", false, true, false)], []);
        let resolver = AccessResolver::new(&acl);
        let ops = user(1, "ops");

        assert!(resolver.can_access_folder(&ops, F, FolderAction::Write).unwrap());
        assert!(!resolver.can_access_folder(&ops, F, FolderAction::Read).unwrap());
        assert!(!resolver.can_access_folder(&ops, F, FolderAction::Delete).unwrap());
    }

    #[test]
    fn test_rows_for_other_groups_do_not_leak() {
        let acl = ops_read_only();
        let resolver = AccessResolver::new(&acl);
        assert!(!resolver
            .can_access_folder(&user(1, "eng"), F, FolderAction::Read)
            .unwrap());
    }

    #[test]
    fn test_unscoped_credential_is_owner_only() {
        let acl = ops_read_only();
        let resolver = AccessResolver::new(&acl);
        let cred = credential(1, 2, None);

        assert!(!resolver
            .can_access_credential(&user(3, "ops"), &cred, FolderAction::Read)
            .unwrap());
        assert!(resolver
            .can_access_credential(&user(2, "ops"), &cred, FolderAction::Delete)
            .unwrap());
    }

    #[test]
    fn test_admin_bypasses_without_consulting_rows() {
        let resolver = AccessResolver::new(&Unavailable);
        let admin = admin();

        for action in [FolderAction::Read, FolderAction::Write, FolderAction::Delete] {
            assert!(resolver.can_access_folder(&admin, F, action).unwrap());
            assert!(resolver
                .can_access_credential(&admin, &credential(1, 2, Some(F)), action)
                .unwrap());
            assert!(resolver
                .can_access_credential(&admin, &credential(1, 2, None), action)
                .unwrap());
        }
        for action in [DocumentAction::View, DocumentAction::Download] {
            assert!(resolver
                .can_access_document(&admin, &document(1, 2), action)
                .unwrap());
        }
        assert!(resolver
            .can_access_service(&admin, &service(1, 2, Some(F)))
            .unwrap());
    }

    #[test]
    fn test_junior_can_view_but_not_download() {
        let acl = AclSnapshot::from_rows(
            [],
            [DocumentPermission {
                document_id: DocumentId(1),
                group: "junior".into(),
                can_view: true,
                can_download: false,
            }],
        );
        let resolver = AccessResolver::new(&acl);
        let junior = user(5, "junior");
        let doc = document(1, 2);

        assert!(resolver
            .can_access_document(&junior, &doc, DocumentAction::View)
            .unwrap());
        assert!(!resolver
            .can_access_document(&junior, &doc, DocumentAction::Download)
            .unwrap());
    }

    #[test]
    fn test_document_uploader_has_no_bypass() {
        let acl = AclSnapshot::new();
        let resolver = AccessResolver::new(&acl);
        let uploader = user(2, "contractors");
        let doc = document(1, 2);

        assert!(!resolver
            .can_access_document(&uploader, &doc, DocumentAction::View)
            .unwrap());
    }

    #[test]
    fn test_unscoped_service_visible_to_strangers() {
        let resolver = AccessResolver::new(&Unavailable);
        assert!(resolver
            .can_access_service(&user(42, "nobody"), &service(1, 2, None))
            .unwrap());
    }

    #[test]
    fn test_scoped_service_needs_read_row() {
        let acl = AclSnapshot::from_rows(
            [
                folder_row("ops", true, false, false),
                folder_row("eng", false, true, true),
            ],
            [],
        );
        let resolver = AccessResolver::new(&acl);
        let svc = service(1, 2, Some(F));

        assert!(resolver.can_access_service(&user(3, "ops"), &svc).unwrap());
        assert!(!resolver.can_access_service(&user(3, "eng"), &svc).unwrap());
        assert!(!resolver.can_access_service(&user(3, "hr"), &svc).unwrap());
        assert!(resolver.can_access_service(&user(2, "hr"), &svc).unwrap());
    }

    #[test]
    fn test_filters_preserve_order() {
        let acl = ops_read_only();
        let resolver = AccessResolver::new(&acl);
        let ops = user(1, "ops");

        let creds = vec![
            credential(1, 7, Some(F)),
            credential(2, 7, None),
            credential(3, 1, None),
            credential(4, 7, Some(FolderId(11))),
            credential(5, 7, Some(F)),
        ];
        let ids: Vec<i64> = resolver
            .filter_credentials(&ops, creds)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 5]);

        let services = vec![
            service(1, 7, Some(FolderId(11))),
            service(2, 7, None),
            service(3, 7, Some(F)),
        ];
        let ids: Vec<i64> = resolver
            .filter_services(&ops, services)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_filter_documents_by_view() {
        let acl = AclSnapshot::from_rows(
            [],
            [
                DocumentPermission {
                    document_id: DocumentId(1),
                    group: "junior".into(),
                    can_view: true,
                    can_download: false,
                },
                DocumentPermission {
                    document_id: DocumentId(2),
                    group: "junior".into(),
                    can_view: false,
                    can_download: true,
                },
            ],
        );
        let resolver = AccessResolver::new(&acl);
        let docs = vec![document(3, 5), document(2, 5), document(1, 5)];
        let visible = resolver.filter_documents(&user(5, "junior"), docs).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, DocumentId(1));
    }

    #[test]
    fn test_lookup_failure_propagates() {
        let resolver = AccessResolver::new(&Unavailable);
        let ops = user(1, "ops");

        assert!(matches!(
            resolver.can_access_folder(&ops, F, FolderAction::Read),
            Err(AccessError::RepositoryUnavailable(_))
        ));
        assert!(matches!(
            resolver.filter_credentials(&ops, vec![credential(1, 7, Some(F))]),
            Err(AccessError::RepositoryUnavailable(_))
        ));
        // Owner short-circuit never reaches the source.
        assert!(resolver
            .can_access_credential(&ops, &credential(1, 1, Some(F)), FolderAction::Write)
            .unwrap());
    }

    #[test]
    fn test_snapshot_upsert_replaces_row() {
        let mut acl = ops_read_only();
        acl.put_folder_permission(folder_row("ops", false, true, false));
        let resolver = AccessResolver::new(&acl);
        let ops = user(1, "ops");

        assert!(!resolver.can_access_folder(&ops, F, FolderAction::Read).unwrap());
        assert!(resolver.can_access_folder(&ops, F, FolderAction::Write).unwrap());
    }

    #[test]
    fn test_require() {
        assert!(require(true).is_ok());
        assert_eq!(require(false), Err(AccessError::PermissionDenied));
    }
}
