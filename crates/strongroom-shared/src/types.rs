use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ROLE_ADMIN, ROLE_USER};
use crate::crypto::SealedSecret;

// Row ids are SQLite INTEGER PRIMARY KEYs. Ids that take part in access
// decisions get their own type so a folder id can't be passed as a user id.

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct FolderId(pub i64);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for FolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::User => ROLE_USER,
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_USER => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller, as handed over by the session layer.
/// Not persisted; built fresh for every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
    /// A user belongs to exactly one group at a time.
    pub group: String,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role, group: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            group: group.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// One group's rights over one folder. Unique per `(folder_id, group)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderPermission {
    pub folder_id: FolderId,
    pub group: String,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
}

impl FolderPermission {
    pub fn allows(&self, action: FolderAction) -> bool {
        match action {
            FolderAction::Read => self.can_read,
            FolderAction::Write => self.can_write,
            FolderAction::Delete => self.can_delete,
        }
    }
}

/// A stored service credential. `secret` stays sealed until a handler that
/// passed the access check opens it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub id: i64,
    pub owner: UserId,
    pub folder_id: Option<FolderId>,
    pub service_name: String,
    pub username: String,
    pub secret: SealedSecret,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    /// Object-store key the bytes live under.
    pub stored_filename: String,
    /// Name the uploader gave the file.
    pub original_filename: String,
    pub size: i64,
    pub mime_type: String,
    /// Uploader. Grants nothing by itself, see `AccessResolver::can_access_document`.
    pub owner: UserId,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One group's rights over one document. Unique per `(document_id, group)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentPermission {
    pub document_id: DocumentId,
    pub group: String,
    pub can_view: bool,
    pub can_download: bool,
}

impl DocumentPermission {
    pub fn allows(&self, action: DocumentAction) -> bool {
        match action {
            DocumentAction::View => self.can_view,
            DocumentAction::Download => self.can_download,
        }
    }
}

/// A network endpoint record (host, address, port).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub id: i64,
    pub owner: UserId,
    pub folder_id: Option<FolderId>,
    pub service_name: String,
    pub hostname: String,
    pub ip_address: String,
    pub port: u16,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FolderAction {
    Read,
    Write,
    Delete,
}

impl FolderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FolderAction::Read => "read",
            FolderAction::Write => "write",
            FolderAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentAction {
    View,
    Download,
}

impl DocumentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentAction::View => "view",
            DocumentAction::Download => "download",
        }
    }
}
