//! Row shapes owned by the store: directory users plus the insert payloads
//! for each resource table. Resource models themselves live in
//! `strongroom_shared::types` because the access resolver reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongroom_shared::{FolderId, Role, SealedSecret, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A directory entry. No password material: login is handled upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    /// Group name, by value.
    pub group: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub role: Role,
    pub group: String,
}

/// Partial update; `None` or an empty string keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub group: Option<String>,
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub owner: UserId,
    pub folder_id: Option<FolderId>,
    pub service_name: String,
    pub username: String,
    /// Must already be sealed by the caller.
    pub secret: SealedSecret,
    pub notes: String,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub stored_filename: String,
    pub original_filename: String,
    pub size: i64,
    pub mime_type: String,
    pub owner: UserId,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    pub owner: UserId,
    pub folder_id: Option<FolderId>,
    pub service_name: String,
    pub hostname: String,
    pub ip_address: String,
    pub port: u16,
    pub description: String,
}
