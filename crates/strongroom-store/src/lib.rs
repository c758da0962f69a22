//! # strongroom-store
//!
//! SQLite persistence for Strongroom: the user and group directory, folders,
//! credentials, documents, services and the two per-group ACL tables.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model. `Database` also implements [`strongroom_shared::AclSource`], so the
//! access resolver can query ACL rows directly.

pub mod acl;
pub mod credentials;
pub mod database;
pub mod documents;
pub mod folders;
pub mod groups;
pub mod migrations;
pub mod models;
pub mod services;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
