//! v001 -- Initial schema creation.
//!
//! Directory tables (`users`, `user_groups`), resource tables (`folders`,
//! `credentials`, `documents`, `services`) and the two ACL tables
//! (`folder_permissions`, `document_permissions`).

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (identity directory; authentication lives elsewhere)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    email      TEXT NOT NULL UNIQUE,
    role       TEXT NOT NULL,                 -- 'admin' | 'user'
    user_group TEXT NOT NULL,                 -- user_groups(name), by value
    created_at TEXT NOT NULL                  -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_users_group ON users(user_group);

-- ----------------------------------------------------------------
-- Groups
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS user_groups (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Folders + per-group ACL
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS folder_permissions (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_id  INTEGER NOT NULL,
    user_group TEXT NOT NULL,
    can_read   INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    can_write  INTEGER NOT NULL DEFAULT 0,
    can_delete INTEGER NOT NULL DEFAULT 0,

    UNIQUE (folder_id, user_group),
    FOREIGN KEY (folder_id) REFERENCES folders(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Credentials (secret is a sealed envelope, never plaintext)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS credentials (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL,            -- owner
    folder_id    INTEGER,                     -- nullable FK -> folders(id)
    service_name TEXT NOT NULL,
    username     TEXT NOT NULL,
    secret       TEXT NOT NULL,
    notes        TEXT NOT NULL DEFAULT '',
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,

    FOREIGN KEY (folder_id) REFERENCES folders(id)
);

CREATE INDEX IF NOT EXISTS idx_credentials_folder_id ON credentials(folder_id);

-- ----------------------------------------------------------------
-- Documents + per-group ACL
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS documents (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    stored_filename   TEXT NOT NULL UNIQUE,   -- object-store key
    original_filename TEXT NOT NULL,
    file_size         INTEGER NOT NULL,
    mime_type         TEXT NOT NULL,
    uploaded_by       INTEGER NOT NULL,
    description       TEXT NOT NULL DEFAULT '',
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS document_permissions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id  INTEGER NOT NULL,
    user_group   TEXT NOT NULL,
    can_view     INTEGER NOT NULL DEFAULT 0,
    can_download INTEGER NOT NULL DEFAULT 0,

    UNIQUE (document_id, user_group),
    FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Services (network endpoints)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS services (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL,            -- owner
    folder_id    INTEGER,                     -- nullable FK -> folders(id)
    service_name TEXT NOT NULL,
    hostname     TEXT NOT NULL DEFAULT '',
    ip_address   TEXT NOT NULL DEFAULT '',
    port         INTEGER NOT NULL DEFAULT 0,
    description  TEXT NOT NULL DEFAULT '',
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,

    FOREIGN KEY (folder_id) REFERENCES folders(id)
);

CREATE INDEX IF NOT EXISTS idx_services_folder_id ON services(folder_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
