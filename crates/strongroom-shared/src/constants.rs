/// Application name
pub const APP_NAME: &str = "Strongroom";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Poly1305 authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Symmetric key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Envelope version byte for XChaCha20-Poly1305 with a 24-byte random nonce.
pub const ENVELOPE_V1: u8 = 0x01;

/// Version byte + nonce + tag: the smallest possible envelope (empty plaintext).
pub const MIN_ENVELOPE_SIZE: usize = 1 + NONCE_SIZE + TAG_SIZE;

/// Maximum document upload size in bytes (50 MiB)
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Role names as they appear in identities and the users table.
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Permissions seeded onto every new document: (group, can_view, can_download).
pub const DEFAULT_DOCUMENT_PERMISSIONS: &[(&str, bool, bool)] = &[
    ("admin", true, true),
    ("senior", true, true),
    ("junior", true, false),
];
