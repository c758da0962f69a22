use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    /// The authentication tag did not verify: tampered or corrupted
    /// ciphertext, or a different key. Carries no detail on purpose.
    #[error("Integrity check failed")]
    Integrity,

    /// The envelope is not something this build can parse.
    #[error("Malformed secret envelope: {0}")]
    Format(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The resolver said no. Callers render this as a generic "forbidden"
    /// that does not reveal whether the resource exists.
    #[error("Permission denied")]
    PermissionDenied,

    /// The ACL lookup itself failed. Distinct from a denial.
    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeedPolicyError {
    #[error("Invalid document permission entry '{0}'")]
    InvalidEntry(String),

    #[error("Unknown document permission flag '{0}'")]
    UnknownFlag(String),

    #[error("Duplicate group '{0}' in document permission table")]
    DuplicateGroup(String),
}
