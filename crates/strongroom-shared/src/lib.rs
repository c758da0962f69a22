//! # strongroom-shared
//!
//! The core of Strongroom: value types for identities and resources,
//! [`crypto::SecretCipher`] for at-rest protection of credential secrets, and
//! [`access::AccessResolver`] for every authorization decision.
//!
//! Nothing in this crate performs I/O. ACL rows arrive through
//! [`access::AclSource`], which the store crate implements.

pub mod access;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod seed;
pub mod types;

pub use access::{require, AccessResolver, AclSnapshot, AclSource};
pub use crypto::{KeyMaterial, SealedSecret, SecretCipher};
pub use error::{AccessError, CryptoError, SeedPolicyError};
pub use seed::DocumentSeedPolicy;
pub use types::*;
