//! At-rest protection for credential secrets.
//!
//! Envelope layout (before base64):
//!
//! ```text
//! version (1) || nonce (24) || ciphertext || tag (16)
//! ```
//!
//! The version byte is bound as associated data, so it can't be swapped
//! without failing authentication. The whole envelope is stored as one
//! standard-base64 string in the `secret` column.

use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{ENVELOPE_V1, MIN_ENVELOPE_SIZE, NONCE_SIZE, SYMMETRIC_KEY_SIZE};
use crate::error::CryptoError;

pub type SymmetricKey = [u8; SYMMETRIC_KEY_SIZE];

/// Process-wide key, loaded once at startup. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(SymmetricKey);

impl KeyMaterial {
    /// Fresh random key. Used by tests and by operators bootstrapping a
    /// deployment.
    pub fn generate() -> Self {
        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Parse key material from its configured text form: 64 hex characters
    /// or base64 of exactly 32 bytes.
    pub fn parse(encoded: &str) -> Result<Self, CryptoError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CryptoError::InvalidKey("key material is empty".into()));
        }

        let mut bytes = if encoded.len() == SYMMETRIC_KEY_SIZE * 2
            && encoded.bytes().all(|b| b.is_ascii_hexdigit())
        {
            hex::decode(encoded).map_err(|e| CryptoError::InvalidKey(e.to_string()))?
        } else {
            STANDARD
                .decode(encoded)
                .map_err(|_| CryptoError::InvalidKey("expected 64 hex chars or base64".into()))?
        };

        if bytes.len() != SYMMETRIC_KEY_SIZE {
            let len = bytes.len();
            bytes.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "expected {SYMMETRIC_KEY_SIZE} bytes, got {len}"
            )));
        }

        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

/// A secret as it sits in storage: an opaque, text-safe envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SealedSecret(String);

impl SealedSecret {
    /// Wrap an envelope read back from storage. No validation happens until
    /// [`SecretCipher::decrypt`].
    pub fn from_stored(envelope: impl Into<String>) -> Self {
        Self(envelope.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Authenticated encryption of individual secret strings.
///
/// Holds nothing but immutable key material, so one instance can be shared
/// across every request handler behind an `Arc`.
#[derive(Clone)]
pub struct SecretCipher {
    key: KeyMaterial,
}

impl SecretCipher {
    pub fn new(key: KeyMaterial) -> Self {
        Self { key }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<SealedSecret, CryptoError> {
        let cipher = XChaCha20Poly1305::new((&self.key.0).into());
        // Random 192-bit nonce per call; collisions are negligible at any
        // realistic volume under one key.
        let nonce_bytes = generate_nonce();
        let nonce = XNonce::from_slice(&nonce_bytes);
        let header = [ENVELOPE_V1];

        let ciphertext = cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &header,
                },
            )
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut output = Vec::with_capacity(header.len() + NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&header);
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(SealedSecret(STANDARD.encode(output)))
    }

    /// Open an envelope. Pure: same input, same output, nothing written.
    pub fn decrypt(&self, sealed: &SealedSecret) -> Result<String, CryptoError> {
        let data = STANDARD
            .decode(sealed.as_str())
            .map_err(|e| CryptoError::Format(format!("envelope is not base64: {e}")))?;

        let plaintext = self.open(&data)?;
        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::Format("plaintext is not UTF-8".into()))
    }

    fn open(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < MIN_ENVELOPE_SIZE {
            return Err(CryptoError::Format(format!(
                "envelope too short: {} bytes",
                data.len()
            )));
        }

        let (header, rest) = data.split_at(1);
        if header[0] != ENVELOPE_V1 {
            return Err(CryptoError::Format(format!(
                "unknown envelope version 0x{:02x}",
                header[0]
            )));
        }

        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);
        let cipher = XChaCha20Poly1305::new((&self.key.0).into());
        let nonce = XNonce::from_slice(nonce_bytes);

        cipher
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: header,
                },
            )
            .map_err(|_| CryptoError::Integrity)
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}
