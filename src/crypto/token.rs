//! Timestamped authenticated tokens over XChaCha20-Poly1305.
//!
//! Every encrypted record is a self-contained token:
//!
//! ```text
//! +---------+-------------------+------------------+---------------------------+
//! | Version | Timestamp         | Nonce            | Ciphertext + Poly1305 tag |
//! | 1 byte  | 8 bytes (BE secs) | 24 bytes         | len(plaintext) + 16 bytes |
//! +---------+-------------------+------------------+---------------------------+
//! ```
//!
//! Version and timestamp are authenticated as AAD. The random 24-byte nonce
//! makes per-token nonce reuse negligible without any counter state, so the
//! cipher can be shared by sender and receiver with nothing but the key.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};

use super::keys::SharedKey;
use crate::core::{
    CryptoError, FrameCipher, AEAD_NONCE_SIZE, AEAD_TAG_SIZE, MAX_CLOCK_SKEW, TOKEN_PREFIX_SIZE,
    TOKEN_VERSION,
};

/// Smallest valid token: prefix plus an empty plaintext's tag.
pub const MIN_TOKEN_SIZE: usize = TOKEN_PREFIX_SIZE + AEAD_TAG_SIZE;

/// Payload cipher producing timestamped XChaCha20-Poly1305 tokens.
#[derive(Clone)]
pub struct TokenCipher {
    key: SharedKey,
    ttl: Option<Duration>,
}

impl TokenCipher {
    /// Create a cipher for an existing key.
    pub fn new(key: SharedKey) -> Self {
        Self { key, ttl: None }
    }

    /// Reject tokens older than `ttl` on decryption.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// The shared key.
    pub fn key(&self) -> &SharedKey {
        &self.key
    }

    /// Encrypt with an explicit timestamp (seconds since the Unix epoch).
    pub fn encrypt_at(&self, plaintext: &[u8], timestamp: u64) -> Result<Vec<u8>, CryptoError> {
        let mut nonce = [0u8; AEAD_NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let mut token = Vec::with_capacity(MIN_TOKEN_SIZE + plaintext.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&timestamp.to_be_bytes());
        token.extend_from_slice(&nonce);

        let cipher = XChaCha20Poly1305::new(self.key.as_bytes().into());
        let sealed = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &token[..9],
                },
            )
            .map_err(|_| CryptoError::EncryptionFailed)?;

        token.extend_from_slice(&sealed);
        Ok(token)
    }

    /// Decrypt, checking freshness against an explicit current time.
    pub fn decrypt_at(&self, token: &[u8], now: u64) -> Result<Vec<u8>, CryptoError> {
        if token.len() < MIN_TOKEN_SIZE || token[0] != TOKEN_VERSION {
            return Err(CryptoError::MalformedToken);
        }

        let mut stamp = [0u8; 8];
        stamp.copy_from_slice(&token[1..9]);
        let timestamp = u64::from_be_bytes(stamp);

        let cipher = XChaCha20Poly1305::new(self.key.as_bytes().into());
        let plaintext = cipher
            .decrypt(
                XNonce::from_slice(&token[9..TOKEN_PREFIX_SIZE]),
                Payload {
                    msg: &token[TOKEN_PREFIX_SIZE..],
                    aad: &token[..9],
                },
            )
            .map_err(|_| CryptoError::DecryptionFailed)?;

        if let Some(ttl) = self.ttl {
            if timestamp.saturating_add(ttl.as_secs()) < now {
                return Err(CryptoError::TokenExpired);
            }
            if timestamp > now.saturating_add(MAX_CLOCK_SKEW.as_secs()) {
                return Err(CryptoError::TokenExpired);
            }
        }

        Ok(plaintext)
    }
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl FrameCipher for TokenCipher {
    fn generate() -> Self {
        Self::new(SharedKey::generate())
    }

    fn from_key_material(material: &[u8]) -> Result<Self, CryptoError> {
        SharedKey::from_slice(material).map(Self::new)
    }

    fn key_material(&self) -> Vec<u8> {
        self.key.as_bytes().to_vec()
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.encrypt_at(plaintext, unix_now())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.decrypt_at(ciphertext, unix_now())
    }
}
