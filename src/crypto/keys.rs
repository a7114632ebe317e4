//! Shared key management
//!
//! The sender generates the key and ships it to the receiver inside the SYN
//! payload, so both ends hold the same 32 bytes for the whole connection.

use crate::core::{CryptoError, KEY_SIZE};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

/// A symmetric key shared by both ends of a connection.
///
/// Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey {
    key: [u8; KEY_SIZE],
}

impl SharedKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Create a key from bytes.
    pub fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Create a key from a slice of exactly [`KEY_SIZE`] bytes.
    pub fn from_slice(material: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_SIZE] = material.try_into().map_err(|_| CryptoError::InvalidKey {
            expected: KEY_SIZE,
            actual: material.len(),
        })?;
        Ok(Self { key })
    }

    /// Get the raw key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedKey(..)")
    }
}

impl Drop for SharedKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let k1 = SharedKey::generate();
        let k2 = SharedKey::generate();

        assert_ne!(k1.as_bytes(), k2.as_bytes());
        assert_eq!(k1.as_bytes().len(), KEY_SIZE);
    }

    #[test]
    fn test_key_from_slice() {
        let bytes = [0x11u8; KEY_SIZE];
        let key = SharedKey::from_slice(&bytes).unwrap();
        assert_eq!(key.as_bytes(), &bytes);
    }

    #[test]
    fn test_key_from_slice_wrong_length() {
        let result = SharedKey::from_slice(&[0u8; 16]);
        assert_eq!(
            result,
            Err(CryptoError::InvalidKey {
                expected: KEY_SIZE,
                actual: 16
            })
        );
    }

    #[test]
    fn test_debug_hides_material() {
        let key = SharedKey::from_bytes([0xAB; KEY_SIZE]);
        assert_eq!(format!("{key:?}"), "SharedKey(..)");
    }
}
