//! Core traits.
//!
//! The sender and receiver engines are generic over the payload cipher so any
//! authenticated symmetric scheme with a transportable key can be plugged in.

use super::error::CryptoError;

/// Symmetric payload cipher with key-exchange capability.
///
/// # Requirements
///
/// - `decrypt(encrypt(m)) == m` for a cipher and any cipher rebuilt from its
///   `key_material`
/// - `decrypt` MUST reject ciphertext produced under a different key
/// - `from_key_material(key_material())` MUST yield an equivalent cipher
///
/// # Example
///
/// ```ignore
/// let local = TokenCipher::generate();
/// let remote = TokenCipher::from_key_material(&local.key_material())?;
///
/// let token = local.encrypt(b"record")?;
/// assert_eq!(remote.decrypt(&token)?, b"record");
/// ```
pub trait FrameCipher: Sized + Send + Sync + 'static {
    /// Create a cipher under a freshly generated random key.
    fn generate() -> Self;

    /// Rebuild a cipher from key material received from the peer.
    fn from_key_material(material: &[u8]) -> Result<Self, CryptoError>;

    /// Raw key material, as carried in the SYN payload.
    fn key_material(&self) -> Vec<u8>;

    /// Encrypt one application record.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt one application record.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}
