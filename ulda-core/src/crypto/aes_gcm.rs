use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use super::{CryptoError, Result};
use crate::constants::{GCM_NONCE_LEN, KEY_LEN};

/// Encrypt with AES-256-GCM and no associated data.
///
/// Returns ciphertext with the 16-byte auth tag appended.
pub fn aes256_gcm_encrypt(
    key: &[u8; KEY_LEN],
    nonce: &[u8; GCM_NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::AesGcmEncrypt(e.to_string()))
}

/// Decrypt AES-256-GCM ciphertext, verifying the auth tag.
pub fn aes256_gcm_decrypt(
    key: &[u8; KEY_LEN],
    nonce: &[u8; GCM_NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| CryptoError::AesGcmDecrypt(e.to_string()))
}
