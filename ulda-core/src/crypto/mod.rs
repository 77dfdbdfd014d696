pub mod pbkdf2;
pub mod aes_gcm;
pub mod aes_cbc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("AES-GCM encryption failed: {0}")]
    AesGcmEncrypt(String),
    #[error("AES-GCM decryption failed: {0}")]
    AesGcmDecrypt(String),
    #[error("AES-CBC decryption failed: {0}")]
    AesCbcDecrypt(String),
    #[error("PBKDF2 derivation failed: {0}")]
    Pbkdf2Derive(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
