use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use super::{CryptoError, Result};
use crate::constants::{CBC_IV_LEN, KEY_LEN};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypt with AES-256-CBC and PKCS#7 padding.
pub fn aes256_cbc_encrypt(key: &[u8; KEY_LEN], iv: &[u8; CBC_IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt AES-256-CBC ciphertext and strip PKCS#7 padding.
///
/// CBC is unauthenticated: a wrong key usually surfaces here as a padding
/// error, but may also yield garbage that only fails later parsing.
pub fn aes256_cbc_decrypt(
    key: &[u8; KEY_LEN],
    iv: &[u8; CBC_IV_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| CryptoError::AesCbcDecrypt(e.to_string()))
}
