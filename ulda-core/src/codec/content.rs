//! Per-record codec. Every content record has its own random key material,
//! so exposing one record's settings reveals nothing about another.
//!
//! ```text
//! masked     = (32 random bytes || json(value)) XOR cycle(utf8(salt))
//! ciphertext = AES-256-CBC-PKCS7(base64decode(password), hexdecode(iv), masked)
//! ```

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::constants::{
    CBC_IV_LEN, CONTENT_PADDING_LEN, CONTENT_PASSWORD_LEN, CONTENT_SALT_LEN, KEY_LEN,
};
use crate::crypto::aes_cbc::{aes256_cbc_decrypt, aes256_cbc_encrypt};
use crate::error::{Result, UldaError};
use crate::traits::random::SecureRandom;

/// Key material for one content record, stored inside the master file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordSettings {
    /// 32 random bytes, base64.
    pub password: String,
    /// 16 random bytes, lowercase hex.
    pub iv: String,
    /// 32 random bytes, base64. Masked in as its UTF-8 text, not decoded.
    pub salt: String,
}

// Key material never reaches logs or error output.
impl fmt::Debug for PasswordSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordSettings")
            .field("password", &"<redacted>")
            .field("iv", &"<redacted>")
            .field("salt", &"<redacted>")
            .finish()
    }
}

impl PasswordSettings {
    /// Draw fresh settings. Never derived from the user's password.
    pub fn generate(rng: &dyn SecureRandom) -> Result<Self> {
        let password = Zeroizing::new(rng.random_bytes(CONTENT_PASSWORD_LEN)?);
        let iv = rng.random_bytes(CBC_IV_LEN)?;
        let salt = rng.random_bytes(CONTENT_SALT_LEN)?;

        Ok(Self {
            password: STANDARD.encode(password.as_slice()),
            iv: hex::encode(iv),
            salt: STANDARD.encode(salt),
        })
    }

    /// Check every field decodes to its fixed length.
    pub fn validate(&self) -> Result<()> {
        self.key()?;
        self.iv_bytes()?;
        match STANDARD.decode(&self.salt) {
            Ok(salt) if salt.len() == CONTENT_SALT_LEN => Ok(()),
            _ => Err(UldaError::Consistency(format!(
                "content salt must be {CONTENT_SALT_LEN} base64-encoded bytes"
            ))),
        }
    }

    fn key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let decoded = Zeroizing::new(STANDARD.decode(&self.password).map_err(|e| {
            UldaError::Consistency(format!("content password is not base64: {e}"))
        })?);
        if decoded.len() != KEY_LEN {
            return Err(UldaError::Consistency(format!(
                "content password must decode to {KEY_LEN} bytes, got {}",
                decoded.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&decoded);
        Ok(key)
    }

    fn iv_bytes(&self) -> Result<[u8; CBC_IV_LEN]> {
        hex::decode(&self.iv)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                UldaError::Consistency(format!("content iv must be {CBC_IV_LEN} hex-encoded bytes"))
            })
    }
}

/// XOR `data` in place against `salt`, repeating the salt as needed.
fn xor_mask(data: &mut [u8], salt: &[u8]) {
    if salt.is_empty() {
        return;
    }
    for (byte, mask) in data.iter_mut().zip(salt.iter().cycle()) {
        *byte ^= mask;
    }
}

pub fn encrypt_content<T: Serialize + ?Sized>(
    value: &T,
    settings: &PasswordSettings,
    rng: &dyn SecureRandom,
) -> Result<Vec<u8>> {
    let key = settings.key()?;
    let iv = settings.iv_bytes()?;

    let json = serde_json::to_vec(value).map_err(|e| UldaError::Serialization(e.to_string()))?;
    let mut buffer = Zeroizing::new(rng.random_bytes(CONTENT_PADDING_LEN)?);
    buffer.extend_from_slice(&json);
    xor_mask(&mut buffer, settings.salt.as_bytes());

    Ok(aes256_cbc_encrypt(&key, &iv, &buffer))
}

/// Reverse `encrypt_content`.
///
/// Wrong key material or a tampered record usually breaks the PKCS#7 padding
/// and otherwise leaves bytes that are not JSON; both surface as
/// `UldaError::Decryption` for this record alone.
pub fn decrypt_content<T: DeserializeOwned>(
    ciphertext: &[u8],
    settings: &PasswordSettings,
) -> Result<T> {
    let key = settings.key()?;
    let iv = settings.iv_bytes()?;

    let mut buffer = Zeroizing::new(
        aes256_cbc_decrypt(&key, &iv, ciphertext)
            .map_err(|e| UldaError::Decryption(e.to_string()))?,
    );
    xor_mask(&mut buffer, settings.salt.as_bytes());

    if buffer.len() < CONTENT_PADDING_LEN {
        return Err(UldaError::Decryption(format!(
            "content plaintext shorter than its {CONTENT_PADDING_LEN}-byte padding"
        )));
    }
    serde_json::from_slice(&buffer[CONTENT_PADDING_LEN..])
        .map_err(|e| UldaError::Decryption(format!("content plaintext is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    struct TestRng;
    impl SecureRandom for TestRng {
        fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
            getrandom::getrandom(dest).map_err(|e| UldaError::Platform(e.to_string()))
        }
    }

    #[test]
    fn test_generate_lengths() {
        let settings = PasswordSettings::generate(&TestRng).unwrap();
        assert_eq!(STANDARD.decode(&settings.password).unwrap().len(), 32);
        assert_eq!(STANDARD.decode(&settings.salt).unwrap().len(), 32);
        assert_eq!(settings.iv.len(), 32);
        assert_eq!(hex::decode(&settings.iv).unwrap().len(), 16);
        settings.validate().unwrap();
    }

    #[test]
    fn test_debug_hides_key_material() {
        let settings = PasswordSettings::generate(&TestRng).unwrap();
        let printed = format!("{settings:?}");
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains(&settings.password));
        assert!(!printed.contains(&settings.iv));
        assert!(!printed.contains(&settings.salt));
    }

    #[test]
    fn test_generate_never_repeats() {
        let first = PasswordSettings::generate(&TestRng).unwrap();
        let second = PasswordSettings::generate(&TestRng).unwrap();
        assert_ne!(first.password, second.password);
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.salt, second.salt);
    }

    #[test]
    fn test_content_roundtrip() {
        let settings = PasswordSettings::generate(&TestRng).unwrap();
        for payload in [
            json!({"hello": "world"}),
            json!([1, 2, 3]),
            json!("plain string"),
            json!(null),
            json!({"nested": {"unicode": "привет", "n": 1.5}}),
        ] {
            let ciphertext = encrypt_content(&payload, &settings, &TestRng).unwrap();
            let decrypted: Value = decrypt_content(&ciphertext, &settings).unwrap();
            assert_eq!(decrypted, payload);
        }
    }

    #[test]
    fn test_random_padding_changes_ciphertext() {
        let settings = PasswordSettings::generate(&TestRng).unwrap();
        let payload = json!({"same": true});
        let first = encrypt_content(&payload, &settings, &TestRng).unwrap();
        let second = encrypt_content(&payload, &settings, &TestRng).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_wrong_settings_fail_with_decryption_error() {
        let settings = PasswordSettings::generate(&TestRng).unwrap();
        let other = PasswordSettings::generate(&TestRng).unwrap();
        let ciphertext = encrypt_content(&json!({"k": "v"}), &settings, &TestRng).unwrap();

        let result: Result<Value> = decrypt_content(&ciphertext, &other);
        assert!(matches!(result, Err(UldaError::Decryption(_))));
    }

    #[test]
    fn test_wrong_salt_fails() {
        let settings = PasswordSettings::generate(&TestRng).unwrap();
        let ciphertext = encrypt_content(&json!({"k": "v"}), &settings, &TestRng).unwrap();

        let mut other_salt = settings.clone();
        other_salt.salt = PasswordSettings::generate(&TestRng).unwrap().salt;
        let result: Result<Value> = decrypt_content(&ciphertext, &other_salt);
        assert!(matches!(result, Err(UldaError::Decryption(_))));
    }

    #[test]
    fn test_malformed_settings_are_consistency_errors() {
        let mut settings = PasswordSettings::generate(&TestRng).unwrap();
        settings.password = STANDARD.encode([0u8; 16]);
        let err = encrypt_content(&json!({}), &settings, &TestRng).unwrap_err();
        assert!(matches!(err, UldaError::Consistency(_)));

        let mut settings = PasswordSettings::generate(&TestRng).unwrap();
        settings.iv = "zz".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_xor_mask_is_involution() {
        let original = b"abcdefghijklmnopqrstuvwxyz0123456789".to_vec();
        let mut data = original.clone();
        xor_mask(&mut data, b"salt");
        assert_ne!(data, original);
        xor_mask(&mut data, b"salt");
        assert_eq!(data, original);
    }
}
