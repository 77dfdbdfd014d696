//! Password-derived envelope for the master file.
//!
//! ```text
//! key        = PBKDF2-HMAC-SHA256(password, pbkdf2Salt, iterations, 32)
//! ciphertext = AES-256-GCM(key, iv, json(plaintext))   // tag appended, no AAD
//! ```
//!
//! The envelope also carries a random `salt` that takes no part in key
//! derivation. It is kept because the store persists and echoes it.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::constants::{ENVELOPE_SALT_LEN, GCM_NONCE_LEN, PBKDF2_SALT_LEN};
use crate::crypto::aes_gcm::{aes256_gcm_decrypt, aes256_gcm_encrypt};
use crate::crypto::pbkdf2::derive_key;
use crate::error::{Result, UldaError};
use crate::traits::random::SecureRandom;

/// Key-derivation and cipher parameters, hex-encoded as the store expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeParams {
    pub iterations: u32,
    pub salt: String,
    pub iv: String,
    #[serde(rename = "pbkdf2Salt")]
    pub pbkdf2_salt: String,
}

/// Encrypted master file plus the parameters needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub ciphertext: Vec<u8>,
    pub params: EnvelopeParams,
}

impl Envelope {
    /// Params as the JSON string nested inside `metadata` on the wire.
    pub fn metadata_json(&self) -> Result<String> {
        serde_json::to_string(&self.params).map_err(|e| UldaError::Serialization(e.to_string()))
    }

    /// Rebuild an envelope from the store's `{data, metadata}` pair.
    pub fn from_wire(data: Vec<u8>, metadata: &str) -> Result<Self> {
        let params = serde_json::from_str(metadata)
            .map_err(|e| UldaError::Protocol(format!("invalid envelope metadata: {e}")))?;
        Ok(Self {
            ciphertext: data,
            params,
        })
    }
}

/// Serialize `plaintext` to JSON and seal it under a key derived from `password`.
pub fn encrypt_master<T: Serialize + ?Sized>(
    plaintext: &T,
    password: &str,
    iterations: u32,
    rng: &dyn SecureRandom,
) -> Result<Envelope> {
    let mut salt = [0u8; ENVELOPE_SALT_LEN];
    let mut iv = [0u8; GCM_NONCE_LEN];
    let mut pbkdf2_salt = [0u8; PBKDF2_SALT_LEN];
    rng.fill_bytes(&mut salt)?;
    rng.fill_bytes(&mut iv)?;
    rng.fill_bytes(&mut pbkdf2_salt)?;

    let json = serde_json::to_vec(plaintext).map_err(|e| UldaError::Serialization(e.to_string()))?;
    let key = derive_key(password.as_bytes(), &pbkdf2_salt, iterations)?;
    let ciphertext = aes256_gcm_encrypt(&key, &iv, &json)?;

    Ok(Envelope {
        ciphertext,
        params: EnvelopeParams {
            iterations,
            salt: hex::encode(salt),
            iv: hex::encode(iv),
            pbkdf2_salt: hex::encode(pbkdf2_salt),
        },
    })
}

/// Re-derive the key and open the envelope.
///
/// A wrong password and a corrupted envelope both fail the GCM tag check and
/// are reported identically as `UldaError::Decryption`.
pub fn decrypt_master<T: DeserializeOwned>(envelope: &Envelope, password: &str) -> Result<T> {
    let params = &envelope.params;

    let iv: [u8; GCM_NONCE_LEN] = hex::decode(&params.iv)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| UldaError::Decryption("envelope iv is not 12 hex-encoded bytes".into()))?;
    let pbkdf2_salt = hex::decode(&params.pbkdf2_salt)
        .map_err(|e| UldaError::Decryption(format!("envelope pbkdf2Salt is not hex: {e}")))?;

    let key = derive_key(password.as_bytes(), &pbkdf2_salt, params.iterations)
        .map_err(|e| UldaError::Decryption(e.to_string()))?;
    let plaintext = aes256_gcm_decrypt(&key, &iv, &envelope.ciphertext).map_err(|_| {
        UldaError::Decryption("master envelope failed authentication (wrong password or corrupted data)".into())
    })?;

    serde_json::from_slice(&plaintext)
        .map_err(|e| UldaError::Decryption(format!("master plaintext is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestRng;
    impl SecureRandom for TestRng {
        fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
            getrandom::getrandom(dest).map_err(|e| UldaError::Platform(e.to_string()))
        }
    }

    const ITERATIONS: u32 = 1_000;

    #[test]
    fn test_master_roundtrip() {
        let plaintext = json!({"signatures": {"0": "tok"}, "files": [{"id": 1}]});
        let envelope = encrypt_master(&plaintext, "Secr3t!", ITERATIONS, &TestRng).unwrap();
        let decrypted: serde_json::Value = decrypt_master(&envelope, "Secr3t!").unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_params_are_lowercase_hex_of_expected_length() {
        let envelope = encrypt_master(&json!([]), "pw", ITERATIONS, &TestRng).unwrap();
        let params = &envelope.params;
        assert_eq!(params.iterations, ITERATIONS);
        assert_eq!(params.salt.len(), 32);
        assert_eq!(params.iv.len(), 24);
        assert_eq!(params.pbkdf2_salt.len(), 32);
        for field in [&params.salt, &params.iv, &params.pbkdf2_salt] {
            assert!(field.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_wrong_password_is_decryption_error() {
        let envelope = encrypt_master(&json!({"a": 1}), "Secr3t!", ITERATIONS, &TestRng).unwrap();
        let result: Result<serde_json::Value> = decrypt_master(&envelope, "secr3t!");
        assert!(matches!(result, Err(UldaError::Decryption(_))));
    }

    #[test]
    fn test_corrupted_ciphertext_is_decryption_error() {
        let mut envelope = encrypt_master(&json!({"a": 1}), "pw", ITERATIONS, &TestRng).unwrap();
        envelope.ciphertext[0] ^= 0xFF;
        let result: Result<serde_json::Value> = decrypt_master(&envelope, "pw");
        assert!(matches!(result, Err(UldaError::Decryption(_))));
    }

    #[test]
    fn test_envelope_salt_does_not_affect_decryption() {
        let mut envelope = encrypt_master(&json!({"a": 1}), "pw", ITERATIONS, &TestRng).unwrap();
        envelope.params.salt = "00".repeat(16);
        let decrypted: serde_json::Value = decrypt_master(&envelope, "pw").unwrap();
        assert_eq!(decrypted, json!({"a": 1}));
    }

    #[test]
    fn test_metadata_wire_roundtrip() {
        let envelope = encrypt_master(&json!({}), "pw", ITERATIONS, &TestRng).unwrap();
        let metadata = envelope.metadata_json().unwrap();
        assert!(metadata.contains("\"pbkdf2Salt\""));

        let rebuilt = Envelope::from_wire(envelope.ciphertext.clone(), &metadata).unwrap();
        assert_eq!(rebuilt, envelope);
    }

    #[test]
    fn test_malformed_metadata_is_protocol_error() {
        let err = Envelope::from_wire(vec![1, 2, 3], "{not json").unwrap_err();
        assert!(matches!(err, UldaError::Protocol(_)));
    }
}
