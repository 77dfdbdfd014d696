//! Plaintext structures held by the client between remote calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::content::PasswordSettings;
use crate::error::{Result, UldaError};
use crate::signature::SignatureRing;

/// Master-file entry binding a content id to its key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub id: u64,
    #[serde(flatten)]
    pub settings: PasswordSettings,
}

/// The vault index: its own signature ring plus one key entry per content record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterFile {
    pub signatures: SignatureRing,
    pub files: Vec<ContentRef>,
}

impl MasterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_ids(&self) -> Vec<u64> {
        self.files.iter().map(|entry| entry.id).collect()
    }

    pub fn settings_for(&self, id: u64) -> Option<&PasswordSettings> {
        self.files
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.settings)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.files.iter().any(|entry| entry.id == id)
    }

    /// Like `settings_for`, but a missing entry is a `Consistency` error.
    pub fn require_settings(&self, id: u64) -> Result<&PasswordSettings> {
        self.settings_for(id).ok_or_else(|| {
            UldaError::Consistency(format!("content id {id} is not referenced by the master file"))
        })
    }

    /// Check ring shape and id uniqueness.
    pub fn validate(&self) -> Result<()> {
        self.signatures.validate()?;
        let mut ids = self.content_ids();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(UldaError::Consistency(format!(
                "content id {} appears twice in the master file",
                pair[0]
            )));
        }
        Ok(())
    }
}

/// The part of a content record that is encrypted. The id lives outside it,
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBody {
    pub name: String,
    pub signatures: SignatureRing,
    pub payload: Value,
}

/// A decrypted content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: u64,
    pub name: String,
    pub signatures: SignatureRing,
    pub payload: Value,
}

impl ContentRecord {
    pub fn from_body(id: u64, body: ContentBody) -> Self {
        Self {
            id,
            name: body.name,
            signatures: body.signatures,
            payload: body.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(tag: &str) -> PasswordSettings {
        PasswordSettings {
            password: format!("pw-{tag}"),
            iv: format!("iv-{tag}"),
            salt: format!("salt-{tag}"),
        }
    }

    fn ring() -> SignatureRing {
        SignatureRing::from_tokens(0, (0..6).map(|i| format!("t{i}")))
    }

    #[test]
    fn test_content_ref_is_flat_on_the_wire() {
        let entry = ContentRef {
            id: 3,
            settings: settings("a"),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({"id": 3, "password": "pw-a", "iv": "iv-a", "salt": "salt-a"})
        );
        let decoded: ContentRef = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_require_settings_missing_is_consistency_error() {
        let master = MasterFile {
            signatures: ring(),
            files: vec![ContentRef {
                id: 1,
                settings: settings("a"),
            }],
        };
        assert_eq!(master.require_settings(1).unwrap().password, "pw-a");
        assert!(matches!(
            master.require_settings(2),
            Err(UldaError::Consistency(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let master = MasterFile {
            signatures: ring(),
            files: vec![
                ContentRef { id: 4, settings: settings("a") },
                ContentRef { id: 4, settings: settings("b") },
            ],
        };
        assert!(master.validate().is_err());
    }

    #[test]
    fn test_empty_master_shape() {
        let value = serde_json::to_value(MasterFile::new()).unwrap();
        assert_eq!(value, json!({"signatures": {}, "files": []}));
    }
}
