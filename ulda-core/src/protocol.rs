//! Request and acknowledgment shapes exchanged with the remote store.
//!
//! Structured metadata (envelope params, initial hash rings) travels as a
//! JSON string nested inside the outer message. Ciphertext is raw bytes.

use serde::{Deserialize, Serialize};

use crate::codec::master::Envelope;
use crate::error::Result;
use crate::signature::SignatureRing;

/// `master:init` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterInitRequest {
    pub key: String,
    pub metadata: String,
    pub data: Vec<u8>,
    pub hash_signatures: String,
}

/// `master:get` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterGetRequest {
    pub key: String,
}

/// `master:update` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterUpdateRequest {
    pub key: String,
    pub metadata: String,
    pub data: Vec<u8>,
    #[serde(rename = "newHashes")]
    pub new_hashes: SignatureRing,
}

/// The master envelope as the store persists and echoes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEnvelope {
    pub data: Vec<u8>,
    pub metadata: String,
}

impl StoredEnvelope {
    pub fn into_envelope(self) -> Result<Envelope> {
        Envelope::from_wire(self.data, &self.metadata)
    }
}

/// Acknowledgment for every `master:*` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StoredEnvelope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `content:get` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGetRequest {
    pub ids: Vec<u64>,
}

/// One element of the `content:get` acknowledgment list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    pub data: Vec<u8>,
}

/// `content:create` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCreateRequest {
    pub data: Vec<u8>,
    pub hash_signatures: String,
}

/// `content:update` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUpdateRequest {
    pub id: u64,
    pub data: Vec<u8>,
    #[serde(rename = "newHashes")]
    pub new_hashes: SignatureRing,
}

/// Acknowledgment for `content:create` and `content:update`: the record id,
/// or an error object when the store refuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdAck {
    Id(u64),
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_request_field_names() {
        let request = MasterUpdateRequest {
            key: "k".into(),
            metadata: "{}".into(),
            data: vec![1, 2],
            new_hashes: SignatureRing::from_tokens(5, vec!["h".to_string()]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"key": "k", "metadata": "{}", "data": [1, 2], "newHashes": {"5": "h"}})
        );
    }

    #[test]
    fn test_master_ack_optional_fields() {
        let empty: MasterAck = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, MasterAck::default());

        let failed: MasterAck = serde_json::from_value(json!({"error": "vault not found"})).unwrap();
        assert_eq!(failed.error.as_deref(), Some("vault not found"));
        assert!(failed.data.is_none());
    }

    #[test]
    fn test_id_ack_variants() {
        assert_eq!(serde_json::from_value::<IdAck>(json!(12)).unwrap(), IdAck::Id(12));
        assert_eq!(
            serde_json::from_value::<IdAck>(json!({"error": "conflict"})).unwrap(),
            IdAck::Error { error: "conflict".into() }
        );
        assert!(serde_json::from_value::<IdAck>(json!("twelve")).is_err());
    }
}
