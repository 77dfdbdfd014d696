use thiserror::Error;

use crate::client::PendingLink;

#[derive(Error, Debug)]
pub enum UldaError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Vault not found: {0}")]
    VaultNotFound(String),

    #[error("Decryption error: {0}")]
    Decryption(String),

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rejected by store: {0}")]
    Rejected(String),

    #[error("Call cancelled: {0}")]
    Cancelled(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Session not ready: {0}")]
    NotReady(String),

    /// `content:create` succeeded but linking the new id into the master file did not.
    #[error("content {} created but not linked to the vault: {source}", .pending.id)]
    OrphanedContent {
        pending: PendingLink,
        source: Box<UldaError>,
    },
}

/// Coarse failure classes a caller can branch on for retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Auth,
    Decryption,
    Consistency,
    Protocol,
    Conflict,
    Cancelled,
    Rejected,
}

impl UldaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UldaError::Connection(_) => ErrorKind::Connection,
            UldaError::Auth(_) | UldaError::VaultNotFound(_) => ErrorKind::Auth,
            UldaError::Decryption(_) => ErrorKind::Decryption,
            UldaError::Consistency(_) | UldaError::NotReady(_) => ErrorKind::Consistency,
            UldaError::Protocol(_) | UldaError::Serialization(_) => ErrorKind::Protocol,
            UldaError::Conflict(_) => ErrorKind::Conflict,
            UldaError::Cancelled(_) => ErrorKind::Cancelled,
            UldaError::Rejected(_) | UldaError::Platform(_) => ErrorKind::Rejected,
            // Decrypt paths report `Decryption` themselves; what reaches here
            // failed while sealing.
            UldaError::Crypto(_) => ErrorKind::Consistency,
            UldaError::OrphanedContent { source, .. } => source.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UldaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::content::PasswordSettings;

    #[test]
    fn test_sealing_failure_is_not_a_credential_error() {
        let err = UldaError::from(crate::crypto::CryptoError::Pbkdf2Derive(
            "iteration count must be non-zero".into(),
        ));
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[test]
    fn test_not_found_is_auth_kind() {
        let err = UldaError::VaultNotFound("no vault for key".into());
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_orphaned_content_reports_cause_kind() {
        let err = UldaError::OrphanedContent {
            pending: PendingLink {
                id: 7,
                settings: PasswordSettings {
                    password: String::new(),
                    iv: String::new(),
                    salt: String::new(),
                },
            },
            source: Box::new(UldaError::Conflict("stale ring".into())),
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("content 7"));
    }
}
