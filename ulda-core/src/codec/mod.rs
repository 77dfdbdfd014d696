//! Encryption envelopes for the vault index and for individual content records.

pub mod master;
pub mod content;

pub use content::{decrypt_content, encrypt_content, PasswordSettings};
pub use master::{decrypt_master, encrypt_master, Envelope, EnvelopeParams};
