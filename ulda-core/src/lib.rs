//! Client library for a zero-knowledge personal vault.
//!
//! A password-sealed master file indexes independently encrypted content
//! records. Every write carries a rolling window of linked hash signatures so
//! the store can accept only forward progress without learning plaintext.
//! The store itself is reached through the [`AckChannel`] seam; bring your
//! own transport or use [`MemoryStore`] in process.

pub mod client;
pub mod codec;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod memory;
pub mod model;
pub mod protocol;
pub mod session;
pub mod signature;
pub mod traits;

pub use client::{
    ContentListing, CreatedContent, PendingLink, RecordFailure, SessionState, VaultClient,
};
pub use codec::content::PasswordSettings;
pub use config::ClientConfig;
pub use error::{ErrorKind, Result, UldaError};
pub use memory::{Fault, MemoryStore};
pub use model::{ContentRecord, ContentRef, MasterFile};
pub use signature::SignatureRing;
pub use traits::channel::{AckChannel, Operation};
pub use traits::random::SecureRandom;
