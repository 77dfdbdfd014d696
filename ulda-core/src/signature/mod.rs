//! Rolling signature rings and the pairwise hash ladder the store uses as tamper evidence.

pub mod ring;
pub mod chain;

pub use chain::compute_linked_hashes;
pub use ring::{generate_tokens, SignatureRing};
