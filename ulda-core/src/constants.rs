/// PBKDF2 iterations for master key derivation.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// PBKDF2 salt length in bytes (the `pbkdf2Salt` envelope field).
pub const PBKDF2_SALT_LEN: usize = 16;

/// Length of the envelope `salt` field. Carried on the wire, not fed to PBKDF2.
pub const ENVELOPE_SALT_LEN: usize = 16;

/// AES-256-GCM nonce length for the master envelope.
pub const GCM_NONCE_LEN: usize = 12;

/// Symmetric key length (256 bits) for both codecs.
pub const KEY_LEN: usize = 32;

/// AES-CBC initialization vector length for content records.
pub const CBC_IV_LEN: usize = 16;

/// Random bytes in a per-content password.
pub const CONTENT_PASSWORD_LEN: usize = 32;

/// Random bytes in a per-content XOR salt.
pub const CONTENT_SALT_LEN: usize = 32;

/// Random padding prepended to content plaintext before masking.
pub const CONTENT_PADDING_LEN: usize = 32;

/// Raw bytes per signature token (base64-encoded on the wire).
pub const SIGNATURE_TOKEN_LEN: usize = 33;

/// Number of entries in a signature ring.
pub const RING_WIDTH: u64 = 6;

/// How far a ring's index window slides on each mutation.
pub const RING_STEP: u64 = RING_WIDTH - 1;
