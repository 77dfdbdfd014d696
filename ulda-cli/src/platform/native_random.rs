use ulda_core::{SecureRandom, UldaError};

/// Native SecureRandom implementation using the OS CSPRNG via getrandom.
pub struct NativeRandom;

impl NativeRandom {
    pub fn new() -> Self {
        Self
    }
}

impl SecureRandom for NativeRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), UldaError> {
        getrandom::getrandom(dest)
            .map_err(|e| UldaError::Platform(format!("getrandom failed: {e}")))
    }
}
