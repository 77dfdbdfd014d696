use std::time::Duration;

use crate::constants::PBKDF2_ITERATIONS;

/// Tunables for a `VaultClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// PBKDF2 iterations used when sealing the master file. Opening always
    /// uses the count recorded in the envelope.
    pub pbkdf2_iterations: u32,
    /// Upper bound on waiting for a single acknowledgment. `None` waits forever.
    pub call_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: PBKDF2_ITERATIONS,
            call_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}
