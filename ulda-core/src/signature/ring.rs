use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::constants::{RING_STEP, RING_WIDTH, SIGNATURE_TOKEN_LEN};
use crate::error::{Result, UldaError};
use crate::traits::random::SecureRandom;

/// Produce `count` independent random tokens (33 bytes each, base64).
pub fn generate_tokens(count: usize, rng: &dyn SecureRandom) -> Result<Vec<String>> {
    (0..count)
        .map(|_| {
            let bytes = rng.random_bytes(SIGNATURE_TOKEN_LEN)?;
            Ok(STANDARD.encode(bytes))
        })
        .collect()
}

/// Index-keyed window of signature tokens.
///
/// Serialized as a JSON object whose keys are the decimal indexes, which is
/// the shape the store expects for both raw rings and hash rings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureRing(BTreeMap<u64, String>);

impl SignatureRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fresh ring covering indexes `0..RING_WIDTH`.
    pub fn seed(rng: &dyn SecureRandom) -> Result<Self> {
        let tokens = generate_tokens(RING_WIDTH as usize, rng)?;
        Ok(Self::from_tokens(0, tokens))
    }

    /// Place `tokens` at consecutive indexes beginning at `start`.
    pub fn from_tokens(start: u64, tokens: impl IntoIterator<Item = String>) -> Self {
        Self((start..).zip(tokens).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn min_index(&self) -> Option<u64> {
        self.0.keys().next().copied()
    }

    pub fn max_index(&self) -> Option<u64> {
        self.0.keys().next_back().copied()
    }

    pub fn get(&self, index: u64) -> Option<&str> {
        self.0.get(&index).map(String::as_str)
    }

    pub fn insert(&mut self, index: u64, token: String) -> Option<String> {
        self.0.insert(index, token)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.0.iter().map(|(index, token)| (*index, token.as_str()))
    }

    /// Check the ring holds exactly `RING_WIDTH` contiguous entries.
    pub fn validate(&self) -> Result<()> {
        let (min, max) = match (self.min_index(), self.max_index()) {
            (Some(min), Some(max)) => (min, max),
            _ => return Err(UldaError::Consistency("signature ring is empty".into())),
        };
        if self.0.len() as u64 != RING_WIDTH || max - min != RING_WIDTH - 1 {
            return Err(UldaError::Consistency(format!(
                "signature ring must hold {RING_WIDTH} contiguous entries, found {} spanning {min}..={max}",
                self.0.len()
            )));
        }
        Ok(())
    }

    /// Slide the window forward by `RING_STEP`.
    ///
    /// The newest entry survives as the new minimum; everything older is
    /// dropped and fresh tokens fill the rest of the window.
    pub fn step_up(&mut self, rng: &dyn SecureRandom) -> Result<()> {
        self.validate()?;
        let min = self.min_index().unwrap_or_default();
        let new_min = min + RING_STEP;

        let fresh = generate_tokens(RING_STEP as usize, rng)?;
        self.0.retain(|index, _| *index >= new_min);
        self.0.extend((new_min + 1..).zip(fresh));

        debug_assert_eq!(self.0.len() as u64, RING_WIDTH);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestRng;
    impl SecureRandom for TestRng {
        fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
            getrandom::getrandom(dest).map_err(|e| UldaError::Platform(e.to_string()))
        }
    }

    #[test]
    fn test_generate_tokens() {
        let tokens = generate_tokens(4, &TestRng).unwrap();
        assert_eq!(tokens.len(), 4);
        for token in &tokens {
            assert_eq!(STANDARD.decode(token).unwrap().len(), SIGNATURE_TOKEN_LEN);
        }
        assert_ne!(tokens[0], tokens[1]);
    }

    #[test]
    fn test_seed_is_valid() {
        let ring = SignatureRing::seed(&TestRng).unwrap();
        assert_eq!(ring.len(), 6);
        assert_eq!(ring.min_index(), Some(0));
        assert_eq!(ring.max_index(), Some(5));
        ring.validate().unwrap();
    }

    #[test]
    fn test_step_up_width_and_min_index() {
        let mut ring = SignatureRing::seed(&TestRng).unwrap();
        for n in 1..=20u64 {
            ring.step_up(&TestRng).unwrap();
            assert_eq!(ring.len(), 6);
            assert_eq!(ring.min_index(), Some(5 * n));
            ring.validate().unwrap();
        }
    }

    #[test]
    fn test_step_up_keeps_newest_token() {
        let mut ring = SignatureRing::seed(&TestRng).unwrap();
        let newest = ring.get(5).unwrap().to_string();
        let oldest = ring.get(0).unwrap().to_string();

        ring.step_up(&TestRng).unwrap();
        assert_eq!(ring.get(5), Some(newest.as_str()));
        assert!(ring.iter().all(|(_, token)| token != oldest));
    }

    #[test]
    fn test_step_up_rejects_invalid_ring() {
        let mut ring = SignatureRing::from_tokens(0, vec!["a".to_string(), "b".to_string()]);
        assert!(ring.step_up(&TestRng).is_err());
    }

    #[test]
    fn test_validate_rejects_gap() {
        let mut ring = SignatureRing::from_tokens(0, (0..5).map(|i| i.to_string()));
        ring.insert(6, "gap".into());
        assert!(ring.validate().is_err());
    }

    #[test]
    fn test_serializes_as_index_object() {
        let ring = SignatureRing::from_tokens(5, vec!["x".to_string(), "y".to_string()]);
        let json = serde_json::to_string(&ring).unwrap();
        assert_eq!(json, r#"{"5":"x","6":"y"}"#);

        let decoded: SignatureRing = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, ring);
    }
}
