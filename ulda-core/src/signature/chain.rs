use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use super::ring::SignatureRing;
use crate::constants::RING_STEP;
use crate::error::{Result, UldaError};

/// Build the pairwise hash ladder over `[start, end]` and read off its diagonal.
///
/// `start` defaults to the ring's minimum index and `end` to `start + 5`.
/// Level 0 is the ring itself; every level `d` holds
/// `H(level[d-1][n-1] || level[d-1][n])` for `n` in `[start + d, end]`.
/// Output index `start + i` takes the lowest entry of level `i`, so it has
/// absorbed `i` rounds of hashing over the tokens `start..=start + i`.
pub fn compute_linked_hashes(
    ring: &SignatureRing,
    start: Option<u64>,
    end: Option<u64>,
) -> Result<SignatureRing> {
    let ring_min = ring
        .min_index()
        .ok_or_else(|| UldaError::Consistency("cannot hash an empty signature ring".into()))?;
    let start = start.unwrap_or(ring_min);
    let end = end.unwrap_or(start + RING_STEP);
    if end < start {
        return Err(UldaError::Consistency(format!(
            "hash window end {end} precedes start {start}"
        )));
    }

    let mut level: BTreeMap<u64, String> = ring
        .iter()
        .map(|(index, token)| (index, token.to_string()))
        .collect();
    for index in start..=end {
        if !level.contains_key(&index) {
            return Err(UldaError::Consistency(format!(
                "signature ring has no entry at index {index}"
            )));
        }
    }

    let mut output = SignatureRing::new();
    output.insert(start, ring.get(ring_min).unwrap_or_default().to_string());

    for depth in 1..=(end - start) {
        let mut next = BTreeMap::new();
        for index in (start + depth)..=end {
            next.insert(index, hash_pair(&level[&(index - 1)], &level[&index]));
        }
        output.insert(start + depth, next[&(start + depth)].clone());
        level = next;
    }

    Ok(output)
}

fn hash_pair(left: &str, right: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(start: u64) -> SignatureRing {
        SignatureRing::from_tokens(start, ["a", "b", "c", "d", "e", "f"].map(String::from))
    }

    fn sha(data: &str) -> String {
        hex::encode(Sha256::digest(data.as_bytes()))
    }

    #[test]
    fn test_known_ladder_values() {
        let hashes = compute_linked_hashes(&letters(0), None, None).unwrap();

        let ab = sha("ab");
        let bc = sha("bc");
        let cd = sha("cd");
        let abc = sha(&format!("{ab}{bc}"));
        let bcd = sha(&format!("{bc}{cd}"));

        assert_eq!(hashes.len(), 6);
        assert_eq!(hashes.get(0), Some("a"));
        assert_eq!(hashes.get(1), Some(ab.as_str()));
        assert_eq!(hashes.get(2), Some(abc.as_str()));
        assert_eq!(hashes.get(3), Some(sha(&format!("{abc}{bcd}")).as_str()));
    }

    #[test]
    fn test_default_window_follows_ring_minimum() {
        let hashes = compute_linked_hashes(&letters(10), None, None).unwrap();
        assert_eq!(hashes.min_index(), Some(10));
        assert_eq!(hashes.max_index(), Some(15));
        assert_eq!(hashes.get(11), Some(sha("ab").as_str()));
    }

    #[test]
    fn test_deterministic() {
        let ring = letters(5);
        let first = compute_linked_hashes(&ring, Some(5), Some(10)).unwrap();
        let second = compute_linked_hashes(&ring, Some(5), Some(10)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_token_change_propagates_along_diagonal() {
        let original = compute_linked_hashes(&letters(0), None, None).unwrap();

        for changed in 0..6u64 {
            let mut tampered = letters(0);
            let token = tampered.get(changed).unwrap().to_string();
            tampered.insert(changed, format!("{token}X"));
            let hashes = compute_linked_hashes(&tampered, None, None).unwrap();

            for index in 0..6u64 {
                if index >= changed {
                    assert_ne!(hashes.get(index), original.get(index), "index {index} should change");
                } else {
                    assert_eq!(hashes.get(index), original.get(index), "index {index} should not change");
                }
            }
        }
    }

    #[test]
    fn test_missing_index_is_consistency_error() {
        let ring = SignatureRing::from_tokens(0, ["a", "b", "c"].map(String::from));
        let err = compute_linked_hashes(&ring, None, None).unwrap_err();
        assert!(matches!(err, UldaError::Consistency(_)));
    }

    #[test]
    fn test_empty_ring_is_consistency_error() {
        assert!(compute_linked_hashes(&SignatureRing::new(), None, None).is_err());
    }
}
