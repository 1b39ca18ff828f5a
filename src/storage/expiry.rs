//! Expiry Candidates
//!
//! The set of keys that currently carry a deadline. The storage engine keeps
//! it in lock-step with its key map and samples it during active expiration,
//! so a cleanup pass only ever looks at keys that can actually expire.
//!
//! Members live in a vector with a position index beside it. Adding and
//! removing are O(1) (removal swaps the last member into the hole) and a
//! sample of `n` members costs O(n) regardless of the set size.

use bytes::Bytes;
use rand::seq::index;
use std::collections::HashMap;

/// Sampling parameters for active expiration. How often a cycle runs is
/// up to the caller; see `crate::dispatcher::ExpirySweeper`.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Keys sampled per cleanup round (default: 20)
    pub sample_size: usize,

    /// A round that reclaims more than this many keys is followed
    /// immediately by another round (default: 5)
    pub resample_threshold: usize,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            sample_size: 20,
            resample_threshold: 5,
        }
    }
}

/// Set of keys with an expiry, supporting random sampling.
#[derive(Debug, Default)]
pub struct ExpiryCandidates {
    keys: Vec<Bytes>,
    positions: HashMap<Bytes, usize>,
}

impl ExpiryCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key. Adding a member twice is a no-op.
    pub fn add(&mut self, key: Bytes) {
        if self.positions.contains_key(&key) {
            return;
        }
        self.positions.insert(key.clone(), self.keys.len());
        self.keys.push(key);
    }

    /// Removes a key. Returns `true` if it was a member.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        let pos = match self.positions.remove(key) {
            Some(pos) => pos,
            None => return false,
        };

        self.keys.swap_remove(pos);
        if let Some(moved) = self.keys.get(pos) {
            self.positions.insert(moved.clone(), pos);
        }
        true
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.positions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns up to `n` distinct members chosen uniformly at random.
    ///
    /// When the set holds `n` members or fewer, all of them are returned.
    pub fn sample(&self, n: usize) -> Vec<Bytes> {
        let amount = n.min(self.keys.len());
        let mut rng = rand::thread_rng();

        index::sample(&mut rng, self.keys.len(), amount)
            .into_iter()
            .map(|i| self.keys[i].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_add_and_sample_single() {
        let mut set = ExpiryCandidates::new();
        set.add(key("one"));

        assert_eq!(set.sample(1), vec![key("one")]);
    }

    #[test]
    fn test_sample_more_than_size_returns_all() {
        let mut set = ExpiryCandidates::new();
        set.add(key("one"));
        set.add(key("two"));

        let sampled: HashSet<Bytes> = set.sample(3).into_iter().collect();
        assert_eq!(sampled.len(), 2);
        assert!(sampled.contains(&key("one")));
        assert!(sampled.contains(&key("two")));
    }

    #[test]
    fn test_sample_is_distinct_and_bounded() {
        let mut set = ExpiryCandidates::new();
        for i in 0..100 {
            set.add(key(&format!("k{}", i)));
        }

        let sampled = set.sample(20);
        assert_eq!(sampled.len(), 20);

        let unique: HashSet<&Bytes> = sampled.iter().collect();
        assert_eq!(unique.len(), 20);
        assert!(sampled.iter().all(|k| set.contains(k)));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut set = ExpiryCandidates::new();
        set.add(key("one"));
        set.add(key("one"));

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut set = ExpiryCandidates::new();
        set.add(key("one"));
        assert_eq!(set.sample(1).len(), 1);

        assert!(set.remove(b"one"));
        assert!(set.sample(1).is_empty());
        assert!(!set.remove(b"one"));
    }

    #[test]
    fn test_remove_keeps_positions_consistent() {
        let mut set = ExpiryCandidates::new();
        for name in ["a", "b", "c", "d"] {
            set.add(key(name));
        }

        assert!(set.remove(b"a"));
        assert!(set.remove(b"c"));
        assert!(set.contains(b"b"));
        assert!(set.contains(b"d"));

        assert!(set.remove(b"d"));
        assert!(set.remove(b"b"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = ExpiryConfig::default();
        assert_eq!(config.sample_size, 20);
        assert_eq!(config.resample_threshold, 5);
    }

    #[test]
    fn test_sample_empty() {
        let set = ExpiryCandidates::new();
        assert!(set.sample(20).is_empty());
    }
}
