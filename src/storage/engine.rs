//! Storage Engine with Lazy and Active Expiry
//!
//! The engine owns the whole key space: a map from key to [`Entry`] plus the
//! [`ExpiryCandidates`] set of keys that carry a deadline.
//!
//! ## Concurrency Model
//!
//! The engine has no internal locking. Every method takes `&mut self` and
//! the only owner is the dispatcher's event loop, which runs one command to
//! completion before starting the next (see `crate::dispatcher`).
//!
//! ## Expiry
//!
//! - **Lazy**: any operation that touches an expired key deletes it first.
//! - **Active**: [`StorageEngine::cleanup`] samples the candidate set and
//!   reclaims expired keys, repeating while a round stays productive.
//!
//! A key has `expires_at` set exactly when it is in the candidate set.
//!
//! ## Type confusion
//!
//! `GET` on a sorted collection returns nothing, and `ZADD` over a string
//! replaces it with a fresh collection. Neither is reported as an error.

use crate::storage::expiry::{ExpiryCandidates, ExpiryConfig};
use crate::storage::sorted::SortedCollection;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Relative expiry times are capped at roughly 100 years.
const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// The value held under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Str(Bytes),
    Sorted(SortedCollection),
}

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone)]
pub struct Entry {
    pub payload: Payload,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(payload: Payload, expires_at: Option<Instant>) -> Self {
        Self {
            payload,
            expires_at,
        }
    }

    /// An entry is expired once `now` has reached its deadline.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// Outcome of one active-expiration cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Sample-and-reclaim rounds performed
    pub rounds: usize,
    /// Candidate keys inspected across all rounds
    pub sampled: usize,
    /// Expired keys deleted
    pub reclaimed: usize,
}

/// Database statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageStats {
    /// Keys currently stored, expired-but-unreclaimed ones included
    pub keys: usize,
    /// Keys carrying a deadline
    pub tracked: usize,
    /// Total expired keys removed, lazily or actively
    pub expired: u64,
}

/// Computes the deadline `seconds` after `now`. Negative values produce a
/// deadline in the past.
pub fn deadline_after(now: Instant, seconds: i64) -> Instant {
    let span = Duration::from_secs(seconds.unsigned_abs().min(MAX_TTL_SECS));
    if seconds >= 0 {
        now.checked_add(span).unwrap_or(now)
    } else {
        now.checked_sub(span).unwrap_or(now)
    }
}

/// Maps a client position onto a zero-based rank in a collection of `len`.
///
/// Positive positions are one-based and negative positions count back from
/// the highest member. Position `0` and anything below the lowest member
/// clamp to rank 0.
fn position_to_rank(pos: i64, len: i64) -> i64 {
    match pos {
        p if p > 0 => p - 1,
        0 => 0,
        p => len.saturating_add(p).max(0),
    }
}

/// The key space.
///
/// # Example
///
/// ```
/// use quillkv::storage::StorageEngine;
/// use bytes::Bytes;
///
/// let mut engine = StorageEngine::new();
/// engine.set(Bytes::from("name"), Bytes::from("quill"), None);
/// assert_eq!(engine.get(&Bytes::from("name")), Some(Bytes::from("quill")));
/// ```
#[derive(Debug, Default)]
pub struct StorageEngine {
    data: HashMap<Bytes, Entry>,
    candidates: ExpiryCandidates,
    config: ExpiryConfig,
    expired_count: u64,
}

impl StorageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with custom active-expiration sampling.
    pub fn with_config(config: ExpiryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn ping(&self) -> &'static str {
        "PONG"
    }

    /// Deletes `key` if its deadline has passed. Returns `true` if it did.
    fn expire_if_needed(&mut self, key: &[u8], now: Instant) -> bool {
        let expired = self
            .data
            .get(key)
            .map(|entry| entry.is_expired_at(now))
            .unwrap_or(false);

        if expired {
            self.remove_entry(key);
            self.expired_count += 1;
        }
        expired
    }

    fn remove_entry(&mut self, key: &[u8]) -> Option<Entry> {
        self.candidates.remove(key);
        self.data.remove(key)
    }

    /// Returns the string stored at `key`.
    ///
    /// Missing keys, expired keys and sorted collections all yield `None`.
    pub fn get(&mut self, key: &Bytes) -> Option<Bytes> {
        self.expire_if_needed(key, Instant::now());

        match self.data.get(key) {
            Some(Entry {
                payload: Payload::Str(value),
                ..
            }) => Some(value.clone()),
            _ => None,
        }
    }

    /// Stores a string, replacing whatever was at `key`.
    ///
    /// Without a deadline the key also stops being tracked for expiry.
    pub fn set(&mut self, key: Bytes, value: Bytes, expires_at: Option<Instant>) {
        match expires_at {
            Some(_) => self.candidates.add(key.clone()),
            None => {
                self.candidates.remove(&key);
            }
        }
        self.data
            .insert(key, Entry::new(Payload::Str(value), expires_at));
    }

    /// Deletes every live key in `keys`. Returns how many were removed.
    pub fn del(&mut self, keys: &[Bytes]) -> u64 {
        let now = Instant::now();
        let mut deleted = 0;

        for key in keys {
            if self.expire_if_needed(key, now) {
                continue;
            }
            if self.remove_entry(key).is_some() {
                deleted += 1;
            }
        }
        deleted
    }

    /// Gives `key` a deadline `seconds` from now, replacing any previous one.
    ///
    /// Always returns 1. Missing or already expired keys are left absent.
    pub fn expire(&mut self, key: &Bytes, seconds: i64) -> i64 {
        let now = Instant::now();
        self.expire_if_needed(key, now);

        if let Some(entry) = self.data.get_mut(key) {
            entry.expires_at = Some(deadline_after(now, seconds));
            self.candidates.add(key.clone());
        }
        1
    }

    /// Returns every live key, deleting expired ones on the way.
    ///
    /// The pattern is accepted for protocol compatibility and not applied.
    pub fn keys(&mut self, _pattern: &[u8]) -> Vec<Bytes> {
        let now = Instant::now();
        let mut live = Vec::with_capacity(self.data.len());
        let mut reclaimed = 0;
        let candidates = &mut self.candidates;

        self.data.retain(|key, entry| {
            if entry.is_expired_at(now) {
                candidates.remove(key);
                reclaimed += 1;
                false
            } else {
                live.push(key.clone());
                true
            }
        });

        self.expired_count += reclaimed;
        live
    }

    /// Upserts `(score, member)` pairs into the sorted collection at `key`.
    ///
    /// A missing, expired or non-collection entry is replaced by an empty
    /// collection without expiry first. Returns the number of pairs applied.
    pub fn zadd(&mut self, key: Bytes, pairs: Vec<(i64, Bytes)>) -> u64 {
        self.expire_if_needed(&key, Instant::now());
        let applied = pairs.len() as u64;

        let is_collection = matches!(
            self.data.get(&key),
            Some(Entry {
                payload: Payload::Sorted(_),
                ..
            })
        );
        if !is_collection {
            self.candidates.remove(&key);
            self.data.insert(
                key.clone(),
                Entry::new(Payload::Sorted(SortedCollection::new()), None),
            );
        }

        if let Some(Entry {
            payload: Payload::Sorted(set),
            ..
        }) = self.data.get_mut(&key)
        {
            for (score, member) in pairs {
                set.upsert(member, score);
            }
        }
        applied
    }

    /// Returns members of the collection at `key` between two positions,
    /// inclusive.
    ///
    /// The window is walked in ascending score order, or descending when
    /// `start` lies after `stop`. A descending window whose start is past
    /// the highest member is empty. With `with_scores` each member is
    /// followed by its score in decimal.
    pub fn zrange(&mut self, key: &Bytes, start: i64, stop: i64, with_scores: bool) -> Vec<Bytes> {
        self.expire_if_needed(key, Instant::now());

        let set = match self.data.get(key) {
            Some(Entry {
                payload: Payload::Sorted(set),
                ..
            }) => set,
            _ => return Vec::new(),
        };

        let len = set.len() as i64;
        let (first, last) = (position_to_rank(start, len), position_to_rank(stop, len));
        let window = if first <= last {
            set.range_by_rank(first, last)
        } else if first < len {
            let mut window = set.range_by_rank(last, first);
            window.reverse();
            window
        } else {
            Vec::new()
        };

        let mut out = Vec::new();
        for (member, score) in window {
            out.push(member);
            if with_scores {
                out.push(Bytes::from(score.to_string()));
            }
        }
        out
    }

    /// Active expiration.
    ///
    /// Samples up to `sample_size` candidate keys and deletes the expired
    /// ones. When a round reclaims more than `resample_threshold` keys
    /// another round follows immediately; otherwise the cycle ends.
    /// Sampled candidates that are no longer stored are dropped from the
    /// set without being counted.
    pub fn cleanup(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        loop {
            let now = Instant::now();
            let sample = self.candidates.sample(self.config.sample_size);
            report.rounds += 1;
            report.sampled += sample.len();

            let mut reclaimed = 0;
            for key in sample {
                match self.data.get(&key).map(|entry| entry.is_expired_at(now)) {
                    Some(true) => {
                        self.remove_entry(&key);
                        reclaimed += 1;
                    }
                    Some(false) => {}
                    None => {
                        self.candidates.remove(&key);
                    }
                }
            }

            report.reclaimed += reclaimed;
            if reclaimed <= self.config.resample_threshold {
                break;
            }
        }

        self.expired_count += report.reclaimed as u64;
        report
    }

    /// Number of stored keys, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if `key` is tracked for active expiration.
    pub fn is_tracked(&self, key: &[u8]) -> bool {
        self.candidates.contains(key)
    }

    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.data.len(),
            tracked: self.candidates.len(),
            expired: self.expired_count,
        }
    }
}
