//! Sorted Collection
//!
//! Members with integer scores, kept in ascending `(score, member)` order.
//! Ties on score are broken by member bytes, so iteration order is total and
//! stable across runs.

use bytes::Bytes;
use std::collections::{BTreeSet, HashMap};

/// An ordered map from member to score.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedCollection {
    scores: HashMap<Bytes, i64>,
    ordered: BTreeSet<(i64, Bytes)>,
}

impl SortedCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `member` or moves it to its new score.
    ///
    /// Returns `true` if the member was not present before.
    pub fn upsert(&mut self, member: Bytes, score: i64) -> bool {
        match self.scores.insert(member.clone(), score) {
            Some(old) => {
                if old != score {
                    self.ordered.remove(&(old, member.clone()));
                    self.ordered.insert((score, member));
                }
                false
            }
            None => {
                self.ordered.insert((score, member));
                true
            }
        }
    }

    pub fn score(&self, member: &[u8]) -> Option<i64> {
        self.scores.get(member).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Returns the members with zero-based ranks `start..=stop`.
    ///
    /// Negative ranks count from the end: `-1` is the highest-scored member.
    /// Out-of-range bounds are clamped; an empty window yields nothing.
    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<(Bytes, i64)> {
        let len = self.len() as i64;
        if len == 0 {
            return Vec::new();
        }

        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

        if start > stop || start >= len {
            return Vec::new();
        }

        self.ordered
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|(score, member)| (member.clone(), *score))
            .collect()
    }
}
