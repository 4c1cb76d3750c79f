//! Bounded record retention
//!
//! Every channel keeps its history in a [`RecordRing`]: an append-only
//! sequence with two independent bounds, a maximum record count and a
//! maximum age relative to a reference time. Appends never truncate;
//! eviction happens in a periodic sweep ([`RecordRing::enforce`]) driven by
//! the scheduler, so a channel may transiently exceed its bounds between
//! sweeps.
//!
//! Age is computed as `reference - timestamp` against the supplied
//! reference time (server time, not wall time). A reference older than a
//! record produces a negative age and never evicts it, which makes the
//! sweep safe to run with a stale or zero reference.

use std::collections::VecDeque;

use crate::types::ChannelRecord;

/// Retention bounds applied to every channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of records kept per channel
    pub max_size: usize,
    /// Maximum record age in seconds, relative to the sweep's reference time
    pub max_time_seconds: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_size: 3000,
            max_time_seconds: 60,
        }
    }
}

impl RetentionPolicy {
    /// Maximum age in microseconds.
    #[inline]
    pub fn max_age_micros(&self) -> i64 {
        self.max_time_seconds as i64 * 1_000_000
    }
}

/// Append-only record sequence with sweep-based eviction
#[derive(Debug, Default)]
pub struct RecordRing {
    records: VecDeque<ChannelRecord>,
}

impl RecordRing {
    /// Create an empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the tail. Never evicts.
    pub fn append(&mut self, record: ChannelRecord) {
        self.records.push_back(record);
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ring holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over retained records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ChannelRecord> {
        self.records.iter()
    }

    /// Snapshot of retained records, oldest first.
    pub fn to_vec(&self) -> Vec<ChannelRecord> {
        self.records.iter().cloned().collect()
    }

    /// The most recent record by insertion order.
    ///
    /// Insertion order and timestamp order can disagree after a reconnect;
    /// "latest" here always means the tail.
    pub fn latest(&self) -> Option<&ChannelRecord> {
        self.records.back()
    }

    /// Returns the suffix of records whose timestamps fall within
    /// `window_micros` of the tail record's timestamp, oldest first.
    ///
    /// The window anchors at the insertion-order tail, which is assumed to
    /// carry the maximum timestamp; an out-of-order tail shrinks the window
    /// rather than corrupting it, since the walk stops at the first record
    /// outside the window. A window of zero or less returns only the latest
    /// record.
    pub fn lookback(&self, window_micros: i64) -> Vec<ChannelRecord> {
        let Some(tail) = self.records.back() else {
            return Vec::new();
        };

        if window_micros <= 0 {
            return vec![tail.clone()];
        }

        let anchor = tail.timestamp_micros;
        let mut matched: Vec<ChannelRecord> = Vec::new();
        for record in self.records.iter().rev() {
            if anchor - record.timestamp_micros > window_micros {
                break;
            }
            matched.push(record.clone());
        }

        matched.reverse();
        matched
    }

    /// Evict from the head until both retention bounds hold.
    ///
    /// Idempotent; returns the number of evicted records.
    pub fn enforce(&mut self, policy: &RetentionPolicy, reference_micros: i64) -> usize {
        let mut evicted = 0;

        while self.records.len() > policy.max_size {
            self.records.pop_front();
            evicted += 1;
        }

        let max_age = policy.max_age_micros();
        while let Some(front) = self.records.front() {
            if reference_micros - front.timestamp_micros > max_age {
                self.records.pop_front();
                evicted += 1;
            } else {
                break;
            }
        }

        evicted
    }

    /// Discard all records. The channel identity owning this ring survives.
    pub fn purge(&mut self) {
        self.records.clear();
    }
}
