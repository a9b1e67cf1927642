//! Rolling failure window.
//!
//! Time is cut into fixed-width buckets; each bucket counts successes and
//! failures. Buckets that fall out of the span are evicted on every read or
//! write, so memory stays bounded by the bucket count whatever the call volume.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::resilience::types::CallOutcome;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    index: u64,
    successes: u64,
    failures: u64,
}

/// Counts over the live part of the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub failures: u64,
    pub total: u64,
}

impl WindowStats {
    /// `failures / total`, or 0 for an empty window.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.failures as f64 / self.total as f64
        }
    }

    /// True when `failures / total >= percent / 100`, computed without floats.
    pub fn meets_percent(&self, percent: u8) -> bool {
        self.total > 0 && self.failures * 100 >= u64::from(percent) * self.total
    }
}

/// Bucketed record of recent call outcomes.
#[derive(Debug)]
pub struct RollingWindow {
    origin: Instant,
    bucket_width: Duration,
    bucket_count: u64,
    buckets: VecDeque<Bucket>,
}

impl RollingWindow {
    /// A window of `span` split into `bucket_count` buckets (at least one, each at least 1ms).
    pub fn new(span: Duration, bucket_count: u32) -> Self {
        let bucket_count = u64::from(bucket_count.max(1));
        let bucket_width = (span / bucket_count as u32).max(Duration::from_millis(1));
        Self {
            origin: Instant::now(),
            bucket_width,
            bucket_count,
            buckets: VecDeque::with_capacity(bucket_count as usize),
        }
    }

    /// Count `outcome` in the bucket covering `now`.
    ///
    /// `now` may be older than the newest bucket; the outcome lands in its own
    /// bucket, or is dropped if that bucket has already left the window.
    pub fn record_at(&mut self, outcome: &CallOutcome, now: Instant) {
        let index = self.bucket_index(now);
        let horizon = self.evict(now);
        if index + self.bucket_count <= horizon {
            return;
        }

        let pos = self.buckets.partition_point(|b| b.index < index);
        if self.buckets.get(pos).map_or(true, |b| b.index != index) {
            self.buckets.insert(
                pos,
                Bucket {
                    index,
                    successes: 0,
                    failures: 0,
                },
            );
        }

        if let Some(bucket) = self.buckets.get_mut(pos) {
            if outcome.is_failure() {
                bucket.failures += 1;
            } else {
                bucket.successes += 1;
            }
        }
    }

    /// Sum the buckets still in range at `now`.
    pub fn stats_at(&mut self, now: Instant) -> WindowStats {
        self.evict(now);
        self.buckets.iter().fold(
            WindowStats {
                failures: 0,
                total: 0,
            },
            |acc, b| WindowStats {
                failures: acc.failures + b.failures,
                total: acc.total + b.successes + b.failures,
            },
        )
    }

    /// Forget all history.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Number of buckets currently held.
    pub fn live_buckets(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_index(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin);
        (elapsed.as_nanos() / self.bucket_width.as_nanos()) as u64
    }

    /// Drop expired buckets; returns the newest bucket index seen so far.
    fn evict(&mut self, now: Instant) -> u64 {
        let current = self.bucket_index(now);
        let horizon = self.buckets.back().map_or(current, |b| b.index.max(current));
        let bucket_count = self.bucket_count;
        self.buckets.retain(|b| b.index + bucket_count > horizon);
        horizon
    }
}
