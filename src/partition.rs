// Copyright 2024-2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Splitting a range of integers into contiguous intervals, one per worker.

use crate::error::{Error, Result};
use crate::macros::log_debug;
use std::fmt;

/// A half-open range of integers `start..stop`, similar to
/// [`std::ops::Range<u64>`] but [`Copy`] and guaranteed to be well-formed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    /// First integer in the interval.
    start: u64,
    /// One past the last integer in the interval.
    stop: u64,
}

impl Interval {
    /// Creates the interval `start..stop`.
    ///
    /// # Panics
    ///
    /// Panics if `start > stop`.
    pub fn new(start: u64, stop: u64) -> Self {
        assert!(
            start <= stop,
            "Invalid interval: start ({start}) is larger than stop ({stop})"
        );
        Self { start, stop }
    }

    /// Returns the first integer in this interval (inclusive).
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Returns the end of this interval (exclusive).
    pub fn stop(&self) -> u64 {
        self.stop
    }

    /// Returns the number of integers in this interval.
    pub fn len(&self) -> u64 {
        self.stop - self.start
    }

    /// Returns true if this interval contains no integers.
    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// Returns an iterator over the integers in this interval, in increasing
    /// order.
    pub fn iter(&self) -> std::ops::Range<u64> {
        self.start..self.stop
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

impl From<Interval> for std::ops::Range<u64> {
    fn from(interval: Interval) -> Self {
        interval.iter()
    }
}

/// An ordered sequence of intervals covering `0..total` exactly.
///
/// Successive intervals are contiguous: each one starts where the previous one
/// stops. All intervals have the same length `total / count`, except the last
/// one which additionally absorbs the remainder `total % count`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    intervals: Vec<Interval>,
}

impl Partition {
    /// Splits `0..total` into `count` intervals.
    ///
    /// ```
    /// # use parascan::{Interval, Partition};
    /// let partition = Partition::new(10, 3).unwrap();
    /// assert_eq!(
    ///     partition.intervals(),
    ///     &[Interval::new(0, 3), Interval::new(3, 6), Interval::new(6, 10)]
    /// );
    /// ```
    ///
    /// Fails with [`Error::InvalidPartitionCount`] if `count` is zero.
    pub fn new(total: u64, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidPartitionCount);
        }

        let count = u64::from(count);
        let chunk_size = total / count;
        let intervals = (0..count)
            .map(|i| {
                let start = i * chunk_size;
                let stop = if i + 1 == count {
                    total
                } else {
                    (i + 1) * chunk_size
                };
                Interval::new(start, stop)
            })
            .collect();
        log_debug!("Partitioned 0..{total} into {count} intervals of {chunk_size} items");

        Ok(Self { intervals })
    }

    /// Returns the intervals, in increasing order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Returns the number of intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Always false: a partition has at least one interval.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Returns the end of the covered range.
    pub fn total(&self) -> u64 {
        self.intervals.last().map_or(0, Interval::stop)
    }

    /// Returns an iterator over the intervals.
    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Partition {
    type Item = Interval;
    type IntoIter = std::vec::IntoIter<Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.into_iter()
    }
}

/// Splits `0..total` into `count` contiguous intervals, the last one absorbing
/// any remainder. See [`Partition::new()`].
pub fn partition(total: u64, count: u32) -> Result<Vec<Interval>> {
    Partition::new(total, count).map(|p| p.intervals)
}
