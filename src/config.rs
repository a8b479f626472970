// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parameters of a benchmark run.

use crate::accumulator::AccumulatorMode;
use crate::error::{Error, Result};
use crate::macros::log_warn;
use crate::pool::CpuPinningPolicy;

/// Parameters of a [`Harness`](crate::Harness) run.
///
/// ```
/// # use parascan::{AccumulatorMode, BenchmarkConfig, CpuPinningPolicy};
/// let config = BenchmarkConfig {
///     total: 1_000,
///     num_workers: 8,
///     mode: Some(AccumulatorMode::Unsynchronized),
///     cpu_pinning: CpuPinningPolicy::No,
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BenchmarkConfig {
    /// Size of the scanned range `0..total`.
    pub total: u64,
    /// Number of worker threads, each scanning one interval.
    pub num_workers: u32,
    /// Discipline of the shared accumulator that counts qualifying values. With
    /// [`None`], each qualifying value is reported to a
    /// [`ReportSink`](crate::ReportSink) instead.
    pub mode: Option<AccumulatorMode>,
    /// Policy to pin worker threads to CPUs.
    pub cpu_pinning: CpuPinningPolicy,
}

impl BenchmarkConfig {
    /// Default size of the scanned range.
    pub const DEFAULT_TOTAL: u64 = 10_000_000;
    /// Default number of worker threads.
    pub const DEFAULT_NUM_WORKERS: u32 = 4;

    /// Checks that these parameters describe a runnable benchmark.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(Error::InvalidPartitionCount);
        }
        Ok(())
    }

    /// Sets the number of workers to the available parallelism, as reported by
    /// [`std::thread::available_parallelism()`]. Falls back to a single
    /// worker if it can't be determined.
    pub fn with_available_parallelism(mut self) -> Self {
        self.num_workers = match std::thread::available_parallelism() {
            Ok(n) => u32::try_from(n.get()).unwrap_or(u32::MAX),
            Err(e) => {
                log_warn!("Getting the available parallelism failed, using 1 worker: {e}");
                1
            }
        };
        self
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            total: Self::DEFAULT_TOTAL,
            num_workers: Self::DEFAULT_NUM_WORKERS,
            mode: Some(AccumulatorMode::MutexGuarded),
            cpu_pinning: CpuPinningPolicy::No,
        }
    }
}
