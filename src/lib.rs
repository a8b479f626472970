// Copyright 2024-2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![doc = include_str!("../README.md")]
#![forbid(missing_docs, unsafe_code)]

mod accumulator;
mod clock;
mod config;
mod error;
mod harness;
mod macros;
mod partition;
mod pool;
mod primes;
mod sink;

pub use accumulator::{AccumulatorMode, SharedAccumulator};
pub use clock::{Clock, StartedClock, TimingResult};
pub use config::BenchmarkConfig;
pub use error::{Error, Result, TaskError, WorkerFailure};
pub use harness::{Harness, RunReport};
pub use partition::{partition, Interval, Partition};
pub use pool::{CpuPinningPolicy, WorkerHandle, WorkerPool, WorkerPoolBuilder};
pub use primes::is_prime;
pub use sink::{CollectingSink, NullSink, ReportSink, WriterSink};

/// Counts the primes in `0..total` with `num_workers` threads, using a shared
/// accumulator with the given discipline.
///
/// ```
/// # use parascan::{run_benchmark, AccumulatorMode};
/// let report = run_benchmark(1_000, 4, AccumulatorMode::MutexGuarded).unwrap();
/// assert_eq!(report.final_value, Some(168));
/// ```
pub fn run_benchmark(total: u64, num_workers: u32, mode: AccumulatorMode) -> Result<RunReport> {
    let harness = Harness::new(BenchmarkConfig {
        total,
        num_workers,
        mode: Some(mode),
        ..Default::default()
    })?;
    harness.run(is_prime)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_run_benchmark_counts_primes() {
        for num_workers in [1, 2, 4, 8] {
            let report =
                run_benchmark(10_000, num_workers, AccumulatorMode::MutexGuarded).unwrap();
            assert_eq!(report.final_value, Some(1229));
            assert!(report.elapsed_seconds() >= 0.0);
        }
    }

    #[test]
    fn test_run_benchmark_single_unsynchronized_worker() {
        let report = run_benchmark(10_000, 1, AccumulatorMode::Unsynchronized).unwrap();
        assert_eq!(report.final_value, Some(1229));
    }

    #[test]
    fn test_run_benchmark_zero_workers() {
        assert!(matches!(
            run_benchmark(10_000, 0, AccumulatorMode::MutexGuarded),
            Err(Error::InvalidPartitionCount)
        ));
    }
}
