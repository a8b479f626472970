// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Timed parallel scan of a range of integers.

use crate::accumulator::SharedAccumulator;
use crate::clock::{Clock, TimingResult};
use crate::config::BenchmarkConfig;
use crate::error::{Result, TaskError};
#[cfg(feature = "log_parallelism")]
use crate::macros::log_info;
use crate::macros::log_debug;
use crate::partition::{Interval, Partition};
use crate::pool::WorkerPoolBuilder;
use crate::sink::{NullSink, ReportSink};
use std::sync::Arc;
use std::time::Duration;

/// Scans `0..total` in parallel, counting or reporting the integers that
/// satisfy a predicate, and measures how long the scan takes.
///
/// ```
/// # use parascan::{AccumulatorMode, BenchmarkConfig, Harness};
/// let harness = Harness::new(BenchmarkConfig {
///     total: 1_000,
///     num_workers: 3,
///     mode: Some(AccumulatorMode::MutexGuarded),
///     ..Default::default()
/// })
/// .unwrap();
///
/// let report = harness.run(|i| i % 10 == 0).unwrap();
/// assert_eq!(report.final_value, Some(100));
/// assert!(report.elapsed_seconds() >= 0.0);
/// ```
pub struct Harness {
    /// Parameters of the runs.
    config: BenchmarkConfig,
    /// Intervals assigned to the workers.
    partition: Partition,
    /// Destination of the qualifying values, when no accumulator is configured.
    sink: Arc<dyn ReportSink>,
}

impl Harness {
    /// Creates a harness with the given parameters.
    ///
    /// The parameters are validated and the range is partitioned here, so that
    /// invalid parameters are reported before any worker is spawned.
    pub fn new(config: BenchmarkConfig) -> Result<Self> {
        config.validate()?;
        let partition = Partition::new(config.total, config.num_workers)?;
        Ok(Self {
            config,
            partition,
            sink: Arc::new(NullSink),
        })
    }

    /// Sets the sink that receives the qualifying values when
    /// [`BenchmarkConfig::mode`] is [`None`]. Defaults to [`NullSink`].
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the parameters of this harness.
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Returns the intervals assigned to the workers.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Runs one timed parallel scan.
    ///
    /// Each worker calls `per_unit_work` on every integer of its interval. For
    /// each call returning true, it either adds 1 to a fresh
    /// [`SharedAccumulator`] (if [`BenchmarkConfig::mode`] is set) or emits the
    /// integer to the sink.
    ///
    /// If a worker fails, the other workers still run to completion and the
    /// first failure is returned. No count is returned in that case: the
    /// accumulator state after a failure is undefined.
    pub fn run<W>(&self, per_unit_work: W) -> Result<RunReport>
    where
        W: Fn(u64) -> bool + Send + Sync + 'static,
    {
        let mut clock = Clock::start();

        let context = Arc::new(ScanContext {
            per_unit_work,
            target: match self.config.mode {
                Some(mode) => ScanTarget::Accumulator(SharedAccumulator::new(mode)),
                None => ScanTarget::Sink(self.sink.clone()),
            },
        });

        let mut pool = WorkerPoolBuilder {
            cpu_pinning: self.config.cpu_pinning,
        }
        .spawn(
            self.partition.intervals(),
            context.clone(),
            scan_interval::<W>,
        )?;
        pool.join_all()?;

        let timing = clock.stop()?;
        log_debug!(
            "[main thread] {} workers took {:.6} seconds to complete",
            self.partition.len(),
            timing.elapsed_seconds
        );

        let final_value = match &context.target {
            ScanTarget::Accumulator(accumulator) => Some(accumulator.read()),
            ScanTarget::Sink(_) => None,
        };
        Ok(RunReport {
            timing,
            final_value,
        })
    }
}

/// Outcome of a successful [`Harness::run()`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunReport {
    /// Wall-clock duration of the parallel scan.
    pub timing: TimingResult,
    /// Final value of the accumulator, or [`None`] if values were sent to a
    /// sink instead.
    pub final_value: Option<i64>,
}

impl RunReport {
    /// Returns the duration of the parallel scan in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.timing.elapsed_seconds
    }

    /// Returns the duration of the parallel scan.
    pub fn elapsed(&self) -> Duration {
        self.timing.as_duration()
    }
}

/// Where the workers record the qualifying values.
enum ScanTarget {
    Accumulator(SharedAccumulator),
    Sink(Arc<dyn ReportSink>),
}

/// State shared by all the workers of a run.
struct ScanContext<W> {
    per_unit_work: W,
    target: ScanTarget,
}

/// Task run by each worker.
fn scan_interval<W: Fn(u64) -> bool>(
    worker_id: usize,
    interval: Interval,
    context: &ScanContext<W>,
) -> std::result::Result<(), TaskError> {
    let mut _hits: u64 = 0;
    for i in interval.iter() {
        if (context.per_unit_work)(i) {
            _hits += 1;
            match &context.target {
                ScanTarget::Accumulator(accumulator) => accumulator.add(1),
                ScanTarget::Sink(sink) => sink.emit(worker_id, i)?,
            }
        }
    }
    #[cfg(feature = "log_parallelism")]
    log_info!(
        "[worker {worker_id}] Scanned {} items in {interval}, {_hits} matched",
        interval.len()
    );
    Ok(())
}
