// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CLI tool to find primes with a pool of worker threads.

use clap::{Parser, ValueEnum};
use parascan::{
    is_prime, AccumulatorMode, BenchmarkConfig, CpuPinningPolicy, Harness, WriterSink,
};
use std::num::NonZeroU32;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = BenchmarkConfig {
        total: cli.total,
        mode: match cli.mode {
            ModeCli::Print => None,
            ModeCli::Unsynchronized => Some(AccumulatorMode::Unsynchronized),
            ModeCli::MutexGuarded => Some(AccumulatorMode::MutexGuarded),
        },
        cpu_pinning: match cli.cpu_pinning {
            CpuPinningCli::No => CpuPinningPolicy::No,
            CpuPinningCli::IfSupported => CpuPinningPolicy::IfSupported,
            CpuPinningCli::Always => CpuPinningPolicy::Always,
        },
        ..Default::default()
    };
    let config = match cli.num_workers {
        Some(num_workers) => BenchmarkConfig {
            num_workers: num_workers.get(),
            ..config
        },
        None => config.with_available_parallelism(),
    };

    let harness = match Harness::new(config) {
        Ok(harness) => harness.with_sink(Arc::new(WriterSink::new(std::io::stdout()))),
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    for (i, interval) in harness.partition().iter().enumerate() {
        eprintln!(
            "Created Thread-{} with start={}, stop={}",
            i + 1,
            interval.start(),
            interval.stop()
        );
    }

    match harness.run(is_prime) {
        Ok(report) => {
            if let Some(count) = report.final_value {
                println!("primes = {count}");
            }
            eprintln!(
                "{} Threads took {:.6} seconds to complete",
                config.num_workers,
                report.elapsed_seconds()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Run failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// CLI tool to find primes with a pool of worker threads.
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(version)]
struct Cli {
    /// Number of worker threads. Default to the available parallelism.
    #[arg(long)]
    num_workers: Option<NonZeroU32>,

    /// Size of the scanned range.
    #[arg(long, default_value_t = BenchmarkConfig::DEFAULT_TOTAL)]
    total: u64,

    /// What to do with each prime that is found.
    #[arg(long, value_enum, default_value_t = ModeCli::MutexGuarded)]
    mode: ModeCli,

    /// Policy to pin worker threads to CPUs.
    #[arg(long, value_enum, default_value_t = CpuPinningCli::No)]
    cpu_pinning: CpuPinningCli,
}

/// What to do with each prime that is found.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeCli {
    /// Print each prime on stdout, prefixed with the worker thread name.
    Print,
    /// Count primes in a shared counter without synchronization (loses
    /// updates).
    Unsynchronized,
    /// Count primes in a shared counter protected by a mutex.
    MutexGuarded,
}

/// Policy to pin worker threads to CPUs.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum CpuPinningCli {
    /// Don't pin worker threads.
    No,
    /// Pin worker threads if supported on this platform.
    IfSupported,
    /// Pin worker threads, failing if that isn't possible.
    Always,
}
