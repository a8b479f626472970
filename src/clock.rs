// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Monotonic stopwatch.

use crate::error::{Error, Result};
use std::time::{Duration, Instant};

/// Entry point to measure elapsed time.
///
/// The measurements rely on [`Instant`], which is monotonic and unaffected by
/// changes of the system's wall clock.
pub struct Clock;

impl Clock {
    /// Captures the current instant and returns a running stopwatch.
    pub fn start() -> StartedClock {
        StartedClock {
            start: Instant::now(),
            stopped: false,
        }
    }
}

/// A running stopwatch, created by [`Clock::start()`].
#[derive(Debug)]
pub struct StartedClock {
    /// Instant at which the clock was started.
    start: Instant,
    /// Whether [`stop()`](Self::stop) was already called.
    stopped: bool,
}

impl StartedClock {
    /// Returns the time elapsed since the clock was started, without stopping
    /// it.
    pub fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.start)
    }

    /// Stops the clock and returns the elapsed time.
    ///
    /// Fails with [`Error::AlreadyStopped`] if this clock was already stopped.
    pub fn stop(&mut self) -> Result<TimingResult> {
        let stop = Instant::now();
        if self.stopped {
            return Err(Error::AlreadyStopped);
        }
        self.stopped = true;

        // Saturates to zero if the platform clock quantization makes `stop`
        // appear earlier than `start`.
        let elapsed = stop.saturating_duration_since(self.start);
        Ok(TimingResult {
            elapsed_seconds: elapsed.as_secs_f64(),
        })
    }
}

/// Outcome of a timed run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingResult {
    /// Elapsed time in seconds. Never negative.
    pub elapsed_seconds: f64,
}

impl TimingResult {
    /// Returns the elapsed time as a [`Duration`].
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_seconds)
    }
}
