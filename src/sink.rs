// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Destinations for the values found by workers when no accumulator is used.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Receiver of the qualifying values found by the workers.
///
/// Calls from different workers may interleave arbitrarily, but the calls from
/// a given worker follow the order in which that worker scans its interval.
pub trait ReportSink: Send + Sync {
    /// Reports that worker `worker_id` found `value`.
    ///
    /// An error fails the reporting worker.
    fn emit(&self, worker_id: usize, value: u64) -> std::io::Result<()>;
}

/// A sink that discards all values.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn emit(&self, _worker_id: usize, _value: u64) -> std::io::Result<()> {
        Ok(())
    }
}

/// A sink that records all the values it receives.
#[derive(Debug, Default)]
pub struct CollectingSink {
    values: Mutex<Vec<(usize, u64)>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `(worker_id, value)` pairs received so far, in reception
    /// order.
    pub fn values(&self) -> Vec<(usize, u64)> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the values reported by the given worker, in reception order.
    pub fn values_of(&self, worker_id: usize) -> Vec<u64> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(id, _)| *id == worker_id)
            .map(|(_, value)| *value)
            .collect()
    }
}

impl ReportSink for CollectingSink {
    fn emit(&self, worker_id: usize, value: u64) -> std::io::Result<()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((worker_id, value));
        Ok(())
    }
}

/// A sink that writes one `Thread-<n>: <value>` line per value, where `n` is
/// the 1-based worker index.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Creates a sink writing to the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> ReportSink for WriterSink<W> {
    fn emit(&self, worker_id: usize, value: u64) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "Thread-{}: {value}", worker_id + 1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_null_sink() {
        assert!(NullSink.emit(0, 7).is_ok());
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.emit(1, 5).unwrap();
        sink.emit(0, 2).unwrap();
        sink.emit(1, 7).unwrap();

        assert_eq!(sink.values(), [(1, 5), (0, 2), (1, 7)]);
        assert_eq!(sink.values_of(1), [5, 7]);
        assert_eq!(sink.values_of(0), [2]);
        assert!(sink.values_of(2).is_empty());
    }

    #[test]
    fn test_writer_sink_format() {
        let sink = WriterSink::new(Vec::new());
        sink.emit(0, 2).unwrap();
        sink.emit(3, 97).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output, "Thread-1: 2\nThread-4: 97\n");
    }
}
