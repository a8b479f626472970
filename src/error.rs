// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types.

use crate::partition::Interval;
use thiserror::Error;

/// Result type for fallible operations of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by a worker task.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by partitioning, timing, worker pools and the harness.
#[derive(Debug, Error)]
pub enum Error {
    /// A range can't be split across zero workers.
    #[error("the number of partitions must be at least 1")]
    InvalidPartitionCount,
    /// A started clock was stopped twice.
    #[error("the clock was already stopped")]
    AlreadyStopped,
    /// A worker pool was joined twice.
    #[error("the worker pool was already joined")]
    AlreadyJoined,
    /// A worker task returned an error or panicked.
    #[error(transparent)]
    WorkerFailure(#[from] WorkerFailure),
    /// The operating system refused to spawn a worker thread.
    #[error("failed to spawn worker #{worker_id}: {source}")]
    Spawn {
        /// Index of the worker that couldn't be spawned.
        worker_id: usize,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Description of a worker that didn't complete its interval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("worker #{worker_id} failed on interval {interval}: {message}")]
pub struct WorkerFailure {
    /// Index of the failed worker.
    pub worker_id: usize,
    /// Interval that the worker was scanning.
    pub interval: Interval,
    /// Error message, or panic payload if the worker panicked.
    pub message: String,
}

impl WorkerFailure {
    /// Builds a failure from the payload of a panicked worker thread.
    pub(crate) fn from_panic(
        worker_id: usize,
        interval: Interval,
        payload: Box<dyn std::any::Any + Send>,
    ) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("worker panicked: {s}")
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("worker panicked: {s}")
        } else {
            "worker panicked".to_owned()
        };
        Self {
            worker_id,
            interval,
            message,
        }
    }
}
