// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A scalar counter shared by all the workers of a run.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Discipline used to update a [`SharedAccumulator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccumulatorMode {
    /// Updates are a plain load followed by a plain store, without mutual
    /// exclusion. Concurrent updates lose increments.
    Unsynchronized,
    /// Updates happen under a mutex. The final value is always exact.
    MutexGuarded,
}

/// A signed counter shared between worker threads.
///
/// Both variants expose the same interface. The [`Unsynchronized`] variant
/// exists to reproduce lost updates and compare against the correct
/// [`MutexGuarded`] variant: it never exhibits undefined behavior (each load
/// and store is atomic on its own) but the read-modify-write as a whole is not.
///
/// [`Unsynchronized`]: SharedAccumulator::Unsynchronized
/// [`MutexGuarded`]: SharedAccumulator::MutexGuarded
#[derive(Debug)]
pub enum SharedAccumulator {
    /// See [`AccumulatorMode::Unsynchronized`].
    Unsynchronized(CachePadded<AtomicI64>),
    /// See [`AccumulatorMode::MutexGuarded`].
    MutexGuarded(CachePadded<Mutex<i64>>),
}

impl SharedAccumulator {
    /// Creates an accumulator initialized to zero.
    pub fn new(mode: AccumulatorMode) -> Self {
        match mode {
            AccumulatorMode::Unsynchronized => {
                SharedAccumulator::Unsynchronized(CachePadded::new(AtomicI64::new(0)))
            }
            AccumulatorMode::MutexGuarded => {
                SharedAccumulator::MutexGuarded(CachePadded::new(Mutex::new(0)))
            }
        }
    }

    /// Returns the discipline of this accumulator.
    pub fn mode(&self) -> AccumulatorMode {
        match self {
            SharedAccumulator::Unsynchronized(_) => AccumulatorMode::Unsynchronized,
            SharedAccumulator::MutexGuarded(_) => AccumulatorMode::MutexGuarded,
        }
    }

    /// Adds `delta` to the value, wrapping around on overflow.
    ///
    /// In [`MutexGuarded`](AccumulatorMode::MutexGuarded) mode this blocks until
    /// the lock is available. The lock is released when this returns, including
    /// by unwinding.
    #[inline]
    pub fn add(&self, delta: i64) {
        match self {
            SharedAccumulator::Unsynchronized(value) => {
                let current = value.load(Ordering::Relaxed);
                value.store(current.wrapping_add(delta), Ordering::Relaxed);
            }
            SharedAccumulator::MutexGuarded(value) => {
                // Nothing can panic while the lock is held, but a poisoned lock
                // still holds a consistent integer.
                let mut guard = value.lock().unwrap_or_else(PoisonError::into_inner);
                *guard = guard.wrapping_add(delta);
            }
        }
    }

    /// Returns a snapshot of the value.
    pub fn read(&self) -> i64 {
        match self {
            SharedAccumulator::Unsynchronized(value) => value.load(Ordering::Relaxed),
            SharedAccumulator::MutexGuarded(value) => {
                *value.lock().unwrap_or_else(PoisonError::into_inner)
            }
        }
    }
}
