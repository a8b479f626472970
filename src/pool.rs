// Copyright 2024-2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A fixed pool of worker threads, each bound to one interval.

use crate::error::{Error, Result, TaskError, WorkerFailure};
use crate::macros::{log_debug, log_error, log_warn};
use crate::partition::Interval;
// Platforms that support `libc::sched_setaffinity()`.
#[cfg(all(
    not(miri),
    any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    )
))]
use nix::{
    sched::{sched_setaffinity, CpuSet},
    unistd::Pid,
};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Policy to pin worker threads to CPUs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CpuPinningPolicy {
    /// Don't pin worker threads to CPUs.
    #[default]
    No,
    /// Pin each worker thread to a CPU, if CPU pinning is supported and
    /// implemented on this platform.
    IfSupported,
    /// Pin each worker thread to a CPU. A worker that can't be pinned fails
    /// without running its task.
    Always,
}

/// A builder for [`WorkerPool`].
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerPoolBuilder {
    /// Policy to pin worker threads to CPUs.
    pub cpu_pinning: CpuPinningPolicy,
}

impl WorkerPoolBuilder {
    /// Spawns one worker thread per interval of the `partition`.
    ///
    /// Worker `i` runs `task(i, partition[i], &context)`. The `context` is
    /// shared by all the workers, so any state that workers mutate in it must
    /// provide its own synchronization.
    ///
    /// ```
    /// # use parascan::{partition, WorkerPoolBuilder};
    /// # use std::sync::atomic::{AtomicU64, Ordering};
    /// # use std::sync::Arc;
    /// let intervals = partition(100, 4).unwrap();
    /// let sum = Arc::new(AtomicU64::new(0));
    ///
    /// let mut pool = WorkerPoolBuilder::default()
    ///     .spawn(&intervals, sum.clone(), |_id, interval, sum| {
    ///         sum.fetch_add(interval.iter().sum(), Ordering::Relaxed);
    ///         Ok(())
    ///     })
    ///     .unwrap();
    /// pool.join_all().unwrap();
    ///
    /// assert_eq!(sum.load(Ordering::Relaxed), 99 * 100 / 2);
    /// ```
    ///
    /// If a thread fails to spawn, the workers spawned so far are joined before
    /// returning [`Error::Spawn`].
    pub fn spawn<C, F>(
        &self,
        partition: &[Interval],
        context: Arc<C>,
        task: F,
    ) -> Result<WorkerPool>
    where
        C: Send + Sync + 'static,
        F: Fn(usize, Interval, &C) -> std::result::Result<(), TaskError> + Send + Sync + 'static,
    {
        let task = Arc::new(task);
        let mut workers = Vec::with_capacity(partition.len());

        for (id, &interval) in partition.iter().enumerate() {
            let context = context.clone();
            let task = task.clone();
            let cpu_pinning = self.cpu_pinning;

            let spawned = std::thread::Builder::new()
                .name(format!("worker-{}", id + 1))
                .spawn(move || -> std::result::Result<(), WorkerFailure> {
                    pin_current_thread(id, cpu_pinning).map_err(|message| WorkerFailure {
                        worker_id: id,
                        interval,
                        message,
                    })?;
                    (*task)(id, interval, &*context).map_err(|e| WorkerFailure {
                        worker_id: id,
                        interval,
                        message: e.to_string(),
                    })
                });

            match spawned {
                Ok(handle) => {
                    log_debug!("[main thread] Created worker #{id} with interval {interval}");
                    workers.push(WorkerHandle {
                        id,
                        interval,
                        handle,
                    });
                }
                Err(source) => {
                    log_error!("[main thread] Failed to spawn worker #{id}: {source}");
                    let mut pool = WorkerPool {
                        workers: Some(workers),
                    };
                    if let Err(e) = pool.join_all() {
                        log_error!("[main thread] A previously spawned worker failed: {e}");
                    }
                    return Err(Error::Spawn {
                        worker_id: id,
                        source,
                    });
                }
            }
        }
        log_debug!("[main thread] Spawned {} workers", workers.len());

        Ok(WorkerPool {
            workers: Some(workers),
        })
    }
}

/// Handle to one spawned worker thread.
///
/// Joining consumes the handle, so a worker can't be joined twice.
#[derive(Debug)]
pub struct WorkerHandle {
    /// Worker index.
    id: usize,
    /// Interval assigned to this worker.
    interval: Interval,
    /// Thread handle object.
    handle: JoinHandle<std::result::Result<(), WorkerFailure>>,
}

impl WorkerHandle {
    /// Returns the index of this worker.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the interval assigned to this worker.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Waits for the worker to complete. A panic in the worker is reported as
    /// a [`WorkerFailure`].
    pub fn join(self) -> std::result::Result<(), WorkerFailure> {
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => Err(WorkerFailure::from_panic(self.id, self.interval, payload)),
        }
    }
}

/// A set of running workers, created by [`WorkerPoolBuilder::spawn()`].
///
/// Dropping a pool that wasn't joined joins all of its workers, logging any
/// failure.
#[derive(Debug)]
pub struct WorkerPool {
    /// Handles to the workers, or [`None`] once joined.
    workers: Option<Vec<WorkerHandle>>,
}

impl WorkerPool {
    /// Returns the number of workers spawned in this pool, or zero once joined.
    pub fn num_workers(&self) -> usize {
        self.workers.as_ref().map_or(0, Vec::len)
    }

    /// Returns true if [`join_all()`](Self::join_all) was already called.
    pub fn is_joined(&self) -> bool {
        self.workers.is_none()
    }

    /// Waits for all the workers to complete.
    ///
    /// Every worker is joined, even if some of them failed. The failure of the
    /// lowest-indexed failed worker is then returned as
    /// [`Error::WorkerFailure`]. Any effect of the workers is visible to the
    /// caller once this returns.
    ///
    /// Fails with [`Error::AlreadyJoined`] if called a second time.
    pub fn join_all(&mut self) -> Result<()> {
        let workers = self.workers.take().ok_or(Error::AlreadyJoined)?;

        log_debug!("[main thread] Joining {} workers...", workers.len());
        let mut first_failure = None;
        for worker in workers {
            let id = worker.id;
            match worker.join() {
                Ok(()) => log_debug!("[main thread] Worker #{id} completed"),
                Err(failure) => {
                    log_error!("[main thread] Worker #{id} failed: {failure}");
                    if first_failure.is_none() {
                        first_failure = Some(failure);
                    }
                }
            }
        }
        log_debug!("[main thread] Joined workers.");

        match first_failure {
            None => Ok(()),
            Some(failure) => Err(failure.into()),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.workers.is_some() {
            log_warn!("[main thread] Dropping a worker pool that wasn't joined");
            if let Err(e) = self.join_all() {
                log_error!("[main thread] Worker failure while dropping the pool: {e}");
            }
        }
    }
}

/// Pins the current thread to the CPU matching the worker index, according to
/// the policy.
#[cfg(all(
    not(miri),
    any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    )
))]
fn pin_current_thread(
    id: usize,
    cpu_pinning: CpuPinningPolicy,
) -> std::result::Result<(), String> {
    let pin = || -> nix::Result<()> {
        let mut cpu_set = CpuSet::new();
        cpu_set.set(id)?;
        sched_setaffinity(Pid::from_raw(0), &cpu_set)
    };

    match cpu_pinning {
        CpuPinningPolicy::No => Ok(()),
        CpuPinningPolicy::IfSupported => {
            match pin() {
                Ok(()) => log_debug!("Pinned worker #{id} to CPU #{id}"),
                Err(e) => log_warn!("Failed to set CPU affinity for worker #{id}: {e}"),
            }
            Ok(())
        }
        CpuPinningPolicy::Always => match pin() {
            Ok(()) => {
                log_debug!("Pinned worker #{id} to CPU #{id}");
                Ok(())
            }
            Err(e) => Err(format!("Failed to set CPU affinity for worker #{id}: {e}")),
        },
    }
}

/// Pins the current thread to the CPU matching the worker index, according to
/// the policy.
#[cfg(any(
    miri,
    not(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "linux"
    ))
))]
fn pin_current_thread(
    _id: usize,
    cpu_pinning: CpuPinningPolicy,
) -> std::result::Result<(), String> {
    match cpu_pinning {
        CpuPinningPolicy::No => Ok(()),
        CpuPinningPolicy::IfSupported => {
            log_warn!("Pinning threads to CPUs is not implemented on this platform.");
            Ok(())
        }
        CpuPinningPolicy::Always => {
            Err("Pinning threads to CPUs is not implemented on this platform.".to_owned())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::partition::partition;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_one_worker_per_interval() {
        let intervals = partition(100, 7).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut pool = WorkerPoolBuilder::default()
            .spawn(&intervals, seen.clone(), |id, interval, seen| {
                seen.lock().unwrap().push((id, interval));
                Ok(())
            })
            .unwrap();
        assert_eq!(pool.num_workers(), 7);
        pool.join_all().unwrap();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        let expected = intervals.iter().copied().enumerate().collect::<Vec<_>>();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_workers_run_on_named_threads() {
        let intervals = partition(10, 2).unwrap();
        let names = Arc::new(Mutex::new(Vec::new()));

        let mut pool = WorkerPoolBuilder::default()
            .spawn(&intervals, names.clone(), |_, _, names| {
                let name = std::thread::current().name().map(str::to_owned);
                names.lock().unwrap().push(name);
                Ok(())
            })
            .unwrap();
        pool.join_all().unwrap();

        let mut names = names.lock().unwrap().clone();
        names.sort();
        assert_eq!(
            names,
            [Some("worker-1".to_owned()), Some("worker-2".to_owned())]
        );
    }

    #[test]
    fn test_join_twice() {
        let intervals = partition(100, 4).unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        let mut pool = WorkerPoolBuilder::default()
            .spawn(&intervals, runs.clone(), |_, _, runs| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        assert!(!pool.is_joined());
        pool.join_all().unwrap();
        assert!(pool.is_joined());
        assert_eq!(pool.num_workers(), 0);

        assert!(matches!(pool.join_all(), Err(Error::AlreadyJoined)));
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_failure_joins_all_other_workers() {
        let intervals = partition(80, 8).unwrap();
        let completed = Arc::new(AtomicUsize::new(0));

        let mut pool = WorkerPoolBuilder::default()
            .spawn(&intervals, completed.clone(), |id, _, completed| {
                if id == 3 {
                    return Err("invariant violated".into());
                }
                std::thread::sleep(Duration::from_millis(50));
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        match pool.join_all() {
            Err(Error::WorkerFailure(failure)) => {
                assert_eq!(failure.worker_id, 3);
                assert_eq!(failure.interval, Interval::new(30, 40));
                assert_eq!(failure.message, "invariant violated");
            }
            result => panic!("unexpected result: {result:?}"),
        }
        assert_eq!(completed.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_panic_is_reported_as_failure() {
        let intervals = partition(40, 4).unwrap();
        let completed = Arc::new(AtomicUsize::new(0));

        let mut pool = WorkerPoolBuilder::default()
            .spawn(&intervals, completed.clone(), |id, _, completed| {
                if id == 0 {
                    panic!("arithmetic panic");
                }
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        match pool.join_all() {
            Err(Error::WorkerFailure(failure)) => {
                assert_eq!(failure.worker_id, 0);
                assert_eq!(failure.interval, Interval::new(0, 10));
                assert_eq!(failure.message, "worker panicked: arithmetic panic");
            }
            result => panic!("unexpected result: {result:?}"),
        }
        assert_eq!(completed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_lowest_failed_worker_is_reported() {
        let intervals = partition(60, 6).unwrap();

        let mut pool = WorkerPoolBuilder::default()
            .spawn(&intervals, Arc::new(()), |id, _, _| {
                if id == 2 {
                    // Make sure that worker #2 fails last.
                    std::thread::sleep(Duration::from_millis(50));
                }
                if id == 2 || id == 5 {
                    Err(format!("worker {id} failed").into())
                } else {
                    Ok(())
                }
            })
            .unwrap();

        match pool.join_all() {
            Err(Error::WorkerFailure(failure)) => assert_eq!(failure.worker_id, 2),
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[test]
    fn test_drop_joins_workers() {
        let intervals = partition(100, 4).unwrap();
        let completed = Arc::new(AtomicUsize::new(0));

        let pool = WorkerPoolBuilder::default()
            .spawn(&intervals, completed.clone(), |_, _, completed| {
                std::thread::sleep(Duration::from_millis(20));
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        drop(pool);

        assert_eq!(completed.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_handle_join() {
        let intervals = partition(10, 1).unwrap();
        let mut pool = WorkerPoolBuilder::default()
            .spawn(&intervals, Arc::new(()), |_, _, _| Err("nope".into()))
            .unwrap();

        let handle = pool.workers.as_mut().unwrap().pop().unwrap();
        assert_eq!(handle.id(), 0);
        assert_eq!(handle.interval(), Interval::new(0, 10));
        let failure = handle.join().unwrap_err();
        assert_eq!(failure.message, "nope");

        pool.join_all().unwrap();
    }

    #[test]
    fn test_cpu_pinning_if_supported() {
        let intervals = partition(100, 2).unwrap();
        let completed = Arc::new(AtomicUsize::new(0));

        let mut pool = WorkerPoolBuilder {
            cpu_pinning: CpuPinningPolicy::IfSupported,
        }
        .spawn(&intervals, completed.clone(), |_, _, completed| {
            completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        pool.join_all().unwrap();

        assert_eq!(completed.load(Ordering::SeqCst), 2);
    }

    #[cfg(any(
        miri,
        not(any(
            target_os = "android",
            target_os = "dragonfly",
            target_os = "freebsd",
            target_os = "linux"
        ))
    ))]
    #[test]
    fn test_cpu_pinning_always_not_supported() {
        let intervals = partition(100, 2).unwrap();
        let mut pool = WorkerPoolBuilder {
            cpu_pinning: CpuPinningPolicy::Always,
        }
        .spawn(&intervals, Arc::new(()), |_, _, _| Ok(()))
        .unwrap();

        match pool.join_all() {
            Err(Error::WorkerFailure(failure)) => assert_eq!(
                failure.message,
                "Pinning threads to CPUs is not implemented on this platform."
            ),
            result => panic!("unexpected result: {result:?}"),
        }
    }
}
