use std::any::Any;
use std::hint::black_box;
use std::num::NonZero;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{self, AtomicBool};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::trace;

use crate::{Error, MeasurementSizes, MonotoneClock, Result, SyncBarrier};

/// Runs `measured` for every iteration of every sample on `threads` threads and returns the
/// duration of every measured sample, per thread.
///
/// With more than one thread, the workers are spawned first and only released once all of them
/// exist. Before every sample, all threads meet at a barrier. If `measured` panics, the first
/// panic is reported and all remaining samples on all threads are skipped, while the threads
/// still attend every barrier round.
pub(crate) fn invoke<F, R>(
    measured: &F,
    threads: NonZero<usize>,
    sizes: MeasurementSizes,
    clock: &MonotoneClock,
) -> Result<Vec<Vec<Duration>>>
where
    F: Fn(usize, usize, usize) -> R + Sync,
{
    let failure = FailureSlot::default();

    let durations = if threads.get() == 1 {
        vec![measure_thread(measured, 0, sizes, clock, None, &failure)]
    } else {
        let barrier = SyncBarrier::new(threads.get())?;
        run_workers(measured, threads, sizes, clock, &barrier, &failure)?
    };

    failure.into_result()?;

    Ok(durations)
}

#[cfg_attr(test, mutants::skip)] // If a start signal is lost, workers wait forever.
fn run_workers<F, R>(
    measured: &F,
    threads: NonZero<usize>,
    sizes: MeasurementSizes,
    clock: &MonotoneClock,
    barrier: &SyncBarrier,
    failure: &FailureSlot,
) -> Result<Vec<Vec<Duration>>>
where
    F: Fn(usize, usize, usize) -> R + Sync,
{
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(threads.get());
        let mut start_signals = Vec::with_capacity(threads.get());

        for thread_index in 0..threads.get() {
            let (start_tx, start_rx) = oneshot::channel::<()>();

            // If spawning fails below, the start signals are dropped on return and the workers
            // that already exist exit without touching the barrier.
            let handle = thread::Builder::new()
                .name(format!("stat_harness-{thread_index}"))
                .spawn_scoped(scope, move || {
                    start_rx.recv().ok()?;

                    trace!(thread_index, "measuring thread started");

                    Some(measure_thread(
                        measured,
                        thread_index,
                        sizes,
                        clock,
                        Some(barrier),
                        failure,
                    ))
                })
                .map_err(Error::ThreadSpawn)?;

            handles.push(handle);
            start_signals.push(start_tx);
        }

        trace!(threads = threads.get(), "all measuring threads spawned");

        for start_tx in start_signals {
            start_tx
                .send(())
                .expect("worker holds its receiver until it receives the start signal");
        }

        Ok(handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|payload| panic::resume_unwind(payload))
                    .unwrap_or_default()
            })
            .collect())
    })
}

fn measure_thread<F, R>(
    measured: &F,
    thread_index: usize,
    sizes: MeasurementSizes,
    clock: &MonotoneClock,
    barrier: Option<&SyncBarrier>,
    failure: &FailureSlot,
) -> Vec<Duration>
where
    F: Fn(usize, usize, usize) -> R,
{
    let mut durations = Vec::with_capacity(sizes.measured_samples().get());

    for sample_index in 0..sizes.samples().get() {
        if let Some(barrier) = barrier {
            barrier.wait();
        }

        if failure.is_set() {
            continue;
        }

        let start = clock.now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            for iteration_index in 0..sizes.iterations().get() {
                black_box(measured(
                    black_box(thread_index),
                    black_box(sample_index),
                    black_box(iteration_index),
                ));
            }
        }));

        let end = clock.now();

        match outcome {
            Ok(()) if sample_index >= sizes.warming_up_samples() => {
                durations.push(clock.elapsed(start, end));
            }
            Ok(()) => {}
            Err(payload) => {
                failure.record(thread_index, sample_index, panic_message(&*payload));
            }
        }
    }

    durations
}

/// Extracts a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic payload is not a string".to_string()
    }
}

#[derive(Debug, Default)]
struct FailureSlot {
    failed: AtomicBool,

    // First failure wins.
    first: Mutex<Option<Error>>,
}

impl FailureSlot {
    fn record(&self, thread_index: usize, sample_index: usize, message: String) {
        let mut first = self.first.lock().unwrap_or_else(PoisonError::into_inner);

        if first.is_none() {
            *first = Some(Error::MeasurementFailed {
                thread_index,
                sample_index,
                message,
            });
        }

        self.failed.store(true, atomic::Ordering::Release);
    }

    fn is_set(&self) -> bool {
        self.failed.load(atomic::Ordering::Acquire)
    }

    fn into_result(self) -> Result<()> {
        match self
            .first
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use new_zealand::nz;

    use super::*;

    #[test]
    fn single_thread_runs_every_iteration() {
        let calls = AtomicUsize::new(0);
        let sizes = MeasurementSizes::new(3, 5, 2).unwrap();

        let durations = invoke(
            &|thread_index: usize, _: usize, _: usize| {
                assert_eq!(thread_index, 0);
                calls.fetch_add(1, atomic::Ordering::Relaxed);
            },
            nz!(1),
            sizes,
            &MonotoneClock::new(),
        )
        .unwrap();

        assert_eq!(calls.load(atomic::Ordering::Relaxed), 15);

        // Warm-up samples are executed but not recorded.
        assert_eq!(durations.len(), 1);
        assert_eq!(durations[0].len(), 3);
    }

    #[test]
    #[cfg_attr(miri, ignore = "spawns real threads in a loop")]
    fn every_thread_runs_every_sample() {
        const THREADS: usize = 4;

        let seen = Mutex::new(Vec::new());
        let sizes = MeasurementSizes::new(2, 4, 1).unwrap();

        let durations = invoke(
            &|thread_index: usize, sample_index: usize, iteration_index: usize| {
                seen.lock()
                    .unwrap()
                    .push((thread_index, sample_index, iteration_index));
            },
            NonZero::new(THREADS).unwrap(),
            sizes,
            &MonotoneClock::new(),
        )
        .unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();

        let expected = (0..THREADS)
            .flat_map(|t| (0..4).flat_map(move |s| (0..2).map(move |i| (t, s, i))))
            .collect::<Vec<_>>();

        assert_eq!(seen, expected);
        assert_eq!(durations.len(), THREADS);
        assert!(durations.iter().all(|thread| thread.len() == 3));
    }

    #[test]
    #[cfg_attr(miri, ignore = "spawns real threads in a loop")]
    fn panic_skips_remaining_samples_without_deadlock() {
        let max_sample = AtomicUsize::new(0);
        let sizes = MeasurementSizes::new(2, 6, 0).unwrap();

        let result = invoke(
            &|thread_index: usize, sample_index: usize, _: usize| {
                max_sample.fetch_max(sample_index, atomic::Ordering::Relaxed);

                assert!(
                    !(thread_index == 1 && sample_index == 2),
                    "injected failure"
                );
            },
            nz!(3),
            sizes,
            &MonotoneClock::new(),
        );

        match result {
            Err(Error::MeasurementFailed {
                thread_index,
                sample_index,
                message,
            }) => {
                assert_eq!(thread_index, 1);
                assert_eq!(sample_index, 2);
                assert!(message.contains("injected failure"));
            }
            other => panic!("expected a measurement failure, got {other:?}"),
        }

        assert_eq!(max_sample.load(atomic::Ordering::Relaxed), 2);
    }

    #[test]
    fn single_thread_panic_is_reported() {
        let result = invoke(
            &|_: usize, sample_index: usize, _: usize| {
                assert_ne!(sample_index, 1, "second sample fails");
            },
            nz!(1),
            MeasurementSizes::new(1, 3, 0).unwrap(),
            &MonotoneClock::new(),
        );

        assert!(matches!(
            result,
            Err(Error::MeasurementFailed {
                thread_index: 0,
                sample_index: 1,
                ..
            })
        ));
    }

    #[test]
    fn panic_messages_are_extracted() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&42_u32), "panic payload is not a string");
    }
}
