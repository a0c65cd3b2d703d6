use std::sync::{Condvar, Mutex, PoisonError};

use crate::{Error, Result};

/// Reusable rendezvous point for a fixed number of threads.
///
/// Every call to [`wait()`][Self::wait] blocks until `num_waiting_threads` calls have been made
/// since the barrier was last empty, at which point all waiting threads are released together.
/// The barrier immediately accepts the next round of waiters after a release.
///
/// Measuring threads meet here before every sample so that sample `k` starts at the same moment
/// on every thread.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use stat_harness::SyncBarrier;
///
/// let barrier = Arc::new(SyncBarrier::new(2).unwrap());
///
/// let peer = thread::spawn({
///     let barrier = Arc::clone(&barrier);
///     move || barrier.wait()
/// });
///
/// let released_by_me = barrier.wait();
/// let released_by_peer = peer.join().unwrap();
///
/// // Exactly one of the two threads performed the release.
/// assert!(released_by_me ^ released_by_peer);
/// ```
#[derive(Debug)]
pub struct SyncBarrier {
    num_waiting_threads: usize,

    state: Mutex<BarrierState>,
    released: Condvar,
}

#[derive(Debug)]
struct BarrierState {
    arrived: usize,

    // Incremented on every release. Waiters compare against the value they saw on arrival,
    // which keeps a fast thread entering the next round from being confused with this one.
    generation: u64,
}

impl SyncBarrier {
    /// Creates a barrier for `num_waiting_threads` participating threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBarrierSize`] if fewer than two threads are requested,
    /// as there is nothing to synchronize with a single thread.
    pub fn new(num_waiting_threads: usize) -> Result<Self> {
        if num_waiting_threads < 2 {
            return Err(Error::InvalidBarrierSize {
                requested: num_waiting_threads,
            });
        }

        Ok(Self {
            num_waiting_threads,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
            }),
            released: Condvar::new(),
        })
    }

    /// Number of threads that must arrive before the barrier releases them.
    #[must_use]
    pub fn num_waiting_threads(&self) -> usize {
        self.num_waiting_threads
    }

    /// Blocks until all participating threads have called this method.
    ///
    /// Returns `true` on the one thread whose arrival released the round. That thread does not
    /// block at all: it wakes the others and returns immediately.
    pub fn wait(&self) -> bool {
        // Nothing panics while holding the lock, so a poisoned lock still holds a valid state.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let generation = state.generation;

        #[expect(
            clippy::arithmetic_side_effects,
            reason = "arrived is reset before it can exceed num_waiting_threads"
        )]
        {
            state.arrived += 1;
        }

        if state.arrived == self.num_waiting_threads {
            state.arrived = 0;
            state.generation = generation.wrapping_add(1);
            drop(state);

            self.released.notify_all();
            return true;
        }

        drop(
            self.released
                .wait_while(state, |state| state.generation == generation)
                .unwrap_or_else(PoisonError::into_inner),
        );

        false
    }
}
