use std::num::NonZero;
use std::time::Duration;

use crate::pal::{TickSource, TickSourceFacade};

/// An opaque reading of a [`MonotoneClock`].
///
/// Readings from the same clock never decrease. Comparing readings from different clocks
/// is meaningless.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ticks(u64);

impl Ticks {
    /// Raw tick count.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Elapsed ticks since an earlier reading, or zero if `earlier` is not actually earlier.
    #[must_use]
    pub fn saturating_ticks_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Wall-clock time since an earlier reading of the same clock.
    #[must_use]
    pub fn duration_since(self, earlier: Self, clock: &MonotoneClock) -> Duration {
        clock.elapsed(earlier, self)
    }
}

/// Monotonic tick source used for all timing in the harness.
///
/// The clock is not affected by wall clock adjustments (NTP, daylight saving, manual changes).
/// Elapsed wall-clock time between two readings is `(t2 - t1) / frequency()`.
///
/// # Examples
///
/// ```
/// use stat_harness::MonotoneClock;
///
/// let clock = MonotoneClock::new();
///
/// let start = clock.now();
/// std::hint::black_box((0..1000).sum::<u64>());
/// let end = clock.now();
///
/// println!("took {:?}", clock.elapsed(start, end));
/// ```
#[derive(Debug, Clone)]
pub struct MonotoneClock {
    source: TickSourceFacade,
}

impl MonotoneClock {
    /// Creates a clock backed by the platform's monotonic time source.
    #[must_use]
    pub fn new() -> Self {
        Self::from_source(TickSourceFacade::real())
    }

    pub(crate) fn from_source(source: TickSourceFacade) -> Self {
        Self { source }
    }

    /// Reads the current tick count.
    #[must_use]
    #[inline]
    pub fn now(&self) -> Ticks {
        Ticks(self.source.now())
    }

    /// Number of ticks per second.
    #[must_use]
    pub fn frequency(&self) -> NonZero<u64> {
        self.source.frequency()
    }

    /// The smallest duration the clock can distinguish.
    ///
    /// Measured durations below this value are indistinguishable from noise.
    #[must_use]
    pub fn resolution(&self) -> Duration {
        self.ticks_to_duration(self.source.resolution().max(1))
    }

    /// Wall-clock time elapsed between two readings, zero if `end` precedes `start`.
    #[must_use]
    pub fn elapsed(&self, start: Ticks, end: Ticks) -> Duration {
        self.ticks_to_duration(end.saturating_ticks_since(start))
    }

    /// Converts a tick count into wall-clock time using this clock's frequency.
    #[must_use]
    pub fn ticks_to_duration(&self, ticks: u64) -> Duration {
        const NANOS_PER_SEC: u128 = 1_000_000_000;

        let frequency = u128::from(self.frequency().get());

        #[expect(
            clippy::arithmetic_side_effects,
            reason = "u64 * 1e9 fits in u128 and the divisor is NonZero"
        )]
        #[expect(
            clippy::integer_division,
            reason = "sub-nanosecond precision is below what Duration can represent"
        )]
        let nanos = u128::from(ticks) * NANOS_PER_SEC / frequency;

        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl Default for MonotoneClock {
    fn default() -> Self {
        Self::new()
    }
}
