use std::num::NonZero;

use new_zealand::nz;

use crate::pal::TickSource;

const NANOS_PER_SEC: NonZero<u64> = nz!(1_000_000_000);

/// Reads `CLOCK_MONOTONIC`, which is not affected by discontinuous wall clock adjustments.
#[derive(Debug)]
pub(crate) struct PlatformTickSource;

pub(crate) static PLATFORM_TICK_SOURCE: PlatformTickSource = PlatformTickSource;

impl TickSource for PlatformTickSource {
    fn now(&self) -> u64 {
        let mut timestamp = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // SAFETY: We pass a valid pointer to a timespec that outlives the call.
        let result = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &raw mut timestamp) };

        assert_eq!(result, 0, "CLOCK_MONOTONIC is supported on every Unix we run on");

        timespec_to_nanos(&timestamp)
    }

    fn frequency(&self) -> NonZero<u64> {
        NANOS_PER_SEC
    }

    fn resolution(&self) -> u64 {
        let mut resolution = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // SAFETY: We pass a valid pointer to a timespec that outlives the call.
        let result = unsafe { libc::clock_getres(libc::CLOCK_MONOTONIC, &raw mut resolution) };

        if result != 0 {
            // Unknown resolution, assume the finest one the tick unit can express.
            return 1;
        }

        timespec_to_nanos(&resolution).max(1)
    }
}

fn timespec_to_nanos(timestamp: &libc::timespec) -> u64 {
    let seconds = u64::try_from(timestamp.tv_sec)
        .expect("monotonic clock never reports a negative number of seconds");
    let nanos = u64::try_from(timestamp.tv_nsec)
        .expect("monotonic clock never reports a negative number of nanoseconds");

    seconds
        .saturating_mul(NANOS_PER_SEC.get())
        .saturating_add(nanos)
}
