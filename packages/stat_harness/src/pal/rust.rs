use std::num::NonZero;
use std::sync::LazyLock;
use std::time::Instant;

use new_zealand::nz;

use crate::pal::TickSource;

/// Process-wide origin for ticks, so that every reading is relative to the same instant.
static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// We use this where no native monotonic clock binding exists and under Miri,
/// which cannot talk to a real OS but where Rust std time still works.
#[derive(Debug)]
pub(crate) struct PlatformTickSource;

pub(crate) static PLATFORM_TICK_SOURCE: PlatformTickSource = PlatformTickSource;

impl TickSource for PlatformTickSource {
    fn now(&self) -> u64 {
        u64::try_from(EPOCH.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn frequency(&self) -> NonZero<u64> {
        nz!(1_000_000_000)
    }

    fn resolution(&self) -> u64 {
        1
    }
}
