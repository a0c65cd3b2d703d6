use std::fmt::Debug;
use std::num::NonZero;

/// A source of monotonically non-decreasing ticks.
///
/// Ticks are only meaningful relative to other ticks from the same source.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait TickSource: Debug + Send + Sync {
    fn now(&self) -> u64;

    /// Ticks per second.
    fn frequency(&self) -> NonZero<u64>;

    /// Smallest tick delta the source can distinguish.
    fn resolution(&self) -> u64;
}
