use std::sync::atomic::{self, AtomicU64};
use std::time::Duration;

use crate::stats::as_f64;
use crate::{Result, Statistics};

// Lower bound of the time a rate is divided by, for clocks that report a zero resolution.
const MIN_SECONDS: f64 = 1e-9;

/// How the values of a custom statistic are aggregated into a single figure.
#[derive(Clone, Copy, Debug, derive_more::Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum AggregationType {
    /// Values are averaged over samples.
    #[display("mean")]
    Mean,

    /// Values are counts of events that are divided by the measured time to give a rate.
    #[display("rate per second")]
    RatePerSecond,
}

/// A user-defined statistic recorded alongside the timing of a benchmark.
///
/// There is one slot per (thread, sample) pair, warm-up samples included. Measured code
/// writes the slot of the thread and sample it is currently running, so writes never contend.
/// Writing the same slot again replaces the previous value.
///
/// # Examples
///
/// ```
/// use stat_harness::{AggregationType, CustomStatOutput};
///
/// let output = CustomStatOutput::new("cache misses", AggregationType::Mean, 2, 10);
///
/// output.add(1, 3, 42.0);
/// assert_eq!(output.value(1, 3), 42.0);
/// assert_eq!(output.value(0, 3), 0.0);
/// ```
#[derive(derive_more::Debug)]
pub struct CustomStatOutput {
    name: String,
    aggregation: AggregationType,

    threads: usize,
    samples: usize,

    // f64 bit patterns, thread-major.
    #[debug(ignore)]
    slots: Box<[AtomicU64]>,
}

impl CustomStatOutput {
    /// Creates an output with `threads * samples` slots, all zero.
    ///
    /// `samples` is the total number of samples, warm-up samples included.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        aggregation: AggregationType,
        threads: usize,
        samples: usize,
    ) -> Self {
        let slot_count = threads.saturating_mul(samples);

        Self {
            name: name.into(),
            aggregation,
            threads,
            samples,
            slots: (0..slot_count)
                .map(|_| AtomicU64::new(0.0_f64.to_bits()))
                .collect(),
        }
    }

    /// Name of the statistic.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the values are aggregated.
    #[must_use]
    pub fn aggregation(&self) -> AggregationType {
        self.aggregation
    }

    /// Records `value` for the given thread and sample, replacing any earlier value.
    ///
    /// # Panics
    ///
    /// Panics if `thread_index` or `sample_index` is out of range. That is a bug in the
    /// benchmark code, which receives valid indexes from the harness.
    pub fn add(&self, thread_index: usize, sample_index: usize, value: f64) {
        self.slot(thread_index, sample_index)
            .store(value.to_bits(), atomic::Ordering::Relaxed);
    }

    /// The value recorded for the given thread and sample, zero if nothing was recorded.
    ///
    /// # Panics
    ///
    /// Panics if `thread_index` or `sample_index` is out of range.
    #[must_use]
    pub fn value(&self, thread_index: usize, sample_index: usize) -> f64 {
        f64::from_bits(
            self.slot(thread_index, sample_index)
                .load(atomic::Ordering::Relaxed),
        )
    }

    fn slot(&self, thread_index: usize, sample_index: usize) -> &AtomicU64 {
        assert!(
            thread_index < self.threads,
            "thread index {thread_index} out of range for custom stat '{}' with {} threads",
            self.name,
            self.threads
        );
        assert!(
            sample_index < self.samples,
            "sample index {sample_index} out of range for custom stat '{}' with {} samples",
            self.name,
            self.samples
        );

        #[expect(
            clippy::arithmetic_side_effects,
            reason = "both indexes were checked against dimensions whose product fits in usize"
        )]
        let index = thread_index * self.samples + sample_index;

        #[expect(
            clippy::indexing_slicing,
            reason = "index was checked against both dimensions above"
        )]
        &self.slots[index]
    }

    /// Aggregates the measured samples of this statistic.
    ///
    /// `durations` holds, per thread, the duration of every measured sample. The values of the
    /// first `warming_up_samples` samples of every thread are ignored.
    ///
    /// Rates divide by at least `resolution` per sample, so a sample that was too short for the
    /// clock to measure yields a finite rate. Such samples are counted in
    /// [`CustomStatSummary::below_resolution_samples()`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSamples`][crate::Error::NoSamples] if there are no measured samples.
    pub fn summarize(
        &self,
        durations: &[Vec<Duration>],
        warming_up_samples: usize,
        resolution: Duration,
    ) -> Result<CustomStatSummary> {
        let min_seconds = resolution.as_secs_f64().max(MIN_SECONDS);

        let mut total = 0.0;
        let mut total_seconds = 0.0;
        let mut below_resolution_samples: usize = 0;
        let mut per_sample = Vec::new();

        for (thread_index, thread_durations) in durations.iter().enumerate().take(self.threads) {
            for (measured_index, duration) in thread_durations.iter().enumerate() {
                let sample_index = warming_up_samples.saturating_add(measured_index);
                if sample_index >= self.samples {
                    break;
                }

                let value = self.value(thread_index, sample_index);

                if *duration < resolution {
                    below_resolution_samples = below_resolution_samples.saturating_add(1);
                }

                let seconds = duration.as_secs_f64().max(min_seconds);

                total += value;
                total_seconds += seconds;

                per_sample.push(match self.aggregation {
                    AggregationType::Mean => value,
                    AggregationType::RatePerSecond => value / seconds,
                });
            }
        }

        let slot_count = per_sample.len();
        let per_sample = Statistics::new(per_sample)?;

        let aggregate = match self.aggregation {
            AggregationType::Mean => total / as_f64(slot_count),
            AggregationType::RatePerSecond => total / total_seconds,
        };

        Ok(CustomStatSummary {
            name: self.name.clone(),
            aggregation: self.aggregation,
            aggregate,
            per_sample,
            below_resolution_samples,
        })
    }
}

/// Aggregated result of one [`CustomStatOutput`].
#[derive(Clone, Debug, PartialEq)]
pub struct CustomStatSummary {
    name: String,
    aggregation: AggregationType,
    aggregate: f64,
    per_sample: Statistics,
    below_resolution_samples: usize,
}

impl CustomStatSummary {
    /// Name of the statistic.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the values were aggregated.
    #[must_use]
    pub fn aggregation(&self) -> AggregationType {
        self.aggregation
    }

    /// The single aggregated figure.
    ///
    /// For [`AggregationType::Mean`] this is the sum of all measured values divided by the
    /// number of measured (thread, sample) slots. For [`AggregationType::RatePerSecond`] it is
    /// the sum of all measured values divided by the total measured time in seconds.
    #[must_use]
    pub fn aggregate(&self) -> f64 {
        self.aggregate
    }

    /// Statistics over the per-sample values: the recorded values for [`AggregationType::Mean`],
    /// divided by the sample duration for [`AggregationType::RatePerSecond`].
    ///
    /// For [`AggregationType::Mean`] the mean of these equals [`aggregate()`][Self::aggregate].
    #[must_use]
    pub fn per_sample(&self) -> &Statistics {
        &self.per_sample
    }

    /// Number of measured samples shorter than the clock resolution.
    #[must_use]
    pub fn below_resolution_samples(&self) -> usize {
        self.below_resolution_samples
    }
}

/// A named value recorded once per invocation, reported without statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomOutput {
    name: String,
    value: f64,
}

impl CustomOutput {
    pub(crate) fn new(name: String, value: f64) -> Self {
        Self { name, value }
    }

    /// Name of the output.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The recorded value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::float_cmp, reason = "exact values are expected in these tests")]

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::Error;

    assert_impl_all!(CustomStatOutput: Send, Sync);

    const RESOLUTION: Duration = Duration::from_nanos(100);

    #[test]
    fn last_write_wins() {
        let output = CustomStatOutput::new("x", AggregationType::Mean, 1, 2);

        output.add(0, 1, 1.0);
        output.add(0, 1, 3.0);

        assert_eq!(output.value(0, 1), 3.0);
        assert_eq!(output.value(0, 0), 0.0);
    }

    #[test]
    #[should_panic]
    fn thread_index_out_of_range_panics() {
        let output = CustomStatOutput::new("x", AggregationType::Mean, 2, 2);
        output.add(2, 0, 1.0);
    }

    #[test]
    #[should_panic]
    fn sample_index_out_of_range_panics() {
        let output = CustomStatOutput::new("x", AggregationType::Mean, 2, 2);
        output.add(0, 2, 1.0);
    }

    #[test]
    fn mean_skips_warm_up_samples() {
        let output = CustomStatOutput::new("x", AggregationType::Mean, 2, 3);

        // Warm-up values must not influence the result.
        output.add(0, 0, 1000.0);
        output.add(1, 0, 1000.0);

        output.add(0, 1, 8.0);
        output.add(0, 2, 12.0);
        output.add(1, 1, 24.0);
        output.add(1, 2, 28.0);

        let durations = vec![
            vec![Duration::from_secs(1), Duration::from_secs(1)],
            vec![Duration::from_secs(1), Duration::from_secs(1)],
        ];

        let summary = output.summarize(&durations, 1, RESOLUTION).unwrap();

        assert_eq!(summary.name(), "x");
        assert_eq!(summary.aggregation(), AggregationType::Mean);
        assert_eq!(summary.aggregate(), 18.0);
        assert_eq!(summary.per_sample().sorted_samples(), &[8.0, 12.0, 24.0, 28.0]);
        assert_eq!(summary.per_sample().mean(), summary.aggregate());
        assert_eq!(summary.below_resolution_samples(), 0);
    }

    #[test]
    fn mean_aggregate_matches_per_sample_mean() {
        let output = CustomStatOutput::new("x", AggregationType::Mean, 1, 2);

        output.add(0, 0, 50.0);
        output.add(0, 1, 50.0);

        let durations = vec![vec![Duration::from_millis(10), Duration::from_millis(30)]];

        let summary = output.summarize(&durations, 0, RESOLUTION).unwrap();

        assert_eq!(summary.aggregate(), 50.0);
        assert_eq!(summary.per_sample().mean(), 50.0);
    }

    #[test]
    fn rate_per_second_over_measured_time() {
        let output = CustomStatOutput::new("events", AggregationType::RatePerSecond, 1, 3);

        output.add(0, 0, 7.0);
        output.add(0, 1, 40.0);
        output.add(0, 2, 60.0);

        let durations = vec![vec![Duration::from_millis(500), Duration::from_millis(1500)]];

        let summary = output.summarize(&durations, 1, RESOLUTION).unwrap();

        // 100 events over 2 seconds.
        assert_eq!(summary.aggregate(), 50.0);
        assert_eq!(summary.per_sample().sorted_samples(), &[40.0, 80.0]);
    }

    #[test]
    fn summarize_without_measured_samples_fails() {
        let output = CustomStatOutput::new("x", AggregationType::Mean, 1, 1);

        assert!(matches!(
            output.summarize(&[Vec::new()], 0, RESOLUTION),
            Err(Error::NoSamples)
        ));
    }

    #[test]
    fn rate_of_zero_duration_sample_stays_finite() {
        let output = CustomStatOutput::new("events", AggregationType::RatePerSecond, 1, 2);

        output.add(0, 0, 5.0);
        output.add(0, 1, 5.0);

        let durations = vec![vec![Duration::ZERO, Duration::from_millis(1)]];

        let summary = output.summarize(&durations, 0, RESOLUTION).unwrap();

        assert!(summary.aggregate().is_finite());
        assert!(summary.per_sample().mean().is_finite());
        assert!(summary.per_sample().standard_deviation().unwrap().is_finite());
        assert_eq!(summary.per_sample().max(), 5.0 / RESOLUTION.as_secs_f64());
        assert_eq!(summary.below_resolution_samples(), 1);
    }

    #[test]
    fn rate_with_zero_resolution_stays_finite() {
        let output = CustomStatOutput::new("events", AggregationType::RatePerSecond, 1, 1);

        output.add(0, 0, 5.0);

        let summary = output
            .summarize(&[vec![Duration::ZERO]], 0, Duration::ZERO)
            .unwrap();

        assert!(summary.aggregate().is_finite());
        assert!(summary.per_sample().mean().is_finite());
    }
}
