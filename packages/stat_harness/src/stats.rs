use std::time::Duration;

use crate::{Error, Result};

/// Summary statistics of a non-empty series of samples.
///
/// The series is kept both in its original order and sorted, so that consumers can plot either.
///
/// # Examples
///
/// ```
/// use stat_harness::Statistics;
///
/// let stats = Statistics::new(vec![3.0, 1.0, 2.0, 4.0]).unwrap();
///
/// assert_eq!(stats.min(), 1.0);
/// assert_eq!(stats.max(), 4.0);
/// assert_eq!(stats.mean(), 2.5);
/// assert_eq!(stats.median(), 3.0);
/// assert_eq!(stats.sorted_samples(), &[1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Statistics {
    unsorted_samples: Vec<f64>,
    sorted_samples: Vec<f64>,

    mean: f64,
    variance: Option<f64>,
    median: f64,

    below_resolution_samples: usize,
}

impl Statistics {
    /// Calculates statistics of `samples`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSamples`] if `samples` is empty.
    pub fn new(samples: Vec<f64>) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::NoSamples);
        }

        let mut sorted_samples = samples.clone();
        sorted_samples.sort_by(f64::total_cmp);

        let count = as_f64(samples.len());
        let mean = samples.iter().sum::<f64>() / count;

        let variance = (samples.len() >= 2).then(|| {
            let squared_deviations = samples
                .iter()
                .map(|sample| (sample - mean).powi(2))
                .sum::<f64>();

            squared_deviations / (count - 1.0)
        });

        #[expect(
            clippy::integer_division,
            reason = "upper middle element is the intended median for even lengths"
        )]
        let middle = sorted_samples.len() / 2;

        let median = sorted_samples
            .get(middle)
            .copied()
            .ok_or(Error::NoSamples)?;

        Ok(Self {
            unsorted_samples: samples,
            sorted_samples,
            mean,
            variance,
            median,
            below_resolution_samples: 0,
        })
    }

    /// Calculates per-iteration statistics of sample durations, in seconds.
    ///
    /// Every duration covers `iterations` invocations of the measured code. Durations below
    /// `resolution` are kept but counted in
    /// [`below_resolution_samples()`][Self::below_resolution_samples].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSamples`] if `durations` is empty.
    pub fn from_durations(
        durations: impl IntoIterator<Item = Duration>,
        iterations: usize,
        resolution: Duration,
    ) -> Result<Self> {
        let iterations = as_f64(iterations.max(1));
        let mut below_resolution_samples: usize = 0;

        let samples = durations
            .into_iter()
            .map(|duration| {
                if duration < resolution {
                    below_resolution_samples = below_resolution_samples.saturating_add(1);
                }

                duration.as_secs_f64() / iterations
            })
            .collect();

        let mut stats = Self::new(samples)?;
        stats.below_resolution_samples = below_resolution_samples;
        Ok(stats)
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.unsorted_samples.len()
    }

    /// Always `false`, as statistics cannot be calculated for an empty series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unsorted_samples.is_empty()
    }

    /// Arithmetic mean.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance with Bessel's correction, `None` for fewer than two samples.
    #[must_use]
    pub fn variance(&self) -> Option<f64> {
        self.variance
    }

    /// Sample standard deviation, `None` for fewer than two samples.
    #[must_use]
    pub fn standard_deviation(&self) -> Option<f64> {
        self.variance.map(f64::sqrt)
    }

    /// Smallest sample.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.sorted_samples.first().copied().unwrap_or(f64::NAN)
    }

    /// Largest sample.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.sorted_samples.last().copied().unwrap_or(f64::NAN)
    }

    /// Median, the upper middle element for an even number of samples.
    #[must_use]
    pub fn median(&self) -> f64 {
        self.median
    }

    /// Percentile by nearest rank, `percent` clamped to `0.0..=100.0`.
    ///
    /// The 0th percentile is the minimum and the 100th is the maximum.
    #[must_use]
    pub fn percentile(&self, percent: f64) -> f64 {
        let fraction = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0) / 100.0
        };

        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "rank is non-negative and at most the number of samples"
        )]
        let rank = (fraction * as_f64(self.len())).ceil() as usize;

        let index = rank.clamp(1, self.len()).saturating_sub(1);

        self.sorted_samples
            .get(index)
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Samples in the order they were taken.
    #[must_use]
    pub fn unsorted_samples(&self) -> &[f64] {
        &self.unsorted_samples
    }

    /// Samples in ascending order.
    #[must_use]
    pub fn sorted_samples(&self) -> &[f64] {
        &self.sorted_samples
    }

    /// Number of duration samples shorter than the clock resolution.
    ///
    /// Such samples are dominated by timer noise. They are reported, not discarded.
    #[must_use]
    pub fn below_resolution_samples(&self) -> usize {
        self.below_resolution_samples
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "sample counts are far below 2^52"
)]
pub(crate) fn as_f64(value: usize) -> f64 {
    value as f64
}
