use std::num::NonZero;

use new_zealand::nz;

use crate::{Error, Result};

/// Measurement type with exactly one iteration per sample, so every sample is the time of
/// a single invocation of the measured code.
pub const PROCESSING_TIME: &str = "Processing Time";

/// Measurement type whose iteration count is calibrated so that every sample lasts long enough
/// for the per-iteration mean to be meaningful.
pub const MEAN_PROCESSING_TIME: &str = "Mean Processing Time";

/// How a benchmark case is measured: a named measurement type plus optional size overrides.
///
/// Sizes that are left unset are filled in by the runner, either from its defaults or by
/// calibrating against the measured code.
///
/// # Examples
///
/// ```
/// use stat_harness::MeasurementConfig;
///
/// let config = MeasurementConfig::new("Quick")
///     .iterations(100)
///     .samples(12)
///     .warming_up_samples(2);
///
/// assert_eq!(config.measurement_type(), "Quick");
/// assert_eq!(config.iterations_value(), Some(100));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MeasurementConfig {
    measurement_type: String,

    iterations: Option<usize>,

    // Total samples, warm-up samples included.
    samples: Option<usize>,

    warming_up_samples: Option<usize>,
}

impl MeasurementConfig {
    /// Creates a configuration for the named measurement type with no sizes set.
    #[must_use]
    pub fn new(measurement_type: impl Into<String>) -> Self {
        Self {
            measurement_type: measurement_type.into(),
            iterations: None,
            samples: None,
            warming_up_samples: None,
        }
    }

    /// The "Processing Time" configuration: one iteration per sample.
    #[must_use]
    pub fn processing_time() -> Self {
        Self::new(PROCESSING_TIME).iterations(1)
    }

    /// The "Mean Processing Time" configuration: calibrated iterations per sample.
    #[must_use]
    pub fn mean_processing_time() -> Self {
        Self::new(MEAN_PROCESSING_TIME)
    }

    /// Sets the number of iterations per sample.
    #[must_use]
    pub fn iterations(self, value: usize) -> Self {
        Self {
            iterations: Some(value),
            ..self
        }
    }

    /// Sets the total number of samples, warm-up samples included.
    #[must_use]
    pub fn samples(self, value: usize) -> Self {
        Self {
            samples: Some(value),
            ..self
        }
    }

    /// Sets the number of warm-up samples, whose timings are not reported.
    #[must_use]
    pub fn warming_up_samples(self, value: usize) -> Self {
        Self {
            warming_up_samples: Some(value),
            ..self
        }
    }

    /// Name of the measurement type.
    #[must_use]
    pub fn measurement_type(&self) -> &str {
        &self.measurement_type
    }

    /// Configured iterations per sample, if set.
    #[must_use]
    pub fn iterations_value(&self) -> Option<usize> {
        self.iterations
    }

    /// Configured total samples, if set.
    #[must_use]
    pub fn samples_value(&self) -> Option<usize> {
        self.samples
    }

    /// Configured warm-up samples, if set.
    #[must_use]
    pub fn warming_up_samples_value(&self) -> Option<usize> {
        self.warming_up_samples
    }

    /// Fills every size that is not set here with the value from `other`.
    ///
    /// The measurement type is kept.
    pub fn apply_if_not_set(&mut self, other: &Self) {
        self.iterations = self.iterations.or(other.iterations);
        self.samples = self.samples.or(other.samples);
        self.warming_up_samples = self.warming_up_samples.or(other.warming_up_samples);
    }

    /// Returns `base` with every size that is set here taking precedence.
    ///
    /// This is how a case-level configuration refines each measurement type of its group.
    #[must_use]
    pub fn overlay_onto(&self, base: &Self) -> Self {
        let mut merged = Self {
            measurement_type: base.measurement_type.clone(),
            ..self.clone()
        };

        merged.apply_if_not_set(base);
        merged
    }

    /// Checks the sizes that are set for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMeasurementConfig`] if iterations or samples are zero or if the
    /// warm-up samples would leave no sample to measure.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == Some(0) {
            return Err(invalid("the number of iterations must be at least one"));
        }

        if self.samples == Some(0) {
            return Err(invalid("the number of samples must be at least one"));
        }

        if let (Some(samples), Some(warming_up_samples)) = (self.samples, self.warming_up_samples)
            && warming_up_samples >= samples
        {
            return Err(invalid(&format!(
                "{warming_up_samples} warm-up samples leave nothing to measure in {samples} samples"
            )));
        }

        Ok(())
    }
}

fn invalid(problem: &str) -> Error {
    Error::InvalidMeasurementConfig {
        problem: problem.to_string(),
    }
}

/// The concrete sizes of one invocation, after defaults and calibration were applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MeasurementSizes {
    iterations: NonZero<usize>,
    samples: NonZero<usize>,
    warming_up_samples: usize,
}

impl MeasurementSizes {
    /// Validates and combines the sizes of one invocation.
    ///
    /// `samples` is the total, warm-up samples included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMeasurementConfig`] if iterations or samples are zero or if
    /// `warming_up_samples` is not less than `samples`.
    pub fn new(iterations: usize, samples: usize, warming_up_samples: usize) -> Result<Self> {
        let iterations = NonZero::new(iterations)
            .ok_or_else(|| invalid("the number of iterations must be at least one"))?;
        let samples = NonZero::new(samples)
            .ok_or_else(|| invalid("the number of samples must be at least one"))?;

        if warming_up_samples >= samples.get() {
            return Err(invalid(&format!(
                "{warming_up_samples} warm-up samples leave nothing to measure in {samples} samples"
            )));
        }

        Ok(Self {
            iterations,
            samples,
            warming_up_samples,
        })
    }

    /// Sizes for a single sample of a single iteration without warm-up.
    #[must_use]
    pub fn single() -> Self {
        Self {
            iterations: nz!(1),
            samples: nz!(1),
            warming_up_samples: 0,
        }
    }

    /// Iterations per sample.
    #[must_use]
    pub fn iterations(&self) -> NonZero<usize> {
        self.iterations
    }

    /// Total samples, warm-up samples included.
    #[must_use]
    pub fn samples(&self) -> NonZero<usize> {
        self.samples
    }

    /// Warm-up samples at the start of every thread's run.
    #[must_use]
    pub fn warming_up_samples(&self) -> usize {
        self.warming_up_samples
    }

    /// Samples whose timings are reported.
    #[must_use]
    pub fn measured_samples(&self) -> NonZero<usize> {
        #[expect(
            clippy::arithmetic_side_effects,
            reason = "constructor guarantees warming_up_samples < samples"
        )]
        let measured = self.samples.get() - self.warming_up_samples;

        NonZero::new(measured).expect("constructor guarantees warming_up_samples < samples")
    }
}

/// Configuration shared by all cases of a benchmark group.
///
/// Every case in the group is measured once per measurement configuration, in order.
/// The default has "Processing Time" followed by "Mean Processing Time".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupConfig {
    measurements: Vec<MeasurementConfig>,
}

impl GroupConfig {
    /// Creates a group configuration with no measurement configurations at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            measurements: Vec::new(),
        }
    }

    /// Adds a measurement configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateMeasurementType`] if the group already has a configuration with
    /// the same measurement type and [`Error::InvalidMeasurementConfig`] if the sizes are
    /// inconsistent.
    pub fn add_measurement(&mut self, config: MeasurementConfig) -> Result<()> {
        config.validate()?;

        if self
            .measurements
            .iter()
            .any(|existing| existing.measurement_type == config.measurement_type)
        {
            return Err(Error::DuplicateMeasurementType {
                name: config.measurement_type,
            });
        }

        self.measurements.push(config);
        Ok(())
    }

    /// Removes all measurement configurations, including the defaults.
    pub fn clear_measurements(&mut self) {
        self.measurements.clear();
    }

    /// The measurement configurations, in order.
    #[must_use]
    pub fn measurements(&self) -> &[MeasurementConfig] {
        &self.measurements
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            measurements: vec![
                MeasurementConfig::processing_time(),
                MeasurementConfig::mean_processing_time(),
            ],
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn apply_if_not_set_keeps_explicit_values() {
        let mut config = MeasurementConfig::new("a").iterations(5);
        config.apply_if_not_set(&MeasurementConfig::new("b").iterations(7).samples(9));

        assert_eq!(config.measurement_type(), "a");
        assert_eq!(config.iterations_value(), Some(5));
        assert_eq!(config.samples_value(), Some(9));
        assert_eq!(config.warming_up_samples_value(), None);
    }

    #[test]
    fn overlay_takes_type_from_base() {
        let case = MeasurementConfig::new("ignored").samples(4);
        let merged = case.overlay_onto(&MeasurementConfig::processing_time());

        assert_eq!(merged.measurement_type(), PROCESSING_TIME);
        assert_eq!(merged.iterations_value(), Some(1));
        assert_eq!(merged.samples_value(), Some(4));
    }

    #[test]
    fn validate_rejects_inconsistent_sizes() {
        assert!(MeasurementConfig::new("x").iterations(0).validate().is_err());
        assert!(MeasurementConfig::new("x").samples(0).validate().is_err());
        assert!(
            MeasurementConfig::new("x")
                .samples(3)
                .warming_up_samples(3)
                .validate()
                .is_err()
        );
        assert!(
            MeasurementConfig::new("x")
                .samples(3)
                .warming_up_samples(2)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn sizes_require_one_measured_sample() {
        assert!(MeasurementSizes::new(1, 2, 2).is_err());
        assert!(MeasurementSizes::new(0, 2, 0).is_err());
        assert!(MeasurementSizes::new(1, 0, 0).is_err());

        let sizes = MeasurementSizes::new(10, 5, 2).unwrap();
        assert_eq!(sizes.iterations().get(), 10);
        assert_eq!(sizes.samples().get(), 5);
        assert_eq!(sizes.warming_up_samples(), 2);
        assert_eq!(sizes.measured_samples().get(), 3);
    }

    #[test]
    fn default_group_config_has_two_measurement_types() {
        let config = GroupConfig::default();
        let types = config
            .measurements()
            .iter()
            .map(MeasurementConfig::measurement_type)
            .collect::<Vec<_>>();

        assert_eq!(types, [PROCESSING_TIME, MEAN_PROCESSING_TIME]);
    }

    #[test]
    fn duplicate_measurement_type_is_rejected() {
        let mut config = GroupConfig::default();

        assert!(matches!(
            config.add_measurement(MeasurementConfig::processing_time()),
            Err(Error::DuplicateMeasurementType { .. })
        ));

        config.clear_measurements();
        config
            .add_measurement(MeasurementConfig::processing_time())
            .unwrap();
        assert_eq!(config.measurements().len(), 1);
    }
}
