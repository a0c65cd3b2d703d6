use std::time::Duration;

use crate::{
    BenchmarkCondition, BenchmarkFullName, CustomOutput, CustomStatSummary, Error,
    InvocationContext, MeasurementSizes, Result, Statistics,
};

/// The result of measuring one case under one condition with one measurement type.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultRecord {
    measurement_type: String,
    name: BenchmarkFullName,
    condition: BenchmarkCondition,

    // Unknown if the measurement failed before the sizes were determined.
    sizes: Option<MeasurementSizes>,

    outcome: MeasurementOutcome,
}

impl ResultRecord {
    /// Creates the record of a completed measurement.
    #[must_use]
    pub fn measured(
        name: BenchmarkFullName,
        context: &InvocationContext,
        measurement: Measurement,
    ) -> Self {
        Self {
            measurement_type: context.measurement_type().to_string(),
            name,
            condition: context.condition().clone(),
            sizes: Some(context.sizes()),
            outcome: MeasurementOutcome::Measured(measurement),
        }
    }

    /// Creates the record of a failed measurement.
    #[must_use]
    pub fn failed(
        measurement_type: &str,
        name: BenchmarkFullName,
        condition: BenchmarkCondition,
        sizes: Option<MeasurementSizes>,
        error: &Error,
    ) -> Self {
        Self {
            measurement_type: measurement_type.to_string(),
            name,
            condition,
            sizes,
            outcome: MeasurementOutcome::Failed {
                message: error.to_string(),
            },
        }
    }

    /// Name of the measurement type.
    #[must_use]
    pub fn measurement_type(&self) -> &str {
        &self.measurement_type
    }

    /// Full name of the case.
    #[must_use]
    pub fn name(&self) -> &BenchmarkFullName {
        &self.name
    }

    /// The condition that was measured.
    #[must_use]
    pub fn condition(&self) -> &BenchmarkCondition {
        &self.condition
    }

    /// The sizes that were used, if they were determined.
    #[must_use]
    pub fn sizes(&self) -> Option<MeasurementSizes> {
        self.sizes
    }

    /// Statistics or failure.
    #[must_use]
    pub fn outcome(&self) -> &MeasurementOutcome {
        &self.outcome
    }

    /// The measurement, `None` if it failed.
    #[must_use]
    pub fn measurement(&self) -> Option<&Measurement> {
        match &self.outcome {
            MeasurementOutcome::Measured(measurement) => Some(measurement),
            MeasurementOutcome::Failed { .. } => None,
        }
    }

    /// The failure message, `None` if the measurement succeeded.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            MeasurementOutcome::Measured(_) => None,
            MeasurementOutcome::Failed { message } => Some(message),
        }
    }
}

/// Whether a measurement produced statistics or failed.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum MeasurementOutcome {
    /// The measurement completed.
    Measured(Measurement),

    /// The measurement failed and was skipped.
    Failed {
        /// Description of the failure.
        message: String,
    },
}

/// Timing statistics and custom statistics of a completed measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    // Per thread, per measured sample.
    durations: Vec<Vec<Duration>>,

    duration_stats: Statistics,
    custom_stats: Vec<CustomStatSummary>,
    custom_outputs: Vec<CustomOutput>,
}

impl Measurement {
    /// Aggregates what was measured in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoMeasurement`] if nothing was measured and [`Error::NoSamples`] if the
    /// measurement has no samples.
    pub fn from_context(context: &InvocationContext) -> Result<Self> {
        let durations = context.durations().ok_or(Error::NoMeasurement)?;

        let duration_stats = Statistics::from_durations(
            durations.iter().flatten().copied(),
            context.iterations(),
            context.clock().resolution(),
        )?;

        let custom_stats = context
            .custom_stats()
            .iter()
            .map(|stat| {
                stat.summarize(
                    durations,
                    context.warming_up_samples(),
                    context.clock().resolution(),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            durations: durations.to_vec(),
            duration_stats,
            custom_stats,
            custom_outputs: context.custom_outputs().to_vec(),
        })
    }

    /// Durations of the measured samples per thread. Each covers all iterations of a sample.
    #[must_use]
    pub fn durations(&self) -> &[Vec<Duration>] {
        &self.durations
    }

    /// Statistics of the per-iteration time in seconds over all threads and measured samples.
    #[must_use]
    pub fn duration_stats(&self) -> &Statistics {
        &self.duration_stats
    }

    /// Summaries of the custom statistics.
    #[must_use]
    pub fn custom_stats(&self) -> &[CustomStatSummary] {
        &self.custom_stats
    }

    /// The custom outputs.
    #[must_use]
    pub fn custom_outputs(&self) -> &[CustomOutput] {
        &self.custom_outputs
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::float_cmp, reason = "exact values are expected in these tests")]

    use new_zealand::nz;

    use super::*;
    use crate::{AggregationType, ParameterDict};

    fn context() -> InvocationContext {
        InvocationContext::new(
            BenchmarkCondition::new(nz!(1), ParameterDict::new()),
            "test",
            MeasurementSizes::new(2, 4, 1).unwrap(),
        )
    }

    #[test]
    fn without_measure_there_is_nothing_to_aggregate() {
        assert!(matches!(
            Measurement::from_context(&context()),
            Err(Error::NoMeasurement)
        ));
    }

    #[test]
    fn aggregates_durations_and_custom_stats() {
        let mut context = context();
        let stat = context
            .add_custom_stat("items", AggregationType::Mean)
            .unwrap();
        context.add_custom_output("bytes", 1024.0);

        context
            .measure(|thread_index, sample_index, _| {
                stat.add(thread_index, sample_index, 6.0);
            })
            .unwrap();

        let measurement = Measurement::from_context(&context).unwrap();

        assert_eq!(measurement.durations().len(), 1);
        assert_eq!(measurement.duration_stats().len(), 3);
        assert_eq!(measurement.custom_stats().len(), 1);
        assert_eq!(measurement.custom_stats()[0].aggregate(), 6.0);
        assert_eq!(measurement.custom_stats()[0].per_sample().mean(), 6.0);
        assert_eq!(measurement.custom_outputs()[0].value(), 1024.0);

        let record =
            ResultRecord::measured(BenchmarkFullName::new("g", "c"), &context, measurement);

        assert_eq!(record.measurement_type(), "test");
        assert_eq!(record.sizes().unwrap().iterations().get(), 2);
        assert!(record.measurement().is_some());
        assert!(record.failure().is_none());
    }

    #[test]
    fn failed_record_keeps_message() {
        let record = ResultRecord::failed(
            "test",
            BenchmarkFullName::new("g", "c"),
            BenchmarkCondition::new(nz!(1), ParameterDict::new()),
            None,
            &Error::NoMeasurement,
        );

        assert_eq!(record.failure(), Some("no measurement was done"));
        assert!(record.measurement().is_none());
        assert!(record.sizes().is_none());
    }
}
