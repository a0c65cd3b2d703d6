use std::num::NonZero;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use foldhash::{HashSet, HashSetExt};
use new_zealand::nz;
use tracing::{debug, info, warn};

use crate::calibrate::{determine_iterations, determine_warming_up_samples};
use crate::invoker::panic_message;
use crate::{
    BenchmarkCase, BenchmarkCaseRegistry, BenchmarkCondition, BenchmarkFullName, Error,
    InvocationContext, Measurement, MeasurementConfig, MeasurementSizes, MonotoneClock,
    NameFilter, RegisteredCase, Report, Result, ResultRecord, execute, take_global_registry,
};

/// Settings of a [`Runner`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use new_zealand::nz;
/// use stat_harness::RunnerConfig;
///
/// let config = RunnerConfig::new()
///     .samples(nz!(50))
///     .min_sample_duration(Duration::from_millis(10))
///     .include("parse/*");
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct RunnerConfig {
    default_threads: NonZero<usize>,

    // Measured samples, used when a measurement leaves the sample count unset.
    samples: NonZero<usize>,

    min_sample_duration: Duration,
    min_warming_up_iterations: usize,
    min_warming_up_duration: Duration,

    filter: NameFilter,
}

impl RunnerConfig {
    /// Creates a configuration with the default settings.
    pub fn new() -> Self {
        Self {
            default_threads: nz!(1),
            samples: nz!(30),
            min_sample_duration: Duration::from_millis(30),
            min_warming_up_iterations: 1,
            min_warming_up_duration: Duration::from_millis(30),
            filter: NameFilter::new(),
        }
    }

    /// Thread count of cases that do not declare the `threads` parameter. Default: 1.
    pub fn default_threads(self, value: NonZero<usize>) -> Self {
        Self {
            default_threads: value,
            ..self
        }
    }

    /// Measured samples per thread when a measurement does not set the sample count.
    /// Warm-up samples come on top. Default: 30.
    pub fn samples(self, value: NonZero<usize>) -> Self {
        Self {
            samples: value,
            ..self
        }
    }

    /// Minimum duration of one sample when iterations are calibrated. Default: 30 ms.
    pub fn min_sample_duration(self, value: Duration) -> Self {
        Self {
            min_sample_duration: value,
            ..self
        }
    }

    /// Minimum total iterations of warm-up when warm-up samples are calibrated. Default: 1.
    pub fn min_warming_up_iterations(self, value: usize) -> Self {
        Self {
            min_warming_up_iterations: value,
            ..self
        }
    }

    /// Minimum total duration of warm-up when warm-up samples are calibrated. Default: 30 ms.
    pub fn min_warming_up_duration(self, value: Duration) -> Self {
        Self {
            min_warming_up_duration: value,
            ..self
        }
    }

    /// Only runs cases whose `group/case` name matches this glob pattern, or any other
    /// include pattern.
    pub fn include(self, pattern: &str) -> Self {
        Self {
            filter: self.filter.include(pattern),
            ..self
        }
    }

    /// Skips cases whose `group/case` name matches this glob pattern.
    pub fn exclude(self, pattern: &str) -> Self {
        Self {
            filter: self.filter.exclude(pattern),
            ..self
        }
    }

    /// Only runs cases whose whole `group/case` name matches this regular expression, or any
    /// other include pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRegex`] if `pattern` is not a valid regular expression.
    pub fn include_regex(self, pattern: &str) -> Result<Self> {
        Ok(Self {
            filter: self.filter.include_regex(pattern)?,
            ..self
        })
    }

    /// Skips cases whose whole `group/case` name matches this regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRegex`] if `pattern` is not a valid regular expression.
    pub fn exclude_regex(self, pattern: &str) -> Result<Self> {
        Ok(Self {
            filter: self.filter.exclude_regex(pattern)?,
            ..self
        })
    }

    /// Replaces the include and exclude patterns.
    pub fn filter(self, filter: NameFilter) -> Self {
        Self { filter, ..self }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Measures every case of a registry and collects the results into a [`Report`].
///
/// Measurement types run one after another. Within a measurement type, groups run in name
/// order, cases in registration order and conditions in generation order. Nothing runs in
/// parallel except the threads of a single multi-threaded measurement.
///
/// A failing case or condition is recorded in the report and the run goes on.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use stat_harness::{BenchmarkCaseRegistry, MeasurementConfig, Runner, RunnerConfig, case};
///
/// let mut registry = BenchmarkCaseRegistry::new();
/// registry
///     .add(
///         case("math", "sum")
///             .measurement(MeasurementConfig::new("").iterations(10).samples(4))
///             .run(|context| {
///                 context.measure(|_, _, _| (0..100_u64).sum::<u64>())?;
///                 Ok(())
///             })
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
///
/// let report = Runner::new(RunnerConfig::new()).run(&mut registry).unwrap();
///
/// // One record per default measurement type.
/// assert_eq!(report.records().len(), 2);
/// assert!(report.is_success());
/// println!("{report}");
/// ```
#[derive(Debug)]
pub struct Runner {
    config: RunnerConfig,
    clock: MonotoneClock,
}

impl Runner {
    /// Creates a runner.
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            clock: MonotoneClock::new(),
        }
    }

    /// Runs the cases of the process-wide registry, leaving it empty.
    ///
    /// # Errors
    ///
    /// Returns the first error that happened while cases were registered.
    pub fn run_registered(&self) -> Result<Report> {
        let mut registry = take_global_registry();
        self.run(&mut registry)
    }

    /// Runs all cases of `registry` that pass the name filter.
    ///
    /// # Errors
    ///
    /// Returns the first error kept by [`BenchmarkCaseRegistry::record()`]. Failures of
    /// individual cases are not errors; they are recorded in the report.
    pub fn run(&self, registry: &mut BenchmarkCaseRegistry) -> Result<Report> {
        registry.check()?;

        let mut report = Report::new();

        for group in registry.groups() {
            let has_measurements = !group.config().measurements().is_empty();

            for case in group.cases() {
                if !self.config.filter.matches(case.name()) {
                    continue;
                }

                if !has_measurements {
                    warn!(case = %case.name(), "group has no measurement types, case is skipped");
                    report.push_warning(format!(
                        "{} belongs to a group without measurement types and was skipped",
                        case.name()
                    ));
                } else if case.params().generate().is_empty() {
                    warn!(case = %case.name(), "case has no conditions and is skipped");
                    report.push_warning(format!(
                        "{} has a parameter without values, so it has no conditions and was skipped",
                        case.name()
                    ));
                }
            }
        }

        for measurement_type in measurement_types(registry) {
            for group in registry.groups_mut() {
                let Some(group_measurement) = group
                    .config()
                    .measurements()
                    .iter()
                    .find(|config| config.measurement_type() == measurement_type)
                    .cloned()
                else {
                    continue;
                };

                for case in group.cases_mut() {
                    if !self.config.filter.matches(case.name()) {
                        continue;
                    }

                    self.run_case(case, &group_measurement, &mut report);
                }
            }
        }

        info!(
            records = report.records().len(),
            failures = report.failures().count(),
            warnings = report.warnings().len(),
            "benchmark run finished"
        );

        Ok(report)
    }

    fn run_case(
        &self,
        case: &mut RegisteredCase,
        group_measurement: &MeasurementConfig,
        report: &mut Report,
    ) {
        let measurement = case.measurement().map_or_else(
            || group_measurement.clone(),
            |case_measurement| case_measurement.overlay_onto(group_measurement),
        );

        let name = case.name().clone();
        let conditions = case.params().generate();

        for params in conditions {
            let condition =
                match BenchmarkCondition::from_params(params.clone(), self.config.default_threads)
                {
                    Ok(condition) => condition,
                    Err(error) => {
                        warn!(case = %name, %params, %error, "invalid condition");
                        report.push_record(ResultRecord::failed(
                            measurement.measurement_type(),
                            name.clone(),
                            BenchmarkCondition::new(self.config.default_threads, params),
                            None,
                            &error,
                        ));
                        continue;
                    }
                };

            debug!(
                case = %name,
                %condition,
                measurement_type = measurement.measurement_type(),
                "measuring"
            );

            let record = self.measure_condition(case.case_mut(), &name, condition, &measurement);

            if let Some(failure) = record.failure() {
                warn!(case = %name, condition = %record.condition(), failure, "measurement failed");
            }

            report.push_record(record);
        }
    }

    fn measure_condition(
        &self,
        case: &mut dyn BenchmarkCase,
        name: &BenchmarkFullName,
        condition: BenchmarkCondition,
        measurement: &MeasurementConfig,
    ) -> ResultRecord {
        let sizes = match self.determine_sizes(case, &condition, measurement) {
            Ok(sizes) => sizes,
            Err(error) => {
                return ResultRecord::failed(
                    measurement.measurement_type(),
                    name.clone(),
                    condition,
                    None,
                    &error,
                );
            }
        };

        let mut context = InvocationContext::with_clock(
            condition,
            measurement.measurement_type(),
            sizes,
            self.clock.clone(),
        );

        match guarded_execute(case, &mut context).and_then(|()| Measurement::from_context(&context))
        {
            Ok(result) => ResultRecord::measured(name.clone(), &context, result),
            Err(error) => ResultRecord::failed(
                measurement.measurement_type(),
                name.clone(),
                context.condition().clone(),
                Some(sizes),
                &error,
            ),
        }
    }

    fn determine_sizes(
        &self,
        case: &mut dyn BenchmarkCase,
        condition: &BenchmarkCondition,
        measurement: &MeasurementConfig,
    ) -> Result<MeasurementSizes> {
        let measurement_type = measurement.measurement_type();

        let iterations = match measurement.iterations_value() {
            Some(iterations) => iterations,
            None => determine_iterations(self.config.min_sample_duration, |iterations| {
                self.trial(case, condition, measurement_type, iterations)
            })?,
        };

        let warming_up_samples = match measurement.warming_up_samples_value() {
            Some(warming_up_samples) => warming_up_samples,
            None => {
                let calibrated = determine_warming_up_samples(
                    iterations,
                    self.config.min_warming_up_iterations,
                    self.config.min_warming_up_duration,
                    |iterations| self.trial(case, condition, measurement_type, iterations),
                )?;

                // An explicit total sample count must leave at least one sample to measure.
                match measurement.samples_value() {
                    Some(samples) => calibrated.min(samples.saturating_sub(1)),
                    None => calibrated,
                }
            }
        };

        let samples = measurement
            .samples_value()
            .unwrap_or_else(|| self.config.samples.get().saturating_add(warming_up_samples));

        MeasurementSizes::new(iterations, samples, warming_up_samples)
    }

    // Runs the case with two samples without warm-up and returns the duration of the second.
    fn trial(
        &self,
        case: &mut dyn BenchmarkCase,
        condition: &BenchmarkCondition,
        measurement_type: &str,
        iterations: usize,
    ) -> Result<Duration> {
        let sizes = MeasurementSizes::new(iterations, 2, 0)?;

        let mut context = InvocationContext::with_clock(
            condition.clone(),
            measurement_type,
            sizes,
            self.clock.clone(),
        );

        guarded_execute(case, &mut context)?;

        context
            .durations()
            .and_then(|threads| threads.first())
            .and_then(|samples| samples.get(1))
            .copied()
            .ok_or(Error::NoMeasurement)
    }
}

fn guarded_execute(case: &mut dyn BenchmarkCase, context: &mut InvocationContext) -> Result<()> {
    panic::catch_unwind(AssertUnwindSafe(|| execute(case, context))).unwrap_or_else(|payload| {
        Err(Error::CasePanicked {
            message: panic_message(&*payload),
        })
    })
}

// Measurement types of all groups, in order of first appearance.
fn measurement_types(registry: &BenchmarkCaseRegistry) -> Vec<String> {
    let mut seen = HashSet::new();

    registry
        .groups()
        .iter()
        .flat_map(|group| group.config().measurements())
        .map(MeasurementConfig::measurement_type)
        .filter(|measurement_type| seen.insert(*measurement_type))
        .map(str::to_string)
        .collect()
}
