use std::num::NonZero;
use std::sync::Arc;
use std::time::Duration;

use crate::invoker::invoke;
use crate::{
    AggregationType, BenchmarkCondition, CaseState, CustomOutput, CustomStatOutput, Error,
    FromParameterValue, MeasurementSizes, MonotoneClock, ParameterDict, Result,
};

/// Everything a benchmark case sees while it is executed under one condition and one
/// measurement type.
///
/// The context is created fresh by the runner for every (case, condition, measurement type)
/// and handed to the lifecycle hooks of the case. The measured code itself runs inside
/// [`measure()`][Self::measure].
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use stat_harness::{BenchmarkCondition, InvocationContext, MeasurementSizes, ParameterDict};
///
/// let condition = BenchmarkCondition::new(nz!(1), ParameterDict::new());
/// let sizes = MeasurementSizes::new(10, 5, 1).unwrap();
/// let mut context = InvocationContext::new(condition, "Processing Time", sizes);
///
/// context
///     .measure(|_thread_index, _sample_index, _iteration_index| {
///         std::hint::black_box((0..100).sum::<u64>())
///     })
///     .unwrap();
///
/// // One thread, four measured samples.
/// assert_eq!(context.durations().unwrap()[0].len(), 4);
/// ```
#[derive(Debug)]
pub struct InvocationContext {
    condition: BenchmarkCondition,
    measurement_type: String,
    sizes: MeasurementSizes,

    clock: MonotoneClock,

    custom_stats: Vec<Arc<CustomStatOutput>>,
    custom_outputs: Vec<CustomOutput>,

    // Per thread, per measured sample. Only the last `measure()` call is kept.
    durations: Option<Vec<Vec<Duration>>>,

    state: CaseState,
}

impl InvocationContext {
    /// Creates a context for one invocation.
    #[must_use]
    pub fn new(
        condition: BenchmarkCondition,
        measurement_type: impl Into<String>,
        sizes: MeasurementSizes,
    ) -> Self {
        Self::with_clock(condition, measurement_type, sizes, MonotoneClock::new())
    }

    pub(crate) fn with_clock(
        condition: BenchmarkCondition,
        measurement_type: impl Into<String>,
        sizes: MeasurementSizes,
        clock: MonotoneClock,
    ) -> Self {
        Self {
            condition,
            measurement_type: measurement_type.into(),
            sizes,
            clock,
            custom_stats: Vec::new(),
            custom_outputs: Vec::new(),
            durations: None,
            state: CaseState::Created,
        }
    }

    /// Measures `measured`, which is called with `(thread_index, sample_index, iteration_index)`
    /// for every iteration of every sample on every thread.
    ///
    /// Warm-up samples come first and are executed like the others, but their timings are not
    /// recorded. Each sample is timed as a whole. With more than one thread, all threads start
    /// every sample together.
    ///
    /// Calling this again replaces the durations of the previous call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MeasurementFailed`] if `measured` panicked; the remaining samples are
    /// skipped and no durations are kept. Returns [`Error::ThreadSpawn`] if a measuring thread
    /// could not be started, in which case `measured` was not called at all.
    pub fn measure<F, R>(&mut self, measured: F) -> Result<()>
    where
        F: Fn(usize, usize, usize) -> R + Sync,
    {
        self.durations = None;

        let durations = invoke(&measured, self.threads(), self.sizes, &self.clock)?;
        self.durations = Some(durations);

        Ok(())
    }

    /// Returns the custom statistic with the given name, creating it first if needed.
    ///
    /// The returned output has one slot per thread and sample (warm-up samples included) and
    /// can be moved into the measured closure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConflictingCustomStat`] if a statistic with the same name already exists
    /// with a different aggregation type.
    pub fn add_custom_stat(
        &mut self,
        name: &str,
        aggregation: AggregationType,
    ) -> Result<Arc<CustomStatOutput>> {
        if let Some(existing) = self.custom_stats.iter().find(|stat| stat.name() == name) {
            if existing.aggregation() != aggregation {
                return Err(Error::ConflictingCustomStat {
                    name: name.to_string(),
                });
            }

            return Ok(Arc::clone(existing));
        }

        let output = Arc::new(CustomStatOutput::new(
            name,
            aggregation,
            self.threads().get(),
            self.sizes.samples().get(),
        ));

        self.custom_stats.push(Arc::clone(&output));
        Ok(output)
    }

    /// Records a named value that is reported as-is, without statistics.
    ///
    /// Recording the same name again replaces the earlier value.
    pub fn add_custom_output(&mut self, name: &str, value: f64) {
        if let Some(existing) = self
            .custom_outputs
            .iter_mut()
            .find(|output| output.name() == name)
        {
            *existing = CustomOutput::new(name.to_string(), value);
        } else {
            self.custom_outputs
                .push(CustomOutput::new(name.to_string(), value));
        }
    }

    /// Typed value of a parameter of the current condition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] if the condition has no such parameter and
    /// [`Error::ParameterTypeMismatch`] if the value has a different type.
    pub fn param<T: FromParameterValue>(&self, name: &str) -> Result<T> {
        self.condition.params().get(name)
    }

    /// All parameters of the current condition.
    #[must_use]
    pub fn params(&self) -> &ParameterDict {
        self.condition.params()
    }

    /// The current condition.
    #[must_use]
    pub fn condition(&self) -> &BenchmarkCondition {
        &self.condition
    }

    /// Name of the measurement type.
    #[must_use]
    pub fn measurement_type(&self) -> &str {
        &self.measurement_type
    }

    /// Number of measuring threads.
    #[must_use]
    pub fn threads(&self) -> NonZero<usize> {
        self.condition.threads()
    }

    /// Iterations per sample.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.sizes.iterations().get()
    }

    /// Total samples per thread, warm-up samples included.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.sizes.samples().get()
    }

    /// Warm-up samples per thread.
    #[must_use]
    pub fn warming_up_samples(&self) -> usize {
        self.sizes.warming_up_samples()
    }

    /// Samples per thread whose timings are recorded.
    #[must_use]
    pub fn measured_samples(&self) -> usize {
        self.sizes.measured_samples().get()
    }

    /// The sizes of this invocation.
    #[must_use]
    pub fn sizes(&self) -> MeasurementSizes {
        self.sizes
    }

    /// The clock used for timing.
    #[must_use]
    pub fn clock(&self) -> &MonotoneClock {
        &self.clock
    }

    /// Durations of the measured samples per thread, `None` if nothing was measured yet or the
    /// last measurement failed.
    #[must_use]
    pub fn durations(&self) -> Option<&[Vec<Duration>]> {
        self.durations.as_deref()
    }

    /// The custom statistics, in creation order.
    #[must_use]
    pub fn custom_stats(&self) -> &[Arc<CustomStatOutput>] {
        &self.custom_stats
    }

    /// The custom outputs, in creation order.
    #[must_use]
    pub fn custom_outputs(&self) -> &[CustomOutput] {
        &self.custom_outputs
    }

    /// Where in its lifecycle the benchmark case currently is.
    #[must_use]
    pub fn state(&self) -> CaseState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: CaseState) {
        self.state = state;
    }
}
