use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::{
    BenchmarkCaseName, BenchmarkFullName, BenchmarkGroupName, Error, InvocationContext,
    MeasurementConfig, ParameterConfig, ParameterValue, RegisteredCase, Result, registry,
};

/// Error type returned by the lifecycle hooks of benchmark cases.
///
/// Any error type can be returned with `?`. Errors of this crate returned from hooks (e.g. from
/// [`InvocationContext::measure()`]) are passed through to the caller of [`execute()`]
/// unchanged.
pub type CaseError = Box<dyn std::error::Error + Send + Sync>;

/// Result type of the lifecycle hooks of benchmark cases.
pub type CaseResult = std::result::Result<(), CaseError>;

/// Lifecycle state of a benchmark case during [`execute()`].
#[derive(Clone, Copy, Debug, derive_more::Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CaseState {
    /// Nothing has been called yet.
    Created,

    /// `setup()` is running.
    Setup,

    /// `run()` is running.
    Running,

    /// `tear_down()` is running.
    #[display("Tearing Down")]
    TearingDown,

    /// The lifecycle is complete, successfully or not.
    Done,
}

/// A benchmark case: code that is measured under a set of conditions.
///
/// The runner creates one [`InvocationContext`] per condition and calls [`execute()`], which
/// drives `setup()`, `run()` and `tear_down()` in that order. `run()` is expected to call
/// [`InvocationContext::measure()`] exactly once.
///
/// Most cases are declared with [`case()`] and closures. Implement this trait directly for
/// cases that carry their own state.
pub trait BenchmarkCase: Send {
    /// Declares the parameters whose Cartesian product forms the conditions of this case.
    ///
    /// # Errors
    ///
    /// Returns an error if the declarations are invalid, e.g. a name is declared twice.
    fn params(&self) -> Result<ParameterConfig> {
        Ok(ParameterConfig::new())
    }

    /// Prepares the case for one condition.
    ///
    /// # Errors
    ///
    /// Any error aborts this condition. `run()` and `tear_down()` are not called.
    fn setup(&mut self, _context: &mut InvocationContext) -> CaseResult {
        Ok(())
    }

    /// Measures the case under one condition.
    ///
    /// # Errors
    ///
    /// Any error is reported for this condition after `tear_down()` has run.
    fn run(&mut self, context: &mut InvocationContext) -> CaseResult;

    /// Releases what `setup()` acquired. Called even if `run()` failed or panicked.
    ///
    /// # Errors
    ///
    /// An error is reported for this condition if `run()` succeeded.
    fn tear_down(&mut self, _context: &mut InvocationContext) -> CaseResult {
        Ok(())
    }
}

/// Reusable setup and teardown shared by benchmark cases, declared with
/// [`BenchmarkCaseBuilder::fixture()`].
pub trait Fixture: Send {
    /// Declares parameters of every case that uses this fixture.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter name is declared twice.
    fn declare_params(&self, _params: &mut ParameterConfig) -> Result<()> {
        Ok(())
    }

    /// Prepares the fixture for one condition.
    ///
    /// # Errors
    ///
    /// Any error aborts this condition.
    fn setup(&mut self, _context: &mut InvocationContext) -> CaseResult {
        Ok(())
    }

    /// Releases what `setup()` acquired.
    ///
    /// # Errors
    ///
    /// An error is reported for this condition if the case itself succeeded.
    fn tear_down(&mut self, _context: &mut InvocationContext) -> CaseResult {
        Ok(())
    }
}

/// Runs the lifecycle of `case` under `context`.
///
/// `tear_down()` runs after `run()` even if `run()` returns an error or panics. In that case the
/// error of `run()` is returned, or its panic resumed, once `tear_down()` has completed. If
/// `setup()` fails, neither `run()` nor `tear_down()` is called.
///
/// # Errors
///
/// Returns the first error of the lifecycle. Errors of this crate returned by the hooks are
/// returned as-is, any other error as [`Error::CaseFailed`].
///
/// # Panics
///
/// Resumes any panic of the lifecycle hooks.
pub fn execute(case: &mut dyn BenchmarkCase, context: &mut InvocationContext) -> Result<()> {
    context.set_state(CaseState::Setup);

    let setup_outcome = panic::catch_unwind(AssertUnwindSafe(|| case.setup(context)));

    match setup_outcome {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            context.set_state(CaseState::Done);
            return Err(from_case_error(error));
        }
        Err(payload) => {
            context.set_state(CaseState::Done);
            panic::resume_unwind(payload);
        }
    }

    context.set_state(CaseState::Running);

    let run_outcome = panic::catch_unwind(AssertUnwindSafe(|| case.run(context)));

    context.set_state(CaseState::TearingDown);

    let tear_down_result = case.tear_down(context);

    context.set_state(CaseState::Done);

    match run_outcome {
        Ok(Ok(())) => tear_down_result.map_err(from_case_error),
        Ok(Err(error)) => {
            if let Err(tear_down_error) = tear_down_result {
                warn!(%tear_down_error, "tear_down failed after run failed");
            }

            Err(from_case_error(error))
        }
        Err(payload) => {
            if let Err(tear_down_error) = tear_down_result {
                warn!(%tear_down_error, "tear_down failed after run panicked");
            }

            panic::resume_unwind(payload)
        }
    }
}

fn from_case_error(error: CaseError) -> Error {
    match error.downcast::<Error>() {
        Ok(error) => *error,
        Err(error) => Error::CaseFailed(error),
    }
}

/// A benchmark case made of a run closure and no fixture.
#[derive(derive_more::Debug)]
pub struct FnCase<F> {
    params: ParameterConfig,

    #[debug(ignore)]
    run: F,
}

impl<F> FnCase<F>
where
    F: FnMut(&mut InvocationContext) -> CaseResult + Send,
{
    /// Creates a case that runs `run` under every condition of `params`.
    #[must_use]
    pub fn new(params: ParameterConfig, run: F) -> Self {
        Self { params, run }
    }
}

impl<F> BenchmarkCase for FnCase<F>
where
    F: FnMut(&mut InvocationContext) -> CaseResult + Send,
{
    fn params(&self) -> Result<ParameterConfig> {
        Ok(self.params.clone())
    }

    fn run(&mut self, context: &mut InvocationContext) -> CaseResult {
        (self.run)(context)
    }
}

/// A benchmark case made of a [`Fixture`] and a run closure that receives it.
#[derive(derive_more::Debug)]
pub struct FixtureCase<X, F> {
    fixture: X,

    // Declared in addition to the parameters of the fixture.
    params: ParameterConfig,

    #[debug(ignore)]
    run: F,
}

impl<X, F> FixtureCase<X, F>
where
    X: Fixture,
    F: FnMut(&mut X, &mut InvocationContext) -> CaseResult + Send,
{
    /// Creates a case from a fixture, additional parameters and a run closure.
    #[must_use]
    pub fn new(fixture: X, params: ParameterConfig, run: F) -> Self {
        Self {
            fixture,
            params,
            run,
        }
    }
}

impl<X, F> BenchmarkCase for FixtureCase<X, F>
where
    X: Fixture,
    F: FnMut(&mut X, &mut InvocationContext) -> CaseResult + Send,
{
    fn params(&self) -> Result<ParameterConfig> {
        let mut params = ParameterConfig::new();
        self.fixture.declare_params(&mut params)?;

        for declaration in self.params.declarations() {
            params.add(declaration.name(), declaration.values().iter().cloned())?;
        }

        Ok(params)
    }

    fn setup(&mut self, context: &mut InvocationContext) -> CaseResult {
        self.fixture.setup(context)
    }

    fn run(&mut self, context: &mut InvocationContext) -> CaseResult {
        (self.run)(&mut self.fixture, context)
    }

    fn tear_down(&mut self, context: &mut InvocationContext) -> CaseResult {
        self.fixture.tear_down(context)
    }
}

/// Starts the declaration of a benchmark case.
///
/// # Examples
///
/// ```
/// use stat_harness::case;
///
/// let case = case("containers", "vec_push")
///     .param("size", [16, 256, 4096])
///     .threads([1, 2])
///     .run(|context| {
///         let size = context.param::<usize>("size")?;
///
///         context.measure(|_, _, _| {
///             let mut items = Vec::new();
///             items.extend(0..size);
///             items
///         })?;
///
///         Ok(())
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(case.name().to_string(), "containers/vec_push");
/// ```
#[must_use]
pub fn case(
    group: impl Into<BenchmarkGroupName>,
    name: impl Into<BenchmarkCaseName>,
) -> BenchmarkCaseBuilder {
    BenchmarkCaseBuilder {
        settings: CaseSettings {
            name: BenchmarkFullName::new(group, name),
            params: ParameterConfig::new(),
            measurement: None,
            error: None,
        },
    }
}

#[derive(Debug)]
struct CaseSettings {
    name: BenchmarkFullName,
    params: ParameterConfig,
    measurement: Option<MeasurementConfig>,

    // First declaration error, reported when the case is built.
    error: Option<Error>,
}

impl CaseSettings {
    fn param<V>(mut self, name: &str, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<ParameterValue>,
    {
        if let Err(error) = self.params.add(name, values) {
            self.error.get_or_insert(error);
        }

        self
    }

    fn threads(mut self, thread_counts: impl IntoIterator<Item = usize>) -> Self {
        if let Err(error) = self.params.add_threads(thread_counts) {
            self.error.get_or_insert(error);
        }

        self
    }

    fn into_definition(self, case: Box<dyn BenchmarkCase>) -> CaseDefinition {
        CaseDefinition {
            name: self.name,
            case,
            measurement: self.measurement,
            error: self.error,
        }
    }
}

/// Declares a benchmark case without a fixture. Created by [`case()`].
#[derive(Debug)]
#[must_use]
pub struct BenchmarkCaseBuilder {
    settings: CaseSettings,
}

impl BenchmarkCaseBuilder {
    /// Declares a parameter with the values it takes.
    ///
    /// Parameters declared later vary faster in the generated conditions.
    pub fn param<V>(self, name: &str, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<ParameterValue>,
    {
        Self {
            settings: self.settings.param(name, values),
        }
    }

    /// Replaces all parameter declarations made so far.
    pub fn params(mut self, params: ParameterConfig) -> Self {
        self.settings.params = params;
        self
    }

    /// Declares the thread counts to measure with.
    pub fn threads(self, thread_counts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            settings: self.settings.threads(thread_counts),
        }
    }

    /// Overrides the sizes of every measurement type of the group for this case.
    ///
    /// The measurement type name of `config` is ignored.
    pub fn measurement(mut self, config: MeasurementConfig) -> Self {
        self.settings.measurement = Some(config);
        self
    }

    /// Uses `fixture` for setup and teardown of every condition.
    pub fn fixture<X: Fixture>(self, fixture: X) -> FixtureCaseBuilder<X> {
        FixtureCaseBuilder {
            settings: self.settings,
            fixture,
        }
    }

    /// Completes the declaration with the code to run under every condition.
    pub fn run<F>(self, run: F) -> CaseDefinition
    where
        F: FnMut(&mut InvocationContext) -> CaseResult + Send + 'static,
    {
        let case = FnCase::new(self.settings.params.clone(), run);
        self.settings.into_definition(Box::new(case))
    }
}

/// Declares a benchmark case with a fixture. Created by [`BenchmarkCaseBuilder::fixture()`].
#[derive(derive_more::Debug)]
#[must_use]
pub struct FixtureCaseBuilder<X> {
    settings: CaseSettings,

    #[debug(ignore)]
    fixture: X,
}

impl<X: Fixture + 'static> FixtureCaseBuilder<X> {
    /// Declares a parameter in addition to those of the fixture.
    pub fn param<V>(self, name: &str, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<ParameterValue>,
    {
        Self {
            settings: self.settings.param(name, values),
            ..self
        }
    }

    /// Replaces all parameter declarations made on this builder so far.
    ///
    /// Parameters of the fixture are kept.
    pub fn params(mut self, params: ParameterConfig) -> Self {
        self.settings.params = params;
        self
    }

    /// Declares the thread counts to measure with.
    pub fn threads(self, thread_counts: impl IntoIterator<Item = usize>) -> Self {
        Self {
            settings: self.settings.threads(thread_counts),
            ..self
        }
    }

    /// Overrides the sizes of every measurement type of the group for this case.
    pub fn measurement(mut self, config: MeasurementConfig) -> Self {
        self.settings.measurement = Some(config);
        self
    }

    /// Completes the declaration with the code to run under every condition.
    pub fn run<F>(self, run: F) -> CaseDefinition
    where
        F: FnMut(&mut X, &mut InvocationContext) -> CaseResult + Send + 'static,
    {
        let case = FixtureCase::new(self.fixture, self.settings.params.clone(), run);
        self.settings.into_definition(Box::new(case))
    }
}

/// A fully declared benchmark case that is ready to be built or registered.
#[derive(derive_more::Debug)]
#[must_use]
pub struct CaseDefinition {
    name: BenchmarkFullName,

    #[debug(ignore)]
    case: Box<dyn BenchmarkCase>,

    measurement: Option<MeasurementConfig>,
    error: Option<Error>,
}

impl CaseDefinition {
    /// Validates the declaration and turns it into a case that can be added to a registry.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error, e.g. [`Error::DuplicateParameter`] or
    /// [`Error::InvalidMeasurementConfig`].
    pub fn build(self) -> Result<RegisteredCase> {
        if let Some(error) = self.error {
            return Err(error);
        }

        RegisteredCase::from_boxed(self.name, self.case, self.measurement)
    }

    /// Adds the case to the process-wide registry.
    ///
    /// Errors are not returned here. The first one is kept by the registry and reported when
    /// the benchmarks are run.
    pub fn register(self) {
        registry::register(self.build());
    }
}
