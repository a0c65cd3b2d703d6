use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    BenchmarkCase, BenchmarkFullName, BenchmarkGroupName, Error, GroupConfig, MeasurementConfig,
    ParameterConfig, Result,
};

/// A benchmark case together with its name and validated declarations.
#[derive(derive_more::Debug)]
pub struct RegisteredCase {
    name: BenchmarkFullName,

    #[debug(ignore)]
    case: Box<dyn BenchmarkCase>,

    params: ParameterConfig,
    measurement: Option<MeasurementConfig>,
}

impl RegisteredCase {
    /// Wraps a case that implements [`BenchmarkCase`] directly.
    ///
    /// # Errors
    ///
    /// Returns the error of [`BenchmarkCase::params()`] if the declarations are invalid.
    pub fn new(name: BenchmarkFullName, case: impl BenchmarkCase + 'static) -> Result<Self> {
        Self::from_boxed(name, Box::new(case), None)
    }

    pub(crate) fn from_boxed(
        name: BenchmarkFullName,
        case: Box<dyn BenchmarkCase>,
        measurement: Option<MeasurementConfig>,
    ) -> Result<Self> {
        let params = case.params()?;

        if let Some(measurement) = &measurement {
            measurement.validate()?;
        }

        Ok(Self {
            name,
            case,
            params,
            measurement,
        })
    }

    /// Full name of the case.
    #[must_use]
    pub fn name(&self) -> &BenchmarkFullName {
        &self.name
    }

    /// Parameter declarations of the case.
    #[must_use]
    pub fn params(&self) -> &ParameterConfig {
        &self.params
    }

    /// Case-level size overrides, applied on top of every measurement type of the group.
    #[must_use]
    pub fn measurement(&self) -> Option<&MeasurementConfig> {
        self.measurement.as_ref()
    }

    pub(crate) fn case_mut(&mut self) -> &mut dyn BenchmarkCase {
        self.case.as_mut()
    }
}

/// A named group of benchmark cases that share a configuration.
#[derive(Debug)]
pub struct BenchmarkGroup {
    name: BenchmarkGroupName,
    config: GroupConfig,

    // Registration order.
    cases: Vec<RegisteredCase>,
}

impl BenchmarkGroup {
    fn new(name: BenchmarkGroupName) -> Self {
        Self {
            name,
            config: GroupConfig::default(),
            cases: Vec::new(),
        }
    }

    /// Name of the group.
    #[must_use]
    pub fn name(&self) -> &BenchmarkGroupName {
        &self.name
    }

    /// Configuration shared by all cases of the group.
    #[must_use]
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// The cases, in registration order.
    #[must_use]
    pub fn cases(&self) -> &[RegisteredCase] {
        &self.cases
    }

    pub(crate) fn cases_mut(&mut self) -> &mut [RegisteredCase] {
        &mut self.cases
    }
}

/// Collection of benchmark groups, sorted by group name.
///
/// Registration errors can either be returned directly by [`add()`][Self::add] or kept for
/// later with [`record()`][Self::record], which is what the process-wide registry does so that
/// registration sites do not have to handle errors.
///
/// # Examples
///
/// ```
/// use stat_harness::{BenchmarkCaseRegistry, case};
///
/// let mut registry = BenchmarkCaseRegistry::new();
///
/// registry
///     .add(case("b", "first").run(|_| Ok(())).build().unwrap())
///     .unwrap();
/// registry
///     .add(case("a", "second").run(|_| Ok(())).build().unwrap())
///     .unwrap();
///
/// let groups = registry
///     .groups()
///     .iter()
///     .map(|group| group.name().as_str())
///     .collect::<Vec<_>>();
///
/// assert_eq!(groups, ["a", "b"]);
/// ```
#[derive(Debug, Default)]
pub struct BenchmarkCaseRegistry {
    groups: Vec<BenchmarkGroup>,

    // First error recorded by `record()`.
    deferred_error: Option<Error>,
}

impl BenchmarkCaseRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            groups: Vec::new(),
            deferred_error: None,
        }
    }

    /// Adds a case to its group, creating the group if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateCase`] if the group already has a case with the same name.
    pub fn add(&mut self, case: RegisteredCase) -> Result<()> {
        let group = self.group_entry(case.name().group());

        if group
            .cases
            .iter()
            .any(|existing| existing.name().case() == case.name().case())
        {
            return Err(Error::DuplicateCase {
                name: case.name().clone(),
            });
        }

        group.cases.push(case);
        Ok(())
    }

    /// Adds a case or keeps the error for [`check()`][Self::check].
    ///
    /// Only the first error is kept.
    pub fn record(&mut self, case: Result<RegisteredCase>) {
        if let Err(error) = case.and_then(|case| self.add(case)) {
            self.deferred_error.get_or_insert(error);
        }
    }

    /// Returns the first error kept by [`record()`][Self::record], if any.
    ///
    /// # Errors
    ///
    /// Returns the kept error. The error is removed from the registry.
    pub fn check(&mut self) -> Result<()> {
        match self.deferred_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Sets the configuration of a group, creating the group if needed.
    ///
    /// Cases that are added later keep using this configuration.
    pub fn configure_group(&mut self, group: impl Into<BenchmarkGroupName>, config: GroupConfig) {
        self.group_entry(&group.into()).config = config;
    }

    /// The group with the given name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&BenchmarkGroup> {
        self.groups
            .binary_search_by(|group| group.name().as_str().cmp(name))
            .ok()
            .and_then(|index| self.groups.get(index))
    }

    /// The groups, sorted by name.
    #[must_use]
    pub fn groups(&self) -> &[BenchmarkGroup] {
        &self.groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut [BenchmarkGroup] {
        &mut self.groups
    }

    /// Total number of registered cases.
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.groups.iter().map(|group| group.cases.len()).sum()
    }

    /// Whether no case is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.case_count() == 0
    }

    /// Removes all groups, cases and the kept error.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.deferred_error = None;
    }

    fn group_entry(&mut self, name: &BenchmarkGroupName) -> &mut BenchmarkGroup {
        let index = match self.groups.binary_search_by(|group| group.name.cmp(name)) {
            Ok(index) => index,
            Err(index) => {
                self.groups.insert(index, BenchmarkGroup::new(name.clone()));
                index
            }
        };

        #[expect(
            clippy::indexing_slicing,
            reason = "index was found or inserted just above"
        )]
        &mut self.groups[index]
    }
}

static GLOBAL_REGISTRY: Mutex<BenchmarkCaseRegistry> = Mutex::new(BenchmarkCaseRegistry::new());

fn global() -> MutexGuard<'static, BenchmarkCaseRegistry> {
    // Registry operations do not panic while holding the lock.
    GLOBAL_REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn register(case: Result<RegisteredCase>) {
    global().record(case);
}

/// Sets the configuration of a group in the process-wide registry.
pub fn configure_global_group(group: impl Into<BenchmarkGroupName>, config: GroupConfig) {
    global().configure_group(group, config);
}

/// Takes everything out of the process-wide registry, leaving it empty.
///
/// The runner calls this to run all registered cases.
#[must_use]
pub fn take_global_registry() -> BenchmarkCaseRegistry {
    mem::take(&mut *global())
}

/// Clears the process-wide registry, including any kept registration error.
pub fn reset_global_registry() {
    global().clear();
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{MEAN_PROCESSING_TIME, MeasurementConfig, case};

    assert_impl_all!(BenchmarkCaseRegistry: Send);
    assert_impl_all!(RegisteredCase: Send);

    fn noop(group: &str, name: &str) -> RegisteredCase {
        case(group, name).run(|_| Ok(())).build().unwrap()
    }

    #[test]
    fn groups_are_sorted_and_cases_keep_order() {
        let mut registry = BenchmarkCaseRegistry::new();

        registry.add(noop("zeta", "b")).unwrap();
        registry.add(noop("alpha", "z")).unwrap();
        registry.add(noop("zeta", "a")).unwrap();
        registry.add(noop("mid", "x")).unwrap();

        let groups = registry
            .groups()
            .iter()
            .map(|group| group.name().as_str())
            .collect::<Vec<_>>();
        assert_eq!(groups, ["alpha", "mid", "zeta"]);

        let zeta_cases = registry
            .group("zeta")
            .unwrap()
            .cases()
            .iter()
            .map(|case| case.name().case().as_str())
            .collect::<Vec<_>>();
        assert_eq!(zeta_cases, ["b", "a"]);

        assert_eq!(registry.case_count(), 4);
        assert!(registry.group("missing").is_none());
    }

    #[test]
    fn duplicate_case_is_rejected() {
        let mut registry = BenchmarkCaseRegistry::new();

        registry.add(noop("g", "c")).unwrap();

        assert!(matches!(
            registry.add(noop("g", "c")),
            Err(Error::DuplicateCase { .. })
        ));

        // The same case name in another group is fine.
        registry.add(noop("h", "c")).unwrap();
        assert_eq!(registry.case_count(), 2);
    }

    #[test]
    fn first_recorded_error_wins() {
        let mut registry = BenchmarkCaseRegistry::new();

        registry.record(Ok(noop("g", "c")));
        registry.record(Ok(noop("g", "c")));
        registry.record(Err(Error::NoSamples));

        assert!(matches!(registry.check(), Err(Error::DuplicateCase { .. })));

        // The error is reported once.
        registry.check().unwrap();
        assert_eq!(registry.case_count(), 1);
    }

    #[test]
    fn group_configuration_survives_later_cases() {
        let mut registry = BenchmarkCaseRegistry::new();

        let mut config = GroupConfig::empty();
        config
            .add_measurement(MeasurementConfig::mean_processing_time())
            .unwrap();

        registry.configure_group("g", config);
        registry.add(noop("g", "c")).unwrap();

        let group = registry.group("g").unwrap();
        assert_eq!(group.config().measurements().len(), 1);
        assert_eq!(
            group.config().measurements()[0].measurement_type(),
            MEAN_PROCESSING_TIME
        );
        assert_eq!(group.cases().len(), 1);
    }

    #[test]
    fn clear_removes_everything() {
        let mut registry = BenchmarkCaseRegistry::new();

        registry.record(Ok(noop("g", "c")));
        registry.record(Err(Error::NoSamples));
        registry.clear();

        assert!(registry.is_empty());
        registry.check().unwrap();
    }
}
