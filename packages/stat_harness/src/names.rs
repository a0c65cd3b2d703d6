use std::fmt;
use std::sync::Arc;

/// Name of a benchmark group.
///
/// Names may contain arbitrary Unicode text. Escaping for use in file paths is the
/// responsibility of whatever writes report files.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, derive_more::Display)]
pub struct BenchmarkGroupName(Arc<str>);

impl BenchmarkGroupName {
    /// Creates a group name from any string-like value.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BenchmarkGroupName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BenchmarkGroupName {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Name of a benchmark case, unique within its group.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, derive_more::Display)]
pub struct BenchmarkCaseName(Arc<str>);

impl BenchmarkCaseName {
    /// Creates a case name from any string-like value.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BenchmarkCaseName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BenchmarkCaseName {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// The (group, case) pair that identifies a benchmark case.
///
/// Ordering is lexicographic on the group name first and the case name second. The display
/// form is `group/case`, which is also what name filters match against.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BenchmarkFullName {
    group: BenchmarkGroupName,
    case: BenchmarkCaseName,
}

impl BenchmarkFullName {
    /// Combines a group name and a case name.
    #[must_use]
    pub fn new(group: impl Into<BenchmarkGroupName>, case: impl Into<BenchmarkCaseName>) -> Self {
        Self {
            group: group.into(),
            case: case.into(),
        }
    }

    /// The group part of the name.
    #[must_use]
    pub fn group(&self) -> &BenchmarkGroupName {
        &self.group
    }

    /// The case part of the name.
    #[must_use]
    pub fn case(&self) -> &BenchmarkCaseName {
        &self.case
    }
}

impl fmt::Display for BenchmarkFullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.case)
    }
}
