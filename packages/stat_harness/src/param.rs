use std::fmt;

use itertools::Itertools;

use crate::{Error, Result};

/// Name of the reserved parameter that sets the number of measuring threads of a condition.
pub const THREADS_PARAMETER_NAME: &str = "threads";

/// A single parameter value under which a benchmark case runs.
///
/// Values are copied into every [`ParameterDict`] that uses them.
#[derive(Clone, Debug, PartialEq, derive_more::Display)]
#[non_exhaustive]
pub enum ParameterValue {
    /// An integer value.
    Int(i64),

    /// A floating point value.
    Float(f64),

    /// A string value.
    Text(String),

    /// A boolean value.
    Bool(bool),
}

impl ParameterValue {
    /// Human-readable name of the value's type, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
            Self::Bool(_) => "boolean",
        }
    }

    /// The value as a floating point number, for numeric values only.
    ///
    /// Consumers that plot results against parameter values use this to place points on an axis.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "plotting does not need integers beyond 2^53 to be exact"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) | Self::Bool(_) => None,
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ParameterValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for ParameterValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u64> for ParameterValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Types that can be extracted from a [`ParameterValue`] by typed parameter lookup.
pub trait FromParameterValue: Sized {
    /// Name of the type, used in diagnostics.
    const TYPE_NAME: &'static str;

    /// Extracts the value, or returns `None` if the value has an incompatible type or range.
    fn from_parameter_value(value: &ParameterValue) -> Option<Self>;
}

macro_rules! integer_from_parameter_value {
    ($($t:ty),+) => {
        $(
            impl FromParameterValue for $t {
                const TYPE_NAME: &'static str = stringify!($t);

                fn from_parameter_value(value: &ParameterValue) -> Option<Self> {
                    match value {
                        ParameterValue::Int(value) => Self::try_from(*value).ok(),
                        _ => None,
                    }
                }
            }
        )+
    };
}

integer_from_parameter_value!(i64, i32, u32, u64, usize);

impl FromParameterValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_parameter_value(value: &ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromParameterValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_parameter_value(value: &ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromParameterValue for String {
    const TYPE_NAME: &'static str = "String";

    fn from_parameter_value(value: &ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Text(value) => Some(value.clone()),
            _ => None,
        }
    }
}

/// Ordered mapping from parameter name to the value chosen for one condition.
///
/// Iteration order is the order in which the parameters were declared.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterDict {
    entries: Vec<(String, ParameterValue)>,
}

impl ParameterDict {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary from (name, value) pairs, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateParameter`] if a name occurs more than once.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Result<Self>
    where
        N: Into<String>,
        V: Into<ParameterValue>,
    {
        let mut dict = Self::new();

        for (name, value) in pairs {
            dict.insert(name.into(), value.into())?;
        }

        Ok(dict)
    }

    fn insert(&mut self, name: String, value: ParameterValue) -> Result<()> {
        if self.contains(&name) {
            return Err(Error::DuplicateParameter { name });
        }

        self.entries.push((name, value));
        Ok(())
    }

    /// Whether a parameter with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    /// The raw value of a parameter.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find_map(|(entry_name, value)| (entry_name == name).then_some(value))
    }

    /// The value of a parameter converted to the requested type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] if there is no parameter with this name and
    /// [`Error::ParameterTypeMismatch`] if the value cannot be converted to `T`.
    pub fn get<T: FromParameterValue>(&self, name: &str) -> Result<T> {
        let value = self.value(name).ok_or_else(|| Error::UnknownParameter {
            name: name.to_string(),
        })?;

        T::from_parameter_value(value).ok_or_else(|| Error::ParameterTypeMismatch {
            name: name.to_string(),
            expected: T::TYPE_NAME,
            actual: value.type_name(),
        })
    }

    /// Iterates over (name, value) pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ParameterDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }

            write!(f, "{name}={value}")?;
        }

        Ok(())
    }
}

/// One declared parameter: a name and the ordered list of values to measure with.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterDeclaration {
    name: String,
    values: Vec<ParameterValue>,
}

impl ParameterDeclaration {
    /// Name of the parameter.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The values, in declaration order.
    #[must_use]
    pub fn values(&self) -> &[ParameterValue] {
        &self.values
    }
}

/// The parameters declared by a benchmark case, in declaration order.
///
/// The conditions of a case are the Cartesian product of all declared value lists.
///
/// # Examples
///
/// ```
/// use stat_harness::ParameterConfig;
///
/// let mut params = ParameterConfig::new();
/// params.add("size", [1, 10, 100]).unwrap();
/// params.add("sorted", [false, true]).unwrap();
///
/// let dicts = params.generate();
/// assert_eq!(dicts.len(), 6);
/// assert_eq!(dicts[0].to_string(), "size=1, sorted=false");
/// assert_eq!(dicts[1].to_string(), "size=1, sorted=true");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterConfig {
    declarations: Vec<ParameterDeclaration>,
}

impl ParameterConfig {
    /// Creates a configuration without any declared parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a parameter with the values to measure with.
    ///
    /// An empty value list is accepted but means the case has no conditions to run under.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateParameter`] if a parameter with this name was already declared.
    pub fn add<V>(
        &mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<()>
    where
        V: Into<ParameterValue>,
    {
        let name = name.into();

        if self.contains(&name) {
            return Err(Error::DuplicateParameter { name });
        }

        self.declarations.push(ParameterDeclaration {
            name,
            values: values.into_iter().map(Into::into).collect(),
        });

        Ok(())
    }

    /// Declares the reserved `threads` parameter with the thread counts to measure with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateParameter`] if thread counts were already declared.
    pub fn add_threads(&mut self, thread_counts: impl IntoIterator<Item = usize>) -> Result<()> {
        self.add(THREADS_PARAMETER_NAME, thread_counts)
    }

    /// Whether a parameter with this name is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.declarations
            .iter()
            .any(|declaration| declaration.name == name)
    }

    /// The declarations, in declaration order.
    #[must_use]
    pub fn declarations(&self) -> &[ParameterDeclaration] {
        &self.declarations
    }

    /// Generates one dictionary per point of the Cartesian product of all declared value lists.
    ///
    /// The last declared parameter varies fastest. Without declarations this is a single empty
    /// dictionary; if any declared value list is empty, this is empty.
    #[must_use]
    pub fn generate(&self) -> Vec<ParameterDict> {
        if self.declarations.is_empty() {
            return vec![ParameterDict::new()];
        }

        if self
            .declarations
            .iter()
            .any(|declaration| declaration.values.is_empty())
        {
            return Vec::new();
        }

        self.declarations
            .iter()
            .map(|declaration| declaration.values.iter())
            .multi_cartesian_product()
            .map(|values| ParameterDict {
                entries: self
                    .declarations
                    .iter()
                    .map(|declaration| declaration.name.clone())
                    .zip(values.into_iter().cloned())
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]

    use super::*;

    #[test]
    fn typed_lookup() {
        let dict = ParameterDict::from_pairs([
            ("size", ParameterValue::from(64)),
            ("ratio", ParameterValue::from(0.5)),
            ("label", ParameterValue::from("vec")),
            ("sorted", ParameterValue::from(true)),
        ])
        .unwrap();

        assert_eq!(dict.get::<usize>("size").unwrap(), 64);
        assert_eq!(dict.get::<i64>("size").unwrap(), 64);
        assert!(dict.get::<f64>("ratio").unwrap() > 0.49);
        assert_eq!(dict.get::<String>("label").unwrap(), "vec");
        assert!(dict.get::<bool>("sorted").unwrap());
    }

    #[test]
    fn unknown_parameter_is_error() {
        let dict = ParameterDict::new();

        assert!(matches!(
            dict.get::<i64>("missing"),
            Err(Error::UnknownParameter { name }) if name == "missing"
        ));
    }

    #[test]
    fn wrong_type_is_error() {
        let dict = ParameterDict::from_pairs([("label", "abc")]).unwrap();

        assert!(matches!(
            dict.get::<i64>("label"),
            Err(Error::ParameterTypeMismatch {
                expected: "i64",
                actual: "string",
                ..
            })
        ));
    }

    #[test]
    fn negative_integer_is_not_usize() {
        let dict = ParameterDict::from_pairs([("offset", -1)]).unwrap();

        assert!(matches!(
            dict.get::<usize>("offset"),
            Err(Error::ParameterTypeMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        assert!(matches!(
            ParameterDict::from_pairs([("a", 1), ("a", 2)]),
            Err(Error::DuplicateParameter { .. })
        ));

        let mut config = ParameterConfig::new();
        config.add("a", [1]).unwrap();
        assert!(matches!(
            config.add("a", [2]),
            Err(Error::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn display_keeps_declaration_order() {
        let dict = ParameterDict::from_pairs([("z", 1), ("a", 2)]).unwrap();
        assert_eq!(dict.to_string(), "z=1, a=2");
    }

    #[test]
    fn no_declarations_gives_one_empty_condition() {
        let dicts = ParameterConfig::new().generate();

        assert_eq!(dicts.len(), 1);
        assert!(dicts[0].is_empty());
    }

    #[test]
    fn empty_value_list_gives_no_conditions() {
        let mut config = ParameterConfig::new();
        config.add("size", [1, 2]).unwrap();
        config.add::<i64>("empty", []).unwrap();

        assert!(config.generate().is_empty());
    }

    #[test]
    fn cartesian_product_of_two_by_three() {
        let mut config = ParameterConfig::new();
        config.add("size", [1, 2, 3]).unwrap();
        config.add("kind", ["a", "b", "c"]).unwrap();

        let dicts = config.generate();
        assert_eq!(dicts.len(), 9);

        for (i, dict) in dicts.iter().enumerate() {
            assert_eq!(dict.len(), 2);

            for other in &dicts[i + 1..] {
                assert_ne!(dict, other);
            }
        }

        // The last declared parameter varies fastest.
        assert_eq!(dicts[0].to_string(), "size=1, kind=a");
        assert_eq!(dicts[1].to_string(), "size=1, kind=b");
        assert_eq!(dicts[3].to_string(), "size=2, kind=a");
        assert_eq!(dicts[8].to_string(), "size=3, kind=c");
    }

    #[test]
    fn numeric_values_convert_to_f64() {
        assert_eq!(ParameterValue::from(3).as_f64(), Some(3.0));
        assert_eq!(ParameterValue::from("x").as_f64(), None);
    }
}
