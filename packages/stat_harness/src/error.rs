use std::io;

use thiserror::Error;

use crate::{BenchmarkFullName, CaseError};

/// Errors that can occur when registering, configuring or executing benchmarks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Two cases with the same group and case name were registered.
    #[error("duplicate benchmark case '{name}'")]
    DuplicateCase {
        /// Full name of the case that was registered twice.
        name: BenchmarkFullName,
    },

    /// A case declared the same parameter name more than once.
    #[error("parameter '{name}' is declared more than once")]
    DuplicateParameter {
        /// The repeated parameter name.
        name: String,
    },

    /// A group was given two measurement configurations with the same type name.
    #[error("duplicate measurement type '{name}' in a group")]
    DuplicateMeasurementType {
        /// The repeated measurement type name.
        name: String,
    },

    /// A barrier was requested for fewer than two threads.
    #[error("a sync barrier needs at least 2 waiting threads but {requested} were requested")]
    InvalidBarrierSize {
        /// The requested number of waiting threads.
        requested: usize,
    },

    /// Measurement sizes (iterations, samples, warm-up samples) are inconsistent.
    #[error("invalid measurement configuration: {problem}")]
    InvalidMeasurementConfig {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// A name filter pattern is not a valid regular expression.
    #[error("invalid regular expression '{pattern}'")]
    InvalidRegex {
        /// The pattern as given.
        pattern: String,

        /// What is wrong with the pattern.
        #[source]
        source: regex::Error,
    },

        /// The thread count of a condition could not be determined.
    #[error("invalid thread count: {problem}")]
    InvalidThreadCount {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// Benchmark code asked for a parameter that the condition does not contain.
    #[error("parameter '{name}' not found")]
    UnknownParameter {
        /// The requested parameter name.
        name: String,
    },

    /// Benchmark code asked for a parameter as a different type than it was declared with.
    #[error("parameter '{name}' is {actual}, not {expected}")]
    ParameterTypeMismatch {
        /// The requested parameter name.
        name: String,

        /// The type the caller asked for.
        expected: &'static str,

        /// The type the value actually has.
        actual: &'static str,
    },

    /// A custom statistic was requested again with a different aggregation type.
    #[error("custom stat '{name}' already exists with a different aggregation type")]
    ConflictingCustomStat {
        /// Name of the custom statistic.
        name: String,
    },

    /// The measured closure panicked on one of the measuring threads.
    #[error("measurement failed on thread {thread_index} in sample {sample_index}: {message}")]
    MeasurementFailed {
        /// Index of the thread on which the failure happened.
        thread_index: usize,

        /// Index of the sample (warm-up samples included) in which the failure happened.
        sample_index: usize,

        /// The panic message, if it could be extracted.
        message: String,
    },

    /// A lifecycle hook of a benchmark case returned an error.
    #[error("benchmark case failed: {0}")]
    CaseFailed(#[source] CaseError),

    /// A lifecycle hook of a benchmark case panicked.
    #[error("benchmark case panicked: {message}")]
    CasePanicked {
        /// The panic message, if it could be extracted.
        message: String,
    },

    /// A benchmark case finished without ever calling `measure()`.
    #[error("no measurement was done")]
    NoMeasurement,

    /// Statistics were requested for an empty series.
    #[error("no samples available for statistics")]
    NoSamples,

    /// A measuring thread could not be started.
    #[error("failed to spawn measuring thread: {0}")]
    ThreadSpawn(#[source] io::Error),
}

/// A specialized `Result` type for benchmark harness operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{BenchmarkCaseName, BenchmarkGroupName};

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn duplicate_case_names_offender() {
        let error = Error::DuplicateCase {
            name: BenchmarkFullName::new(
                BenchmarkGroupName::new("containers"),
                BenchmarkCaseName::new("vec_push"),
            ),
        };

        assert_eq!(
            error.to_string(),
            "duplicate benchmark case 'containers/vec_push'"
        );
    }

    #[test]
    fn measurement_failure_names_slot() {
        let error = Error::MeasurementFailed {
            thread_index: 2,
            sample_index: 7,
            message: "boom".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "measurement failed on thread 2 in sample 7: boom"
        );
    }
}
