use std::fmt;
use std::num::NonZero;

use crate::{Error, ParameterDict, Result, THREADS_PARAMETER_NAME};

/// One concrete point under which a benchmark case is measured: a thread count
/// plus one value for every declared parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkCondition {
    threads: NonZero<usize>,
    params: ParameterDict,
}

impl BenchmarkCondition {
    /// Creates a condition with an explicit thread count.
    #[must_use]
    pub fn new(threads: NonZero<usize>, params: ParameterDict) -> Self {
        Self { threads, params }
    }

    /// Creates a condition from generated parameters.
    ///
    /// The thread count is taken from the reserved `threads` parameter if it is present,
    /// otherwise `default_threads` is used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThreadCount`] if the `threads` parameter is not a positive integer.
    pub fn from_params(params: ParameterDict, default_threads: NonZero<usize>) -> Result<Self> {
        let threads = if params.contains(THREADS_PARAMETER_NAME) {
            let threads = params
                .get::<usize>(THREADS_PARAMETER_NAME)
                .map_err(|error| Error::InvalidThreadCount {
                    problem: error.to_string(),
                })?;

            NonZero::new(threads).ok_or_else(|| Error::InvalidThreadCount {
                problem: "the number of threads must be at least one".to_string(),
            })?
        } else {
            default_threads
        };

        Ok(Self { threads, params })
    }

    /// Number of threads that measure concurrently under this condition.
    #[must_use]
    pub fn threads(&self) -> NonZero<usize> {
        self.threads
    }

    /// The parameter values of this condition.
    #[must_use]
    pub fn params(&self) -> &ParameterDict {
        &self.params
    }
}

impl fmt::Display for BenchmarkCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.contains(THREADS_PARAMETER_NAME) {
            write!(f, "{}", self.params)
        } else if self.params.is_empty() {
            write!(f, "threads={}", self.threads)
        } else {
            write!(f, "{} (threads={})", self.params, self.threads)
        }
    }
}
