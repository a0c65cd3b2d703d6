use std::fmt::{self, Display};

use crate::ResultRecord;

const MILLIS_PER_SEC: f64 = 1e3;
const LABEL_WIDTH: usize = 40;
const COLUMN_WIDTH: usize = 12;
const TABLE_WIDTH: usize = LABEL_WIDTH + 4 * COLUMN_WIDTH;

/// The outcome of a benchmark run: one record per measured (measurement type, case, condition)
/// plus warnings about cases that were skipped.
///
/// The [`Display`] implementation renders a plain-text table for terminals:
///
/// ```text
/// ## Processing Time
///
/// ### containers
///
///                                           Iterations     Samples   Mean [ms]    Max [ms]
/// ----------------------------------------------------------------------------------------
/// vec_push (size=16)                                 1          30       0.001       0.004
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    records: Vec<ResultRecord>,
    warnings: Vec<String>,
}

impl Report {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_record(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    pub(crate) fn push_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// All records, in the order they were measured.
    #[must_use]
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Records of measurements that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ResultRecord> {
        self.records
            .iter()
            .filter(|record| record.failure().is_some())
    }

    /// Warnings about cases that were skipped.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether every measurement succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current_type: Option<&str> = None;
        let mut current_group: Option<&str> = None;

        for record in &self.records {
            if current_type != Some(record.measurement_type()) {
                if current_type.is_some() {
                    writeln!(f)?;
                }

                writeln!(f, "## {}", record.measurement_type())?;
                writeln!(f)?;

                current_type = Some(record.measurement_type());
                current_group = None;
            }

            let group = record.name().group().as_str();

            if current_group != Some(group) {
                if current_group.is_some() {
                    writeln!(f)?;
                }

                writeln!(f, "### {group}")?;
                writeln!(f)?;
                writeln!(
                    f,
                    "{:<LABEL_WIDTH$}{:>COLUMN_WIDTH$}{:>COLUMN_WIDTH$}{:>COLUMN_WIDTH$}{:>COLUMN_WIDTH$}",
                    "", "Iterations", "Samples", "Mean [ms]", "Max [ms]"
                )?;
                writeln!(f, "{:-<TABLE_WIDTH$}", "")?;

                current_group = Some(group);
            }

            let label = format!("{} ({})", record.name().case(), record.condition());

            match (record.measurement(), record.sizes()) {
                (Some(measurement), Some(sizes)) => {
                    let stats = measurement.duration_stats();

                    writeln!(
                        f,
                        "{label:<LABEL_WIDTH$}{:>COLUMN_WIDTH$}{:>COLUMN_WIDTH$}{:>COLUMN_WIDTH$.3}{:>COLUMN_WIDTH$.3}",
                        sizes.iterations(),
                        sizes.measured_samples(),
                        stats.mean() * MILLIS_PER_SEC,
                        stats.max() * MILLIS_PER_SEC,
                    )?;
                }
                _ => {
                    let message = record.failure().unwrap_or("no measurement");
                    writeln!(f, "{label:<LABEL_WIDTH$}FAILED: {message}")?;
                }
            }
        }

        if !self.warnings.is_empty() {
            if !self.records.is_empty() {
                writeln!(f)?;
            }

            for warning in &self.warnings {
                writeln!(f, "WARNING: {warning}")?;
            }
        }

        Ok(())
    }
}
