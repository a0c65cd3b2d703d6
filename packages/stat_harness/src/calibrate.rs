use std::time::Duration;

use tracing::debug;

use crate::Result;
use crate::stats::as_f64;

const TRIALS: usize = 10;

// Limits how much a single trial can grow the iteration count.
const MAX_GROWTH: f64 = 10.0;
const SAFETY_FACTOR: f64 = 1.2;

const MAX_ITERATIONS: f64 = 1e6;

// Stands in for a zero duration when calculating the growth.
const MIN_DURATION_SECS: f64 = 1e-9;

/// Number of iterations per sample needed for one sample to take at least `min_sample_duration`.
///
/// `trial` runs the case with the given iteration count and returns the duration of one sample.
/// The iteration count grows until one sample takes longer than `min_sample_duration` or the
/// trial budget is exhausted.
#[cfg_attr(test, mutants::skip)] // Mutated growth can run the trial loop with huge iteration counts.
pub(crate) fn determine_iterations(
    min_sample_duration: Duration,
    mut trial: impl FnMut(usize) -> Result<Duration>,
) -> Result<usize> {
    let min_secs = min_sample_duration.as_secs_f64();
    let mut iterations: usize = 1;

    for _ in 0..TRIALS {
        let duration_secs = trial(iterations)?.as_secs_f64();

        if duration_secs > min_secs {
            break;
        }

        let growth =
            (min_secs / duration_secs.max(MIN_DURATION_SECS)).min(MAX_GROWTH) * SAFETY_FACTOR;

        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "value is positive and capped at MAX_ITERATIONS"
        )]
        let next = (as_f64(iterations) * growth).ceil().min(MAX_ITERATIONS) as usize;

        iterations = next.max(1);
    }

    debug!(iterations, "calibrated iterations per sample");

    Ok(iterations)
}

/// Number of warm-up samples of `iterations` iterations each that together run at least
/// `min_warming_up_iterations` iterations and take at least `min_warming_up_duration`.
pub(crate) fn determine_warming_up_samples(
    iterations: usize,
    min_warming_up_iterations: usize,
    min_warming_up_duration: Duration,
    trial: impl FnMut(usize) -> Result<Duration>,
) -> Result<usize> {
    let warming_up_iterations =
        determine_iterations(min_warming_up_duration, trial)?.max(min_warming_up_iterations);

    let samples = warming_up_iterations.div_ceil(iterations.max(1));

    debug!(warming_up_iterations, samples, "calibrated warm-up samples");

    Ok(samples)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::Error;

    // Every iteration takes exactly `per_iteration`.
    fn linear(per_iteration: Duration) -> impl FnMut(usize) -> Result<Duration> {
        move |iterations| Ok(per_iteration.saturating_mul(u32::try_from(iterations).unwrap()))
    }

    #[test]
    fn slow_code_needs_one_iteration() {
        let iterations =
            determine_iterations(Duration::from_millis(30), linear(Duration::from_millis(50)))
                .unwrap();

        assert_eq!(iterations, 1);
    }

    #[test]
    fn fast_code_grows_until_long_enough() {
        let per_iteration = Duration::from_micros(100);
        let min = Duration::from_millis(30);

        let iterations = determine_iterations(min, linear(per_iteration)).unwrap();

        // 300 iterations would be exactly 30 ms; growth overshoots a little.
        assert!(iterations > 300, "{iterations}");
        assert!(iterations < 3_000, "{iterations}");
    }

    #[test]
    fn zero_durations_are_capped() {
        let mut trials = 0;

        let iterations = determine_iterations(Duration::from_millis(30), |_| {
            trials += 1;
            Ok(Duration::ZERO)
        })
        .unwrap();

        assert_eq!(trials, TRIALS);
        assert_eq!(iterations, 1_000_000);
    }

    #[test]
    fn trial_errors_are_propagated() {
        let result = determine_iterations(Duration::from_millis(30), |_| Err(Error::NoMeasurement));

        assert!(matches!(result, Err(Error::NoMeasurement)));
    }

    #[test]
    fn warm_up_rounds_up_to_whole_samples() {
        // Slow code: a single iteration is enough for the duration, so the minimum count rules.
        let samples = determine_warming_up_samples(
            4,
            10,
            Duration::from_millis(1),
            linear(Duration::from_millis(5)),
        )
        .unwrap();

        assert_eq!(samples, 3);
    }

    #[test]
    fn warm_up_of_one_iteration() {
        let samples = determine_warming_up_samples(
            100,
            1,
            Duration::from_millis(1),
            linear(Duration::from_millis(5)),
        )
        .unwrap();

        assert_eq!(samples, 1);
    }
}
