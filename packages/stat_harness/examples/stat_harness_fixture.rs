//! Shares setup and teardown between cases with a fixture, and measures on several threads.

use std::sync::atomic::{AtomicU64, Ordering};

use new_zealand::nz;
use stat_harness::{
    CaseResult, Fixture, InvocationContext, ParameterConfig, Runner, RunnerConfig, case,
};

/// A buffer of numbers, filled before each condition and released afterwards.
#[derive(Debug, Default)]
struct Numbers {
    values: Vec<u64>,
}

impl Fixture for Numbers {
    fn declare_params(&self, params: &mut ParameterConfig) -> stat_harness::Result<()> {
        params.add("len", [1_000, 100_000])
    }

    fn setup(&mut self, context: &mut InvocationContext) -> CaseResult {
        let len = context.param::<u64>("len")?;
        self.values = (0..len).collect();
        Ok(())
    }

    fn tear_down(&mut self, _context: &mut InvocationContext) -> CaseResult {
        self.values = Vec::new();
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    case("numbers", "sum")
        .fixture(Numbers::default())
        .threads([1, 2, 4])
        .run(|numbers, context| {
            let values = &numbers.values;
            context.measure(|_, _, _| values.iter().sum::<u64>())?;
            Ok(())
        })
        .register();

    // A single counter contended by all threads.
    let shared = AtomicU64::new(0);

    case("numbers", "contended_add")
        .fixture(Numbers::default())
        .threads([1, 2, 4])
        .run(move |numbers, context| {
            let shared = &shared;
            let last = numbers.values.last().copied().unwrap_or_default();

            context.measure(|_, _, _| shared.fetch_add(last, Ordering::Relaxed))?;

            Ok(())
        })
        .register();

    let config = RunnerConfig::new().samples(nz!(20));
    let report = Runner::new(config).run_registered()?;
    println!("{report}");

    Ok(())
}
