//! Measures a few container operations with the default measurement types and prints the report.
//!
//! The harness logs progress through `tracing`, printed here by a plain `fmt` subscriber.

use std::collections::{BTreeMap, HashMap};
use std::hint::black_box;

use stat_harness::{Runner, RunnerConfig, case};
use tracing::Level;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    case("containers", "vec_push")
        .param("size", [16, 1024])
        .run(|context| {
            let size = context.param::<usize>("size")?;

            context.measure(|_, _, _| {
                let mut items = Vec::new();
                for i in 0..size {
                    items.push(black_box(i));
                }
                items
            })?;

            Ok(())
        })
        .register();

    case("containers", "hash_map_insert")
        .param("size", [16, 1024])
        .run(|context| {
            let size = context.param::<usize>("size")?;

            context.measure(|_, _, _| {
                let mut map = HashMap::new();
                for i in 0..size {
                    map.insert(black_box(i), i);
                }
                map
            })?;

            Ok(())
        })
        .register();

    case("containers", "btree_map_insert")
        .param("size", [16, 1024])
        .run(|context| {
            let size = context.param::<usize>("size")?;

            context.measure(|_, _, _| {
                let mut map = BTreeMap::new();
                for i in 0..size {
                    map.insert(black_box(i), i);
                }
                map
            })?;

            Ok(())
        })
        .register();

    let report = Runner::new(RunnerConfig::new()).run_registered()?;
    println!("{report}");

    Ok(())
}
