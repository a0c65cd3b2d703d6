#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Micro-benchmark harness with grouped cases, parameterized conditions, synchronized
//! multithreaded sampling and statistical reports.
//!
//! Benchmark cases are organized into groups. Each case declares parameters with lists of
//! values; the harness measures the case once for every combination of values (a
//! [`BenchmarkCondition`]). A measurement consists of samples, each of which times a number of
//! iterations of the measured code. The first samples warm up caches and are not recorded.
//!
//! # Declaring cases
//!
//! Cases are declared with [`case()`] and either added to a [`BenchmarkCaseRegistry`] or
//! registered in the process-wide registry with [`CaseDefinition::register()`].
//!
//! ```
//! use stat_harness::{BenchmarkCaseRegistry, Runner, RunnerConfig, MeasurementConfig, case};
//!
//! let mut registry = BenchmarkCaseRegistry::new();
//!
//! registry
//!     .add(
//!         case("containers", "vec_push")
//!             .param("size", [16, 256])
//!             .measurement(MeasurementConfig::new("").iterations(10).samples(5))
//!             .run(|context| {
//!                 let size = context.param::<usize>("size")?;
//!
//!                 context.measure(|_, _, _| {
//!                     let mut items = Vec::new();
//!                     for i in 0..size {
//!                         items.push(i);
//!                     }
//!                     items
//!                 })?;
//!
//!                 Ok(())
//!             })
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let report = Runner::new(RunnerConfig::new()).run(&mut registry).unwrap();
//!
//! // Two conditions, each measured with the two default measurement types.
//! assert_eq!(report.records().len(), 4);
//! ```
//!
//! # Threads
//!
//! Declaring the reserved `threads` parameter measures the case on that many threads at once.
//! All threads meet at a [`SyncBarrier`] before every sample, so samples start together.
//!
//! # Custom statistics
//!
//! Besides durations, measured code can report its own numbers per sample through
//! [`InvocationContext::add_custom_stat()`], aggregated either as a mean or as a rate per
//! second of measured time.
//!
//! # Logging
//!
//! The harness logs through [`tracing`]. It does not install a subscriber.

mod barrier;
mod calibrate;
mod case;
mod clock;
mod condition;
mod context;
mod custom_stat;
mod error;
mod filter;
mod invoker;
mod measurement_config;
mod names;
mod pal;
mod param;
mod registry;
mod report;
mod result;
mod runner;
mod stats;

pub use barrier::*;
pub use case::*;
pub use clock::*;
pub use condition::*;
pub use context::*;
pub use custom_stat::*;
pub use error::*;
pub use filter::*;
pub use measurement_config::*;
pub use names::*;
pub use param::*;
pub use registry::*;
pub use report::*;
pub use result::*;
pub use runner::*;
pub use stats::*;
