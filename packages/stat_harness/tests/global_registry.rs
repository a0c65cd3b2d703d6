//! Tests of the process-wide registry.
//!
//! The registry is shared by every test in this binary, so each test holds `SERIAL` for its
//! whole duration and starts from a reset registry.

use std::sync::{Mutex, MutexGuard, PoisonError};

use stat_harness::{
    Error, GroupConfig, MeasurementConfig, Runner, RunnerConfig, case, configure_global_group,
    reset_global_registry, take_global_registry,
};

static SERIAL: Mutex<()> = Mutex::new(());

fn isolated() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    reset_global_registry();
    guard
}

fn quick() -> MeasurementConfig {
    MeasurementConfig::new("")
        .iterations(3)
        .samples(4)
        .warming_up_samples(1)
}

#[test]
fn registered_cases_are_run_and_taken_out() {
    let _serial = isolated();

    case("strings", "concat")
        .param("parts", [2, 8])
        .measurement(quick())
        .run(|context| {
            let parts = context.param::<usize>("parts")?;

            context.measure(|_, _, _| {
                let mut text = String::new();
                for _ in 0..parts {
                    text.push_str("part");
                }
                text
            })?;

            Ok(())
        })
        .register();

    let mut group_config = GroupConfig::empty();
    group_config
        .add_measurement(MeasurementConfig::processing_time())
        .unwrap();
    configure_global_group("strings", group_config);

    let report = Runner::new(RunnerConfig::new()).run_registered().unwrap();

    assert_eq!(report.records().len(), 2);
    assert!(report.is_success());

    // The registry is empty once the cases were taken out.
    assert!(take_global_registry().is_empty());
}

#[test]
fn duplicate_registration_is_reported_by_the_runner() {
    let _serial = isolated();

    for _ in 0..2 {
        case("g", "twice").run(|_| Ok(())).register();
    }

    let result = Runner::new(RunnerConfig::new()).run_registered();

    match result {
        Err(Error::DuplicateCase { name }) => assert_eq!(name.to_string(), "g/twice"),
        other => panic!("expected a duplicate case error, got {other:?}"),
    }
}

#[test]
fn invalid_declaration_is_kept_until_run() {
    let _serial = isolated();

    case("g", "bad")
        .param("size", [1])
        .param("size", [2])
        .run(|_| Ok(()))
        .register();
    case("g", "good").run(|_| Ok(())).register();

    assert!(matches!(
        Runner::new(RunnerConfig::new()).run_registered(),
        Err(Error::DuplicateParameter { .. })
    ));
}

#[test]
fn reset_discards_cases_and_errors() {
    let _serial = isolated();

    case("g", "c").run(|_| Ok(())).register();
    case("g", "c").run(|_| Ok(())).register();

    reset_global_registry();

    let report = Runner::new(RunnerConfig::new()).run_registered().unwrap();

    assert!(report.records().is_empty());
    assert!(report.warnings().is_empty());
}
