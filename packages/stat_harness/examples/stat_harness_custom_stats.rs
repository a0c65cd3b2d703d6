//! Reports throughput next to the measured durations with custom statistics.

use stat_harness::{AggregationType, MeasurementConfig, Runner, RunnerConfig, case};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    case("checksum", "fold")
        .param("bytes", [4_096, 65_536])
        .measurement(MeasurementConfig::new("").iterations(100))
        .run(|context| {
            let bytes = context.param::<usize>("bytes")?;
            let data = vec![0xA5_u8; bytes];

            let throughput = context.add_custom_stat("bytes/s", AggregationType::RatePerSecond)?;
            let bytes_per_sample = context.add_custom_stat("bytes", AggregationType::Mean)?;
            context.add_custom_output("buffer_size", f64::from(u32::try_from(bytes)?));

            let iterations = context.iterations();

            context.measure(|thread_index, sample_index, iteration_index| {
                // One value per sample, covering all its iterations.
                if iteration_index == 0 {
                    #[expect(
                        clippy::cast_precision_loss,
                        reason = "byte counts in this example stay far below 2^52"
                    )]
                    let sample_bytes = bytes.saturating_mul(iterations) as f64;

                    throughput.add(thread_index, sample_index, sample_bytes);
                    bytes_per_sample.add(thread_index, sample_index, sample_bytes);
                }

                data.iter().fold(0_u8, |acc, byte| acc.wrapping_add(*byte))
            })?;

            Ok(())
        })
        .register();

    let report = Runner::new(RunnerConfig::new()).run_registered()?;
    println!("{report}");

    for record in report.records() {
        let Some(measurement) = record.measurement() else {
            continue;
        };

        for stat in measurement.custom_stats() {
            println!(
                "{} {} [{}]: {} {:.0}",
                record.measurement_type(),
                record.name(),
                record.condition(),
                stat.name(),
                stat.aggregate()
            );
        }
    }

    Ok(())
}
