use std::env;

use anyhow::Context;
use log::LevelFilter;
use structopt::StructOpt;

use px4_smoke::{ParamRoundTrip, Report, SmokeTest};

mod cli;

fn print_report(report: &Report, param_name: &str) {
    println!("\nVER ALL OUTPUT:\n{}", report.version_output);

    match &report.param {
        ParamRoundTrip::Missing { .. } => println!("Failed to read {}", param_name),
        ParamRoundTrip::Completed {
            original,
            temporary,
            updated,
            restored,
        } => {
            println!("\n{} original value: {}", param_name, original);
            println!(
                "{} updated value: {} (expected {})",
                param_name,
                updated.as_deref().unwrap_or("<none>"),
                temporary
            );
            println!(
                "{} restored value: {}",
                param_name,
                restored.as_deref().unwrap_or("<none>")
            );
        }
    }

    println!("\nBoot log saved to {}", report.boot_log_path.display());
    println!("VER output archived to {}", report.version_log_path.display());
}

fn main() -> Result<(), anyhow::Error> {
    // Create a timestamped logger that logs everything at Info level or above unless RUST_LOG
    // says otherwise
    let mut builder = pretty_env_logger::formatted_timed_builder();

    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(LevelFilter::Info),
    };

    builder.init();

    // Parse the command-line arguments
    let opts = cli::Opts::from_args();
    let config = opts.config();
    let smoke = SmokeTest::new(config);

    let report = smoke
        .run(&mut smoke.config().uploader(), |config| config.open_channel())
        .with_context(|| {
            format!(
                "Smoke test of {} on {} failed",
                smoke.config().build_target,
                smoke.config().port
            )
        })?;

    print_report(&report, &smoke.config().param_name);

    println!("\nHardware smoke test complete.");

    Ok(())
}
