use csr_pipes::{RunConfig, VAddHarness};
use env_logger::{Builder, Env};
use std::process::ExitCode;

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    match run() {
        Ok(status) => ExitCode::from(status),
        Err(err) => {
            eprintln!("Caught a device fault: {err:#}");
            // Device faults are never recovered from.
            std::process::abort();
        }
    }
}

fn run() -> anyhow::Result<u8> {
    let harness = VAddHarness::new(RunConfig::default())?;
    println!("Running on device: {}", harness.device().name());

    let count = harness.config().count;
    println!("Add two vectors of size {count}");

    let outcome = harness.run()?;
    for line in outcome.report_lines() {
        println!("{line}");
    }
    Ok(outcome.exit_status())
}
