use clap::Parser;
use injector_cli::logging;
use injector_cli::telemetry_cmd::{run, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let _guard = logging::init("ai-telemetry-injector");
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting");
    run(Cli::parse())
}
