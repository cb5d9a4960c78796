use clap::Parser;
use injector_cli::codeblend_cmd::{run, Cli};
use injector_cli::logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    let _guard = logging::init("codeblend-injector");
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Starting");
    run(Cli::parse())
}
