//! Shared plumbing for the `ai-telemetry-injector` and `codeblend-injector`
//! binaries. Each binary is a thin `main` around one of the command modules.

pub mod codeblend_cmd;
pub mod logging;
mod output;
pub mod telemetry_cmd;
