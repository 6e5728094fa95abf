//! CLI argument parsing and the launcher-facing response.

mod args;
mod commands;
mod host;

pub use args::{Cli, Commands};
pub use commands::{execute, rejected_invocation};
