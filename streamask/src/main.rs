//! Streamask - stream Gemini answers into a launcher that re-runs us.
//!
//! The launcher keeps no process alive between invocations, so each run
//! either dispatches a query or polls the one in flight:
//! - A dispatch validates the query and starts a detached transfer process
//!   (this same binary, `transfer` subcommand) that appends the streamed
//!   response to a buffer in the workflow cache
//! - A poll consumes whatever the transfer appended since the last
//!   checkpoint and reports the accumulated answer
//!
//! stdout carries the launcher's JSON; logs go to stderr.

mod cli;
mod config;
mod error;
mod gemini;
mod process;
mod prompts;
mod session;
mod store;
mod transfer;

use std::ffi::OsString;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{execute, rejected_invocation, Cli, Commands};

const LOG_ENV: &str = "STREAMASK_LOG";

fn init_logging(worker: bool) {
    let default = if worker { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    // the worker's stderr is a log file
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!worker),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // settings may live in a .env file next to the workflow
    dotenvy::dotenv().ok();

    // the launcher needs a JSON answer even when its variables are garbage
    let args: Vec<OsString> = std::env::args_os().collect();
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(e) => {
            init_logging(false);
            match rejected_invocation(&args, &e) {
                Some(response) => {
                    println!("{}", response.to_json());
                    return Ok(());
                }
                None => e.exit(),
            }
        }
    };
    init_logging(matches!(cli.command, Some(Commands::Transfer { .. })));

    execute(cli).await
}
