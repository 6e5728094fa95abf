//! CLI argument definitions.

use std::num::ParseIntError;

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};

use super::host::vars;
use crate::config::Config;
use crate::prompts::DEFAULT_MODE;

/// Streamask - stream Gemini answers into a launcher that re-invokes us
///
/// Invoked by the launcher with the query as the only positional argument
/// (pass it after `--` so a query can never be mistaken for a subcommand).
#[derive(Parser, Debug)]
#[command(name = "streamask")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(flatten)]
    pub host: HostState,

    /// Query to ask (ignored while streaming)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub query: Vec<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The query words joined back into one string.
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }
}

/// Resume state the launcher carries between invocations.
#[derive(Args, Debug, Clone)]
pub struct HostState {
    /// Whether a session is currently streaming
    #[arg(
        long,
        env = vars::STREAMING,
        action = ArgAction::Set,
        value_parser = FalseyValueParser::new(),
        default_value = "false"
    )]
    pub streaming: bool,

    /// Transfer buffer offset consumed so far
    #[arg(long, env = vars::CHECKPOINT, default_value_t = 0, value_parser = parse_checkpoint)]
    pub checkpoint: u64,

    /// Prompt mode for a new query
    #[arg(long, env = "chosen_mode_id", default_value = DEFAULT_MODE)]
    pub mode: String,

    /// Session being streamed (defaults to the most recent one)
    #[arg(long, env = vars::SESSION_ID)]
    pub session_id: Option<String>,
}

/// The launcher sends an empty checkpoint until the first poll reports one.
fn parse_checkpoint(value: &str) -> Result<u64, ParseIntError> {
    let value = value.trim();
    if value.is_empty() {
        Ok(0)
    } else {
        value.parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the background transfer for a session
    #[command(hide = true)]
    Transfer {
        /// Session id to stream
        #[arg(long)]
        session: String,
    },

    /// Stop a session's transfer and delete its state
    Cancel {
        /// Session id (defaults to the most recent one)
        session: Option<String>,
    },
}
