//! Background transfer of the streamed response into the session store.
//!
//! The transfer runs as this same binary re-invoked with the hidden
//! `transfer` subcommand, detached from the invocation that dispatched it.

mod worker;

use std::path::PathBuf;

use crate::config::Config;
use crate::error::AskError;
use crate::process::{spawn_detached, ProcessOptions};
use crate::session::SessionRecord;

pub use worker::run_transfer;

/// Name of the log file the worker's stderr is appended to.
pub const LOG_FILE: &str = "transfer.log";

/// Starts the background transfer for a dispatched session.
pub trait TransferLauncher {
    /// Launch the transfer and return its process id.
    fn launch(&self, record: &SessionRecord) -> Result<u32, AskError>;
}

/// Launches the worker as a detached copy of the current executable.
#[derive(Debug, Clone)]
pub struct DetachedLauncher {
    exe: PathBuf,
    env: Vec<(&'static str, String)>,
    log_file: PathBuf,
}

impl DetachedLauncher {
    pub fn new(exe: PathBuf, config: &Config, state_dir: &std::path::Path) -> Self {
        Self {
            exe,
            env: config.worker_env(state_dir),
            log_file: state_dir.join(LOG_FILE),
        }
    }

    fn options(&self, session_id: &str) -> ProcessOptions {
        ProcessOptions::new(&self.exe)
            .arg("transfer")
            .arg("--session")
            .arg(session_id)
            .envs(self.env.iter().cloned())
            .log_file(&self.log_file)
    }
}

impl TransferLauncher for DetachedLauncher {
    fn launch(&self, record: &SessionRecord) -> Result<u32, AskError> {
        spawn_detached(&self.options(&record.session_id)).map_err(|source| {
            AskError::TransferStart {
                program: self.exe.display().to_string(),
                source,
            }
        })
    }
}
