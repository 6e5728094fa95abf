//! Detached process spawning.
//!
//! A detached process is spawned with null stdio (stderr optionally sent to
//! a log file) and is never waited on, so it keeps running after the
//! spawning invocation exits.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Configuration for a detached process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// The program to execute.
    pub program: PathBuf,

    /// Arguments to pass to the program.
    pub args: Vec<String>,

    /// Environment variables to set (merged with current env).
    pub env: HashMap<String, String>,

    /// File that receives the process's stderr (appended).
    pub log_file: Option<PathBuf>,
}

impl ProcessOptions {
    /// Create new options for the given program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    /// Append stderr to a log file.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

fn stderr_target(log_file: Option<&PathBuf>) -> io::Result<Stdio> {
    match log_file {
        Some(path) => {
            let file: File = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Stdio::from(file))
        }
        None => Ok(Stdio::null()),
    }
}

/// Spawn a detached process and return its pid.
///
/// On Unix the child gets its own process group so a launcher tearing down
/// the invoking script's group does not take the transfer with it.
pub fn spawn_detached(options: &ProcessOptions) -> io::Result<u32> {
    let mut cmd = Command::new(&options.program);

    cmd.args(&options.args);

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(stderr_target(options.log_file.as_ref())?);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn()?;
    Ok(child.id())
}
