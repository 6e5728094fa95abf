//! Errors surfaced to the launcher.
//!
//! Everything here ends up in front of the user as `ERROR: <message>`.
//! Plumbing failures stay `anyhow::Error` and are reported as unexpected.

use std::io;

use thiserror::Error;

/// A failure the user can act on (or at least read).
#[derive(Debug, Error)]
pub enum AskError {
    /// The query was empty or whitespace.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The prompt mode id is not in the registry.
    #[error("unknown prompt mode '{0}'")]
    InvalidMode(String),

    /// No API key was configured.
    #[error("GEMINI_API_KEY_ALFRED is not set")]
    MissingCredential,

    /// The background transfer process could not be launched.
    #[error("failed to start transfer process {program}: {source}")]
    TransferStart {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A rerun referenced a session whose record is gone.
    #[error("session '{0}' not found; start a new query")]
    UnknownSession(String),
}

impl AskError {
    /// Short label used when reporting the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmptyQuery => "EmptyQuery",
            Self::InvalidMode(_) => "InvalidMode",
            Self::MissingCredential => "MissingCredential",
            Self::TransferStart { .. } => "TransferStart",
            Self::UnknownSession(_) => "UnknownSession",
        }
    }
}
