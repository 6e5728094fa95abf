//! CLI command execution.
//!
//! A plain invocation is the launcher calling us: it always prints exactly
//! one JSON response on stdout, whatever goes wrong.

use std::ffi::OsString;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use tracing::{error, warn};

use crate::error::AskError;
use crate::process::{ProcessMonitor, SystemProcesses};
use crate::session::{
    cancel, current_session, discard_transient, restore_handle, Dispatcher, Resumer, SessionRecord,
};
use crate::store::{read_json, FileStore, SessionKeys, SessionStore};
use crate::transfer::{run_transfer, DetachedLauncher, TransferLauncher};

use super::args::{Cli, Commands};
use super::host::HostResponse;

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Transfer { session }) => {
            let store = FileStore::open(cli.config.state_dir()?)?;
            run_transfer(&cli.config, &store, session).await
        }
        Some(Commands::Cancel { session }) => cmd_cancel(&cli, session.as_deref()),
        None => {
            println!("{}", respond(&cli).to_json());
            Ok(())
        }
    }
}

/// Response for a launcher invocation whose arguments were rejected.
///
/// Help, version and the subcommands keep clap's own output and exit code.
pub fn rejected_invocation(args: &[OsString], err: &clap::Error) -> Option<HostResponse> {
    if matches!(
        err.kind(),
        ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    ) {
        return None;
    }
    let subcommand = args
        .get(1)
        .and_then(|arg| arg.to_str())
        .is_some_and(|arg| matches!(arg, "transfer" | "cancel"));
    if subcommand {
        return None;
    }

    let rendered = err.to_string();
    let message = rendered
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ");
    warn!(kind = %err.kind(), "{message}");
    Some(HostResponse::rejected(message))
}

/// Answer the launcher, turning every failure into a response.
fn respond(cli: &Cli) -> HostResponse {
    let store = match cli.config.state_dir().and_then(FileStore::open) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %format!("{e:#}"), "state directory unavailable");
            return HostResponse::fault(&e);
        }
    };

    std::env::current_exe()
        .context("Failed to locate current executable")
        .and_then(|exe| {
            let launcher = DetachedLauncher::new(exe, &cli.config, store.root());
            host_invoke(cli, &store, &launcher, &SystemProcesses)
        })
        .unwrap_or_else(|e| report_failure(cli, &store, &e))
}

/// Map an invocation failure to a response, cleaning up after faults.
fn report_failure(cli: &Cli, store: &dyn SessionStore, err: &anyhow::Error) -> HostResponse {
    if let Some(ask) = err.downcast_ref::<AskError>() {
        warn!(kind = ask.kind(), "{ask}");
        return HostResponse::error(ask);
    }

    error!(error = %format!("{err:#}"), "host invocation failed");
    let session_id = cli
        .host
        .session_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| current_session(store).ok().flatten());
    if let Some(session_id) = session_id {
        if let Err(e) = discard_transient(store, &session_id) {
            warn!(session_id, error = %e, "failed to clear session after fault");
        }
    }
    HostResponse::fault(err)
}

/// Serve one launcher invocation: dispatch a new query or poll the current one.
fn host_invoke(
    cli: &Cli,
    store: &dyn SessionStore,
    launcher: &dyn TransferLauncher,
    monitor: &dyn ProcessMonitor,
) -> Result<HostResponse> {
    let config = &cli.config;

    if !cli.host.streaming {
        let handle = Dispatcher::new(store, launcher, monitor, config)
            .start(&cli.query_text(), &cli.host.mode)?;
        let record = load_record(store, &handle.session_id)?;
        return Ok(HostResponse::dispatched(&handle, &record, config.rerun_interval));
    }

    let session_id = match cli.host.session_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => current_session(store)?
            .ok_or_else(|| AskError::UnknownSession("current".to_string()))?,
    };
    let handle = restore_handle(store, &session_id, cli.host.checkpoint)?;
    let record = load_record(store, &session_id)?;
    let update = Resumer::new(store, monitor).poll(&handle)?;

    Ok(HostResponse::polled(&update, &record, config.rerun_interval))
}

fn load_record(store: &dyn SessionStore, session_id: &str) -> Result<SessionRecord> {
    read_json(store, &SessionKeys::new(session_id).record)?
        .ok_or_else(|| AskError::UnknownSession(session_id.to_string()).into())
}

fn cmd_cancel(cli: &Cli, session: Option<&str>) -> Result<()> {
    let store = FileStore::open(cli.config.state_dir()?)?;
    let session_id = match session {
        Some(id) => id.to_string(),
        None => match current_session(&store)? {
            Some(id) => id,
            None => {
                println!("No session to cancel");
                return Ok(());
            }
        },
    };

    let terminated = cancel(&store, &SystemProcesses, &session_id)
        .with_context(|| format!("Failed to cancel session {session_id}"))?;
    if terminated {
        println!("Cancelled session {session_id} (transfer stopped)");
    } else {
        println!("Cancelled session {session_id}");
    }
    Ok(())
}
