//! Dispatcher: validates a query and starts its background transfer.

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{SessionHandle, SessionRecord};
use super::{cancel, current_session};
use crate::config::Config;
use crate::error::AskError;
use crate::gemini::GenerateRequest;
use crate::process::ProcessMonitor;
use crate::prompts::find_mode;
use crate::store::{write_json, SessionKeys, SessionStore, CURRENT_SESSION_KEY};
use crate::transfer::TransferLauncher;

pub struct Dispatcher<'a> {
    store: &'a dyn SessionStore,
    launcher: &'a dyn TransferLauncher,
    monitor: &'a dyn ProcessMonitor,
    config: &'a Config,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        store: &'a dyn SessionStore,
        launcher: &'a dyn TransferLauncher,
        monitor: &'a dyn ProcessMonitor,
        config: &'a Config,
    ) -> Self {
        Self {
            store,
            launcher,
            monitor,
            config,
        }
    }

    /// Start a session for `query` rendered with prompt mode `mode_id`.
    ///
    /// Returns as soon as the transfer process is launched; no network I/O
    /// happens here.
    pub fn start(&self, query: &str, mode_id: &str) -> Result<SessionHandle> {
        if query.trim().is_empty() {
            return Err(AskError::EmptyQuery.into());
        }
        let mode = find_mode(mode_id).ok_or_else(|| AskError::InvalidMode(mode_id.to_string()))?;
        if self.config.api_key().is_none() {
            return Err(AskError::MissingCredential.into());
        }

        if let Some(stale) = current_session(self.store)? {
            let terminated = cancel(self.store, self.monitor, &stale)?;
            debug!(session_id = %stale, terminated, "cleared previous session");
        }

        let session_id = Uuid::now_v7().to_string();
        let keys = SessionKeys::new(&session_id);
        let record = SessionRecord {
            session_id: session_id.clone(),
            mode: mode.id.to_string(),
            query: query.to_string(),
            request: GenerateRequest::new(mode.render(query), self.config.generation()),
            created_at: Utc::now(),
        };

        write_json(self.store, &keys.record, &record)?;
        self.store.write(&keys.answer, b"")?;
        self.store
            .write(CURRENT_SESSION_KEY, session_id.as_bytes())?;

        let pid = match self.launcher.launch(&record) {
            Ok(pid) => pid,
            Err(e) => {
                cancel(self.store, self.monitor, &session_id)?;
                return Err(e.into());
            }
        };
        self.store.write(&keys.pid, pid.to_string().as_bytes())?;

        info!(session_id = %session_id, pid, mode = mode.id, "transfer started");

        Ok(SessionHandle {
            session_id,
            in_progress: true,
            checkpoint: 0,
            process_id: Some(pid),
        })
    }
}
