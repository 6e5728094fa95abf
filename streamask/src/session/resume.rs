//! Resumer: consumes newly appended transfer bytes on each poll.

use anyhow::Result;
use tracing::{debug, info};

use super::models::{Completion, SessionHandle, SessionUpdate};
use crate::gemini::{ParsedBatch, RecordDecoder};
use crate::process::ProcessMonitor;
use crate::store::{read_text, remove_all, SessionKeys, SessionStore};

/// Appended when the transfer died without a terminal record.
pub const ABNORMAL_NOTICE: &str = "[连接中断或进程意外结束]";

pub struct Resumer<'a> {
    store: &'a dyn SessionStore,
    monitor: &'a dyn ProcessMonitor,
}

impl<'a> Resumer<'a> {
    pub fn new(store: &'a dyn SessionStore, monitor: &'a dyn ProcessMonitor) -> Self {
        Self { store, monitor }
    }

    /// Consume whatever the transfer appended since `handle.checkpoint`.
    ///
    /// Only one poll per session may run at a time; concurrent polls of the
    /// same session are unsupported and can duplicate or drop text.
    pub fn poll(&self, handle: &SessionHandle) -> Result<SessionUpdate> {
        let keys = SessionKeys::new(&handle.session_id);

        if !handle.in_progress {
            return Ok(SessionUpdate {
                text: read_text(self.store, &keys.answer)?,
                in_progress: false,
                checkpoint: handle.checkpoint,
                process_id: handle.process_id,
                completion: None,
            });
        }

        // liveness first: a process seen dead here has written its last byte
        let alive = handle
            .process_id
            .is_some_and(|pid| self.monitor.is_alive(pid));
        let size = self.store.size(&keys.stream)?;

        let pending = self.store.read(&keys.pending)?.unwrap_or_default();
        let mut decoder = RecordDecoder::with_pending(pending);
        let mut batch = ParsedBatch::default();
        let mut checkpoint = handle.checkpoint;
        let mut consumed = false;

        if size > checkpoint {
            let bytes = self.store.read_range(&keys.stream, checkpoint..size)?;
            batch.merge(decoder.feed(&bytes));
            checkpoint = size;
            consumed = true;
        }

        if !alive && !batch.is_terminal() {
            batch.merge(decoder.finish());
        }

        if batch.skipped > 0 {
            debug!(
                session_id = %handle.session_id,
                skipped = batch.skipped,
                "skipped malformed records"
            );
        }

        let mut text = read_text(self.store, &keys.answer)?;
        text.push_str(&batch.text);

        let completion = match batch.terminal {
            Some(terminal) => Some(Completion::from(terminal)),
            None if !alive => Some(Completion::Abnormal),
            None => None,
        };

        match &completion {
            Some(Completion::Failed(message)) => {
                push_notice(&mut text, &format!("[请求失败: {message}]"));
            }
            Some(Completion::Abnormal) => push_notice(&mut text, ABNORMAL_NOTICE),
            Some(Completion::Finished(_)) | None => {}
        }

        if !batch.text.is_empty() || completion.is_some() {
            self.store.write(&keys.answer, text.as_bytes())?;
        }

        if let Some(completion) = &completion {
            remove_all(self.store, &keys.transient())?;
            info!(
                session_id = %handle.session_id,
                checkpoint,
                ?completion,
                "session complete"
            );
        } else if consumed {
            self.store.write(&keys.pending, decoder.pending())?;
        }

        Ok(SessionUpdate {
            text,
            in_progress: completion.is_none(),
            checkpoint,
            process_id: handle.process_id,
            completion,
        })
    }
}

fn push_notice(text: &mut String, notice: &str) {
    if !text.is_empty() {
        text.push('\n');
    }
    text.push_str(notice);
}
