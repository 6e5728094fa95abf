//! Session lifecycle: dispatch, resume and cancel.
//!
//! A session is created by [`Dispatcher::start`], advanced by
//! [`Resumer::poll`] once per invocation, and torn down either by the poll
//! that detects completion, by the next dispatch, or by [`cancel`].

mod dispatch;
mod models;
mod resume;

use anyhow::Result;

pub use dispatch::Dispatcher;
#[cfg(test)]
pub use models::Completion;
pub use models::{SessionHandle, SessionRecord, SessionUpdate};
pub use resume::Resumer;

use crate::error::AskError;
use crate::process::ProcessMonitor;
use crate::store::{read_pid, read_text, remove_all, SessionKeys, SessionStore, CURRENT_SESSION_KEY};

/// Id of the most recently dispatched session, if any.
pub fn current_session(store: &dyn SessionStore) -> Result<Option<String>> {
    let id = read_text(store, CURRENT_SESSION_KEY)?;
    let id = id.trim();
    Ok((!id.is_empty()).then(|| id.to_string()))
}

/// Rebuild a session's handle from the host's checkpoint.
///
/// The process record is written at dispatch and removed when the session
/// completes, so a session without one is finished and polls as such.
pub fn restore_handle(
    store: &dyn SessionStore,
    session_id: &str,
    checkpoint: u64,
) -> Result<SessionHandle> {
    let keys = SessionKeys::new(session_id);
    if store.read(&keys.record)?.is_none() {
        return Err(AskError::UnknownSession(session_id.to_string()).into());
    }
    let process_id = read_pid(store, &keys.pid)?;
    Ok(SessionHandle {
        session_id: session_id.to_string(),
        in_progress: process_id.is_some(),
        checkpoint,
        process_id,
    })
}

/// Stop a session's transfer and release all of its storage.
///
/// Returns whether a running transfer was signalled.
pub fn cancel(
    store: &dyn SessionStore,
    monitor: &dyn ProcessMonitor,
    session_id: &str,
) -> Result<bool> {
    let keys = SessionKeys::new(session_id);

    let terminated = match read_pid(store, &keys.pid)? {
        Some(pid) if monitor.is_alive(pid) => monitor.terminate(pid),
        _ => false,
    };

    remove_all(store, &keys.all())?;
    if current_session(store)?.as_deref() == Some(session_id) {
        store.remove(CURRENT_SESSION_KEY)?;
    }

    Ok(terminated)
}

/// Drop the transfer buffer, process record and pending tail of a session.
pub fn discard_transient(store: &dyn SessionStore, session_id: &str) -> Result<()> {
    remove_all(store, &SessionKeys::new(session_id).transient())
}


#[cfg(test)]
mod tests {
    use super::testing::{RecordingLauncher, ScriptedMonitor};
    use super::*;
    use crate::config::Config;
    use crate::gemini::FinishReason;
    use crate::store::MemoryStore;

    fn wire(text: &str) -> String {
        format!(
            "data: {}\r\n\r\n",
            serde_json::json!({"candidates": [{"content": {"parts": [{"text": text}], "role": "model"}, "index": 0}]})
        )
    }

    #[test]
    fn end_to_end_three_polls() {
        let store = MemoryStore::default();
        let launcher = RecordingLauncher::with_pid(31337);
        let monitor = ScriptedMonitor::alive([31337]);
        let config = Config::default();

        let handle = Dispatcher::new(&store, &launcher, &monitor, &config)
            .start("黑洞", "explain")
            .unwrap();

        let launched = launcher.launched();
        let prompt = launched[0].prompt();
        assert!(prompt.contains("'黑洞'"));
        assert!(prompt.contains("大白话"));

        let keys = SessionKeys::new(&handle.session_id);
        let resumer = Resumer::new(&store, &monitor);

        store.append(&keys.stream, wire("黑洞").as_bytes()).unwrap();
        let first = resumer.poll(&handle).unwrap();
        assert_eq!(first.text, "黑洞");
        assert!(first.in_progress);

        store.append(&keys.stream, wire("是").as_bytes()).unwrap();
        let second = resumer.poll(&first.handle(&handle.session_id)).unwrap();
        assert_eq!(second.text, "黑洞是");
        assert!(second.in_progress);
        assert!(second.checkpoint > first.checkpoint);

        store
            .append(
                &keys.stream,
                br#"data: {"candidates": [{"content": {"parts": [{"text": ""}],"role": "model"},"finishReason": "STOP","index": 0}]}

"#,
            )
            .unwrap();
        let third = resumer.poll(&second.handle(&handle.session_id)).unwrap();
        assert_eq!(third.text, "黑洞是");
        assert!(!third.in_progress);
        assert!(!store.contains(&keys.stream));
        assert!(!store.contains(&keys.pid));
    }

    #[test]
    fn restore_handle_reads_pid_record() {
        let store = MemoryStore::default();
        let launcher = RecordingLauncher::with_pid(55);
        let monitor = ScriptedMonitor::alive([55]);
        let config = Config::default();
        let handle = Dispatcher::new(&store, &launcher, &monitor, &config)
            .start("q", "custom_prompt")
            .unwrap();

        let restored = restore_handle(&store, &handle.session_id, 12).unwrap();
        assert_eq!(restored.process_id, Some(55));
        assert_eq!(restored.checkpoint, 12);
        assert!(restored.in_progress);
    }

    #[test]
    fn repolling_finished_session_keeps_answer() {
        let store = MemoryStore::default();
        let launcher = RecordingLauncher::with_pid(77);
        let monitor = ScriptedMonitor::alive([77]);
        let config = Config::default();
        let handle = Dispatcher::new(&store, &launcher, &monitor, &config)
            .start("q", "explain")
            .unwrap();
        let keys = SessionKeys::new(&handle.session_id);
        let resumer = Resumer::new(&store, &monitor);

        store
            .append(
                &keys.stream,
                format!(
                    "{}data: {{\"candidates\": [{{\"finishReason\": \"STOP\"}}]}}\n\n",
                    wire("done")
                )
                .as_bytes(),
            )
            .unwrap();
        let first = resumer.poll(&handle).unwrap();
        assert_eq!(first.completion, Some(Completion::Finished(FinishReason::Stop)));

        for _ in 0..2 {
            let restored = restore_handle(&store, &handle.session_id, first.checkpoint).unwrap();
            assert!(!restored.in_progress);
            let again = resumer.poll(&restored).unwrap();
            assert_eq!(again.text, "done");
            assert!(!again.in_progress);
            assert_eq!(again.completion, None);
        }
        assert_eq!(read_text(&store, &keys.answer).unwrap(), "done");
    }

    #[test]
    fn restore_unknown_session_fails() {
        let store = MemoryStore::default();
        let err = restore_handle(&store, "gone", 0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AskError>(),
            Some(AskError::UnknownSession(id)) if id == "gone"
        ));
    }

    #[test]
    fn cancel_terminates_and_releases_everything() {
        let store = MemoryStore::default();
        let launcher = RecordingLauncher::with_pid(90);
        let monitor = ScriptedMonitor::alive([90]);
        let config = Config::default();
        let handle = Dispatcher::new(&store, &launcher, &monitor, &config)
            .start("q", "explain")
            .unwrap();
        let keys = SessionKeys::new(&handle.session_id);
        store.append(&keys.stream, wire("x").as_bytes()).unwrap();

        assert!(cancel(&store, &monitor, &handle.session_id).unwrap());
        assert_eq!(monitor.terminated(), vec![90]);
        for key in keys.all() {
            assert!(!store.contains(key));
        }
        assert_eq!(current_session(&store).unwrap(), None);

        // already gone: nothing to signal
        assert!(!cancel(&store, &monitor, &handle.session_id).unwrap());
    }

    #[test]
    fn discard_transient_keeps_answer() {
        let store = MemoryStore::default();
        let keys = SessionKeys::new("s");
        for key in keys.all() {
            store.write(key, b"x").unwrap();
        }
        discard_transient(&store, "s").unwrap();
        assert!(store.contains(&keys.answer));
        assert!(store.contains(&keys.record));
        assert!(!store.contains(&keys.stream));
    }
}
