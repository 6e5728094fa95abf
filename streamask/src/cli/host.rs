//! The JSON object the launcher reads from stdout after every invocation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AskError;
use crate::session::{SessionHandle, SessionRecord, SessionUpdate};

/// Launcher variables carried from one invocation to the next.
pub mod vars {
    pub const STREAMING: &str = "streaming_now_alfred";
    pub const CHECKPOINT: &str = "last_stream_file_size_alfred";
    pub const SESSION_ID: &str = "session_id_alfred";
    pub const QUERY: &str = "user_query_original_alfred";
    pub const MODE: &str = "mode_id_original_alfred";
}

pub const THINKING: &str = "思考中...";
const IN_PROGRESS_SUFFIX: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Behaviour {
    pub response: &'static str,
    pub scroll: &'static str,
}

/// Replace the whole text view and keep it scrolled to the newest text.
const FOLLOW_TAIL: Behaviour = Behaviour {
    response: "replace",
    scroll: "end",
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerun: Option<f64>,
    pub variables: BTreeMap<&'static str, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behaviour: Option<Behaviour>,
}

impl HostResponse {
    /// Response to a fresh dispatch: show a placeholder and poll soon.
    pub fn dispatched(handle: &SessionHandle, record: &SessionRecord, rerun: f64) -> Self {
        Self {
            response: THINKING.to_string(),
            rerun: Some(rerun),
            variables: session_vars(handle, record),
            behaviour: Some(FOLLOW_TAIL),
        }
    }

    /// Response to a poll, in progress or finished.
    pub fn polled(update: &SessionUpdate, record: &SessionRecord, rerun: f64) -> Self {
        let handle = update.handle(&record.session_id);
        let mut response = update.text.clone();
        if update.in_progress {
            response.push_str(IN_PROGRESS_SUFFIX);
        }
        Self {
            response,
            rerun: update.in_progress.then_some(rerun),
            variables: session_vars(&handle, record),
            behaviour: Some(FOLLOW_TAIL),
        }
    }

    /// A failure the user caused or can fix.
    pub fn error(err: &AskError) -> Self {
        Self::stopped(format!("ERROR: {err}"))
    }

    /// Arguments or launcher variables that could not be parsed.
    pub fn rejected(message: &str) -> Self {
        Self::stopped(format!("ERROR: invalid arguments: {message}"))
    }

    /// Anything else that went wrong.
    pub fn fault(err: &anyhow::Error) -> Self {
        Self::stopped(format!("Unexpected error:\n{}: {err:#}", fault_kind(err)))
    }

    fn stopped(response: String) -> Self {
        Self {
            response,
            rerun: None,
            variables: BTreeMap::from([(vars::STREAMING, false.to_string())]),
            behaviour: None,
        }
    }

    pub fn to_json(&self) -> String {
        // only strings, numbers and maps of strings: serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

fn session_vars(handle: &SessionHandle, record: &SessionRecord) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        (vars::STREAMING, handle.in_progress.to_string()),
        (vars::CHECKPOINT, handle.checkpoint.to_string()),
        (vars::SESSION_ID, record.session_id.clone()),
        (vars::QUERY, record.query.clone()),
        (vars::MODE, record.mode.clone()),
    ])
}

/// Label for the innermost error we recognise.
fn fault_kind(err: &anyhow::Error) -> &'static str {
    let root = err.root_cause();
    if root.is::<std::io::Error>() {
        "IoError"
    } else if root.is::<serde_json::Error>() {
        "JsonError"
    } else if root.is::<std::num::ParseIntError>() {
        "ParseIntError"
    } else {
        "Error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{FinishReason, GenerateRequest, GenerationConfig};
    use crate::session::Completion;
    use anyhow::Context;
    use serde_json::{json, Value};

    fn record() -> SessionRecord {
        SessionRecord {
            session_id: "0190-s".to_string(),
            mode: "explain".to_string(),
            query: "黑洞".to_string(),
            request: GenerateRequest::new(
                "p",
                GenerationConfig {
                    max_output_tokens: 2048,
                    temperature: 0.7,
                },
            ),
            created_at: chrono::Utc::now(),
        }
    }

    fn as_value(response: &HostResponse) -> Value {
        serde_json::from_str(&response.to_json()).unwrap()
    }

    #[test]
    fn dispatched_shape() {
        let handle = SessionHandle {
            session_id: "0190-s".to_string(),
            in_progress: true,
            checkpoint: 0,
            process_id: Some(9),
        };
        let value = as_value(&HostResponse::dispatched(&handle, &record(), 0.2));
        assert_eq!(
            value,
            json!({
                "response": "思考中...",
                "rerun": 0.2,
                "variables": {
                    "streaming_now_alfred": "true",
                    "last_stream_file_size_alfred": "0",
                    "session_id_alfred": "0190-s",
                    "user_query_original_alfred": "黑洞",
                    "mode_id_original_alfred": "explain",
                },
                "behaviour": {"response": "replace", "scroll": "end"},
            })
        );
    }

    #[test]
    fn in_progress_poll_reruns_with_ellipsis() {
        let update = SessionUpdate {
            text: "黑洞是".to_string(),
            in_progress: true,
            checkpoint: 321,
            process_id: Some(9),
            completion: None,
        };
        let value = as_value(&HostResponse::polled(&update, &record(), 0.5));
        assert_eq!(value["response"], "黑洞是...");
        assert_eq!(value["rerun"], 0.5);
        assert_eq!(value["variables"]["last_stream_file_size_alfred"], "321");
        assert_eq!(value["variables"]["streaming_now_alfred"], "true");
    }

    #[test]
    fn finished_poll_stops_rerunning() {
        let update = SessionUpdate {
            text: "黑洞是".to_string(),
            in_progress: false,
            checkpoint: 400,
            process_id: Some(9),
            completion: Some(Completion::Finished(FinishReason::Stop)),
        };
        let value = as_value(&HostResponse::polled(&update, &record(), 0.2));
        assert_eq!(value["response"], "黑洞是");
        assert!(value.get("rerun").is_none());
        assert_eq!(value["variables"]["streaming_now_alfred"], "false");
    }

    #[test]
    fn errors_turn_streaming_off() {
        let value = as_value(&HostResponse::error(&AskError::EmptyQuery));
        assert_eq!(
            value,
            json!({
                "response": "ERROR: query must not be empty",
                "variables": {"streaming_now_alfred": "false"},
            })
        );
    }

    #[test]
    fn fault_reports_kind_and_chain() {
        let err = Err::<(), _>(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
            .context("Failed to read s.answer")
            .unwrap_err();
        let value = as_value(&HostResponse::fault(&err));
        assert_eq!(
            value["response"],
            "Unexpected error:\nIoError: Failed to read s.answer: gone"
        );
        assert_eq!(value["variables"]["streaming_now_alfred"], "false");
    }
}
