//! Session data carried between invocations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gemini::{FinishReason, GenerateRequest, Terminal};

/// Persisted at dispatch so reruns (and the transfer worker) can recover
/// what was asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub mode: String,
    pub query: String,
    pub request: GenerateRequest,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn prompt(&self) -> &str {
        self.request.prompt().unwrap_or_default()
    }
}

/// Resume state handed back to the host after every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub session_id: String,
    pub in_progress: bool,
    /// Bytes of the transfer buffer already consumed.
    pub checkpoint: u64,
    pub process_id: Option<u32>,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The stream declared a finish reason.
    Finished(FinishReason),
    /// The server reported an error.
    Failed(String),
    /// The transfer process died without a terminal record.
    Abnormal,
}

impl From<Terminal> for Completion {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Finished(reason) => Self::Finished(reason),
            Terminal::Failed(error) => Self::Failed(error.summary()),
        }
    }
}

/// Outcome of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    /// Accumulated answer so far, including any diagnostic suffix.
    pub text: String,
    pub in_progress: bool,
    pub checkpoint: u64,
    pub process_id: Option<u32>,
    /// Set on the poll that detects completion.
    pub completion: Option<Completion>,
}

impl SessionUpdate {
    /// Handle for the next poll.
    pub fn handle(&self, session_id: impl Into<String>) -> SessionHandle {
        SessionHandle {
            session_id: session_id.into(),
            in_progress: self.in_progress,
            checkpoint: self.checkpoint,
            process_id: self.process_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{ApiError, GenerationConfig};

    #[test]
    fn failed_terminal_keeps_server_message() {
        let completion = Completion::from(Terminal::Failed(ApiError {
            code: Some(429),
            message: Some("Resource has been exhausted".to_string()),
            status: Some("RESOURCE_EXHAUSTED".to_string()),
        }));
        assert_eq!(
            completion,
            Completion::Failed("429 RESOURCE_EXHAUSTED: Resource has been exhausted".to_string())
        );
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = SessionRecord {
            session_id: "s1".to_string(),
            mode: "explain".to_string(),
            query: "黑洞".to_string(),
            request: GenerateRequest::new(
                "prompt",
                GenerationConfig {
                    max_output_tokens: 10,
                    temperature: 0.5,
                },
            ),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: SessionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.prompt(), "prompt");
    }
}
