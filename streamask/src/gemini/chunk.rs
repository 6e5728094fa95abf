//! Server-sent-event record parsing for `streamGenerateContent`.
//!
//! The stream is line oriented: every record is a `data: <JSON>` line. On
//! hard failures the server instead writes a bare `{"error": {...}}` object
//! outside the framing, which must still be recognized as terminal.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Prefix of every framed record.
pub const RECORD_MARKER: &str = "data:";

/// Explicit end-of-stream sentinel some proxies append.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Finish reasons that end a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other,
}

impl FinishReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "STOP",
            Self::MaxTokens => "MAX_TOKENS",
            Self::Safety => "SAFETY",
            Self::Recitation => "RECITATION",
            Self::Other => "OTHER",
        }
    }

    /// Parse a wire value. Unrecognized reasons are not terminal.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STOP" => Some(Self::Stop),
            "MAX_TOKENS" => Some(Self::MaxTokens),
            "SAFETY" => Some(Self::Safety),
            "RECITATION" => Some(Self::Recitation),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error object reported by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl ApiError {
    fn from_value(value: Value) -> Self {
        match value {
            Value::String(message) => Self {
                message: Some(message),
                ..Self::default()
            },
            other => serde_json::from_value(other).unwrap_or_default(),
        }
    }

    /// One-line description for display.
    pub fn summary(&self) -> String {
        let message = self.message.as_deref().unwrap_or("unknown error");
        match (self.code, self.status.as_deref()) {
            (Some(code), Some(status)) => format!("{code} {status}: {message}"),
            (Some(code), None) => format!("{code}: {message}"),
            (None, Some(status)) => format!("{status}: {message}"),
            (None, None) => message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamRecord {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// A record that could not be decoded. Recovered locally by skipping it.
#[derive(Debug, Error)]
#[error("malformed stream record: {source}")]
pub struct MalformedRecord {
    #[from]
    source: serde_json::Error,
}

/// One decoded unit of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Text fragment, possibly carrying the finish reason.
    Data {
        text: String,
        finish: Option<FinishReason>,
    },
    /// Hard failure reported by the server.
    Error(ApiError),
}

impl Chunk {
    /// Parse one line of the stream.
    ///
    /// Returns `Ok(None)` for lines that carry nothing: blanks, the `[DONE]`
    /// sentinel, other SSE fields and unframed objects without an error.
    pub fn parse_line(line: &str) -> Result<Option<Self>, MalformedRecord> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if let Some(payload) = line.strip_prefix(RECORD_MARKER) {
            let payload = payload.trim();
            if payload.is_empty() || payload == DONE_SENTINEL {
                return Ok(None);
            }
            return Self::decode(payload).map(Some);
        }

        if line.starts_with('{') {
            return match Self::decode(line)? {
                chunk @ Self::Error(_) => Ok(Some(chunk)),
                Self::Data { .. } => Ok(None),
            };
        }

        Ok(None)
    }

    fn decode(payload: &str) -> Result<Self, MalformedRecord> {
        let record: StreamRecord = serde_json::from_str(payload)?;

        if let Some(error) = record.error.filter(|e| !e.is_null()) {
            return Ok(Self::Error(ApiError::from_value(error)));
        }

        let Some(candidate) = record.candidates.into_iter().next() else {
            return Ok(Self::Data {
                text: String::new(),
                finish: None,
            });
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        let finish = candidate.finish_reason.as_deref().and_then(FinishReason::parse);

        Ok(Self::Data { text, finish })
    }
}

/// How a stream ended, as declared by the stream itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Finished(FinishReason),
    Failed(ApiError),
}

/// Result of parsing a run of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBatch {
    /// Concatenated text of every data record, in order.
    pub text: String,
    /// First terminal record seen, if any.
    pub terminal: Option<Terminal>,
    /// Records that failed to decode.
    pub skipped: usize,
}

impl ParsedBatch {
    pub const fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    fn push(&mut self, chunk: Chunk) {
        match chunk {
            Chunk::Data { text, finish } => {
                self.text.push_str(&text);
                if self.terminal.is_none() {
                    self.terminal = finish.map(Terminal::Finished);
                }
            }
            Chunk::Error(error) => {
                if self.terminal.is_none() {
                    self.terminal = Some(Terminal::Failed(error));
                }
            }
        }
    }

    /// Append a later batch to this one.
    pub fn merge(&mut self, later: Self) {
        self.text.push_str(&later.text);
        if self.terminal.is_none() {
            self.terminal = later.terminal;
        }
        self.skipped += later.skipped;
    }
}

/// Parse every line in `input`, including an unterminated last line.
pub fn parse_records(input: &[u8]) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    for line in String::from_utf8_lossy(input).split('\n') {
        match Chunk::parse_line(line) {
            Ok(Some(chunk)) => batch.push(chunk),
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(error = %e, "skipping record");
                batch.skipped += 1;
            }
        }
    }
    batch
}

/// Incremental decoder that only parses complete lines.
///
/// Bytes after the last newline are held back until the rest of the line
/// arrives, so a read boundary in the middle of a record (or of a UTF-8
/// sequence) never loses content.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    pending: Vec<u8>,
}

impl RecordDecoder {
    /// Resume with a tail held back by a previous decoder.
    pub const fn with_pending(pending: Vec<u8>) -> Self {
        Self { pending }
    }

    /// Feed newly read bytes; parses every line they complete.
    pub fn feed(&mut self, bytes: &[u8]) -> ParsedBatch {
        self.pending.extend_from_slice(bytes);
        match self.pending.iter().rposition(|&b| b == b'\n') {
            Some(pos) => {
                let complete: Vec<u8> = self.pending.drain(..=pos).collect();
                parse_records(&complete)
            }
            None => ParsedBatch::default(),
        }
    }

    /// Parse the held-back tail as if it were a complete line.
    pub fn finish(&mut self) -> ParsedBatch {
        let tail = std::mem::take(&mut self.pending);
        parse_records(&tail)
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}
