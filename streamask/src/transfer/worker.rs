//! The detached transfer: POST the request and append the body as it arrives.

use std::path::Path;

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AskError;
use crate::gemini::stream_url;
use crate::session::SessionRecord;
use crate::store::{read_json, FileStore, SessionKeys, SessionStore};

/// Stream the response for `session_id` into its transfer buffer.
///
/// Every failure also lands in the buffer as a single-line error record, so
/// the poller sees a terminal record instead of a silent process exit.
pub async fn run_transfer(config: &Config, store: &FileStore, session_id: &str) -> Result<()> {
    let keys = SessionKeys::new(session_id);
    let record: SessionRecord = read_json(store, &keys.record)?
        .ok_or_else(|| AskError::UnknownSession(session_id.to_string()))?;
    let buffer = store.path_for(&keys.stream);

    info!(
        session_id,
        model = %config.model,
        mode = %record.mode,
        prompt_chars = record.prompt().chars().count(),
        "transfer starting"
    );

    match timeout(config.transfer_timeout(), stream_into(config, &record, &buffer)).await {
        Ok(Ok(written)) => {
            info!(session_id, written, "transfer finished");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(session_id, error = %format!("{e:#}"), "transfer failed");
            store.append(&keys.stream, error_record(None, &format!("{e:#}")).as_bytes())?;
            Err(e)
        }
        Err(_) => {
            let secs = config.transfer_timeout;
            warn!(session_id, secs, "transfer timed out");
            let message = format!("transfer timed out after {secs}s");
            store.append(&keys.stream, error_record(None, &message).as_bytes())?;
            bail!(message)
        }
    }
}

async fn open_buffer(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))
}

async fn stream_into(config: &Config, record: &SessionRecord, buffer: &Path) -> Result<u64> {
    let api_key = config.api_key().ok_or(AskError::MissingCredential)?;

    let mut builder = reqwest::Client::builder();
    if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
        builder = builder.proxy(reqwest::Proxy::all(proxy).context("Invalid proxy URL")?);
    }
    let client = builder.build().context("Failed to build HTTP client")?;

    let resp = client
        .post(stream_url(&config.endpoint, &config.model))
        .header("x-goog-api-key", api_key)
        .json(&record.request)
        .send()
        .await
        .context("Failed to send request")?;

    let status = resp.status();
    let mut file = open_buffer(buffer).await?;

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(%status, "request rejected");
        let line = normalize_error_body(status.as_u16(), &body);
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        return Ok(line.len() as u64);
    }

    let mut written = 0u64;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let bytes = chunk.context("Failed to read response body")?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("Failed to append to {}", buffer.display()))?;
        // flush per chunk so every poll sees what has arrived
        file.flush().await?;
        written += bytes.len() as u64;
    }

    Ok(written)
}

/// A bare error record on its own line.
///
/// The leading newline terminates any record the stream broke off mid-line.
fn error_record(code: Option<u16>, message: &str) -> String {
    let mut error = json!({ "message": message });
    if let Some(code) = code {
        error["code"] = json!(code);
    }
    format!("\n{}\n", json!({ "error": error }))
}

/// Turn an error response body into a single-line error record.
///
/// The API sends a (possibly pretty-printed) `{"error": ...}` object, or an
/// array of them from the streaming endpoint; anything else is wrapped.
fn normalize_error_body(status: u16, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let envelope = match parsed {
        Some(value @ Value::Object(_)) if value.get("error").is_some() => Some(value),
        Some(Value::Array(items)) => items.into_iter().find(|item| item.get("error").is_some()),
        _ => None,
    };

    match envelope {
        Some(envelope) => format!("\n{envelope}\n"),
        None => {
            let body = body.trim();
            let message = if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.to_string()
            };
            error_record(Some(status), &message)
        }
    }
}
