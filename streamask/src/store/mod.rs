//! Durable session storage.
//!
//! The binary exits between polls, so everything a session needs to survive
//! lives behind [`SessionStore`]: a flat key-value store of byte blobs with
//! append and ranged reads for the transfer buffer.

mod file;
#[cfg(test)]
mod memory;

use std::ops::Range;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use file::FileStore;
#[cfg(test)]
pub use memory::MemoryStore;

/// Key naming the most recently dispatched session.
pub const CURRENT_SESSION_KEY: &str = "current_session";

/// Byte-blob store keyed by name.
///
/// Missing keys read as absent (or empty, for [`size`](Self::size)) rather than
/// as errors.
pub trait SessionStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the value of `key`.
    fn write(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Append to `key`, creating it if missing.
    fn append(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Current size of `key` in bytes, 0 if missing.
    fn size(&self, key: &str) -> Result<u64>;

    /// Read the bytes of `key` within `range`, clamped to what exists.
    fn read_range(&self, key: &str, range: Range<u64>) -> Result<Vec<u8>>;

    /// Remove `key`; removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Store keys belonging to one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub stream: String,
    pub pid: String,
    pub answer: String,
    pub pending: String,
    pub record: String,
}

impl SessionKeys {
    pub fn new(session_id: &str) -> Self {
        Self {
            stream: format!("{session_id}.stream"),
            pid: format!("{session_id}.pid"),
            answer: format!("{session_id}.answer"),
            pending: format!("{session_id}.pending"),
            record: format!("{session_id}.request.json"),
        }
    }

    /// Keys that only matter while the transfer is running.
    pub fn transient(&self) -> [&str; 3] {
        [&self.stream, &self.pid, &self.pending]
    }

    pub fn all(&self) -> [&str; 5] {
        [
            &self.stream,
            &self.pid,
            &self.pending,
            &self.answer,
            &self.record,
        ]
    }
}

/// Read a UTF-8 value, treating a missing key as empty.
pub fn read_text(store: &dyn SessionStore, key: &str) -> Result<String> {
    let bytes = store.read(key)?.unwrap_or_default();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn read_json<T: DeserializeOwned>(store: &dyn SessionStore, key: &str) -> Result<Option<T>> {
    store
        .read(key)?
        .map(|bytes| serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {key}")))
        .transpose()
}

pub fn write_json<T: Serialize>(store: &dyn SessionStore, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).with_context(|| format!("Failed to encode {key}"))?;
    store.write(key, &bytes)
}

/// Read a process id record. Garbage reads as no process.
pub fn read_pid(store: &dyn SessionStore, key: &str) -> Result<Option<u32>> {
    Ok(read_text(store, key)?.trim().parse().ok())
}

pub fn remove_all(store: &dyn SessionStore, keys: &[&str]) -> Result<()> {
    for key in keys {
        store.remove(key)?;
    }
    Ok(())
}
