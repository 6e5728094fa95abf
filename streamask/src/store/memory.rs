//! In-memory store for tests.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use super::SessionStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("memory store lock poisoned")
}

impl SessionStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn append(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .map_err(poisoned)?
            .entry(key.to_string())
            .or_default()
            .extend_from_slice(value);
        Ok(())
    }

    fn size(&self, key: &str) -> Result<u64> {
        Ok(self
            .entries
            .read()
            .map_err(poisoned)?
            .get(key)
            .map_or(0, |v| v.len() as u64))
    }

    fn read_range(&self, key: &str, range: Range<u64>) -> Result<Vec<u8>> {
        let entries = self.entries.read().map_err(poisoned)?;
        let Some(value) = entries.get(key) else {
            return Ok(Vec::new());
        };
        let end = usize::try_from(range.end).unwrap_or(usize::MAX).min(value.len());
        let start = usize::try_from(range.start).unwrap_or(usize::MAX).min(end);
        Ok(value[start..end].to_vec())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_ranged_read() {
        let store = MemoryStore::default();
        store.append("buf", b"hello ").unwrap();
        store.append("buf", b"world").unwrap();
        assert_eq!(store.size("buf").unwrap(), 11);
        assert_eq!(store.read_range("buf", 6..11).unwrap(), b"world");
        assert_eq!(store.read_range("buf", 6..100).unwrap(), b"world");
        assert!(store.read_range("buf", 20..30).unwrap().is_empty());
    }

    #[test]
    fn missing_key_is_empty() {
        let store = MemoryStore::default();
        assert_eq!(store.size("nope").unwrap(), 0);
        assert_eq!(store.read("nope").unwrap(), None);
        store.remove("nope").unwrap();
    }
}
