//! Process-local sink.

use super::SettingsSink;
use crate::error::SinkError;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Entries {
    current: BTreeMap<String, String>,
    backups: BTreeMap<String, String>,
}

/// In-memory sink that counts every operation.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Entries>,
    retrieves: AtomicUsize,
    stores: AtomicUsize,
    backups: AtomicUsize,
    purges: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink pre-populated with `data` for `key`.
    pub fn with_entry(key: impl Into<String>, data: impl Into<String>) -> Self {
        let sink = Self::new();
        sink.entries.lock().current.insert(key.into(), data.into());
        sink
    }

    /// Current stored data without counting a retrieve.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.lock().current.get(key).cloned()
    }

    /// Most recent backup for `key`.
    pub fn backup(&self, key: &str) -> Option<String> {
        self.entries.lock().backups.get(key).cloned()
    }

    pub fn retrieve_count(&self) -> usize {
        self.retrieves.load(Ordering::SeqCst)
    }

    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    /// Number of stores and purges that produced a backup.
    pub fn backup_count(&self) -> usize {
        self.backups.load(Ordering::SeqCst)
    }

    pub fn purge_count(&self) -> usize {
        self.purges.load(Ordering::SeqCst)
    }
}

impl SettingsSink for MemorySink {
    fn retrieve(&self, key: &str) -> Result<Option<String>, SinkError> {
        self.retrieves.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().current.get(key).cloned())
    }

    fn store(&self, key: &str, data: &str, create_backup: bool) -> Result<(), SinkError> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.lock();
        let previous = entries.current.insert(key.to_string(), data.to_string());
        if let (true, Some(previous)) = (create_backup, previous) {
            self.backups.fetch_add(1, Ordering::SeqCst);
            entries.backups.insert(key.to_string(), previous);
        }
        Ok(())
    }

    fn purge(&self, key: &str, create_backup: bool) -> Result<(), SinkError> {
        self.purges.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.lock();
        if let (true, Some(previous)) = (create_backup, entries.current.remove(key)) {
            self.backups.fetch_add(1, Ordering::SeqCst);
            entries.backups.insert(key.to_string(), previous);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.entries.lock().current.keys().cloned().collect())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn sink_type(&self) -> &'static str {
        "memory"
    }
}
