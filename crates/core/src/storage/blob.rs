use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::CoreError;

/// Opaque key-value persistence consumed by the watchlist and portfolio
/// stores. The stores serialize their snapshots to strings; what lies behind
/// a key (browser storage, a file, a test map) is the host's concern.
///
/// All operations are synchronous and may fail (quota, parse, I/O); callers
/// catch failures into their error field — persistence never crashes a store.
pub trait BlobStore: Send + Sync {
    fn load_blob(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn save_blob(&self, key: &str, value: &str) -> Result<(), CoreError>;
    fn clear_blob(&self, key: &str) -> Result<(), CoreError>;
}

/// Storage keys used by the stores.
pub const WATCHLIST_KEY: &str = "watchlist";
pub const PORTFOLIO_KEY: &str = "portfolio";

/// In-memory blob store. The default backend, and the one tests use.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn load_blob(&self, key: &str) -> Result<Option<String>, CoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn save_blob(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear_blob(&self, key: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}
