//! In-memory KV store that counts reads per key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::KvStore;
use crate::error::{Result, StoreError};

// == Memory KV ==
#[derive(Debug, Default)]
pub struct MemoryKv {
    values: RwLock<HashMap<String, Value>>,
    reads: Mutex<HashMap<String, usize>>,
    failing: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls made for `key`.
    pub fn reads(&self, key: &str) -> usize {
        let reads = self.reads.lock().unwrap_or_else(|e| e.into_inner());
        reads.get(key).copied().unwrap_or(0)
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Raw stored value, envelope included.
    pub async fn raw(&self, key: &str) -> Option<Value> {
        self.values.read().await.get(key).cloned()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        {
            let mut reads = self.reads.lock().unwrap_or_else(|e| e.into_inner());
            *reads.entry(key.to_string()).or_insert(0) += 1;
        }
        // Suspend like a real storage backend would
        tokio::task::yield_now().await;
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Persistence(format!(
                "write of '{}' rejected",
                key
            )));
        }
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
