//! Persistence Module
//!
//! Async get/set-by-key storage for the handful of top-level records the
//! state layer keeps locally, plus the versioned envelope they are saved in.

mod file;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub use file::FileKv;
pub use memory::MemoryKv;

// == Public Constants ==
/// Key of the persisted user profile
pub const USER_KEY: &str = "user";

/// Key of the persisted membership list
pub const MEMBERSHIP_KEY: &str = "userCommunities";

/// Version written into every envelope
pub const PERSISTED_VERSION: u32 = 1;

// == KV Store ==
/// Durable key-value primitive. A `set` that resolves is durable.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

// == Persisted Envelope ==
/// Versioned shape of every stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persisted<T> {
    pub version: u32,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    pub data: T,
}

impl<T> Persisted<T> {
    /// Wraps `data` at the current version.
    pub fn current(data: T) -> Self {
        Self {
            version: PERSISTED_VERSION,
            saved_at: Some(Utc::now()),
            data,
        }
    }
}

impl<T: DeserializeOwned> Persisted<T> {
    /// Decodes an envelope; a bare value without one loads as version 0.
    pub fn decode(value: Value) -> Result<Self> {
        if value.get("version").is_some() && value.get("data").is_some() {
            return Ok(serde_json::from_value(value)?);
        }
        Ok(Self {
            version: 0,
            saved_at: None,
            data: serde_json::from_value(value)?,
        })
    }
}

/// Loads and unwraps the value stored under `key`.
pub async fn load<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Result<Option<T>> {
    match kv.get(key).await? {
        Some(value) => Ok(Some(Persisted::decode(value)?.data)),
        None => Ok(None),
    }
}

/// Wraps `data` in a current envelope and stores it under `key`.
pub async fn save<T: Serialize>(kv: &dyn KvStore, key: &str, data: &T) -> Result<()> {
    let value = serde_json::to_value(Persisted::current(data))?;
    kv.set(key, value).await
}
