//! Thicket Store - local-first client state layer
//!
//! Presents a synchronous-feeling read/write API over data held in a local
//! key-value store and a replicated backing store reached through async
//! notifications: cached communities and publications, derived community
//! sizes, the persisted profile and the membership set.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod persist;
pub mod remote;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{Result, StoreError};
pub use store::Store;
pub use tasks::spawn_warmup_task;
