//! Cache Module
//!
//! Client-side caches over the replicated store: a generic record list,
//! the per-community publication cache and the community cache that owns it.

mod community;
mod events;
mod publications;
mod record;


// Re-export public types
pub use community::CommunityCache;
pub use events::{CacheEvent, EventBus};
pub use publications::PublicationCache;
pub use record::{Record, RecordCache, ReservationId};
