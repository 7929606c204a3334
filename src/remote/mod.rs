//! Remote Channel Module
//!
//! The seam to the replicated backing store: request methods per entity kind
//! plus named push notifications.
//!
//! # Topics
//! - `update-<id>` - full community record
//! - `update-<id>-publications` - full publication list
//! - `update-<id>-publicationsMetadata` - partial publication list
//! - `peer-<id>` - online peer nicknames
//! - `synced-<id>` / `syncing-<id>` - replication lifecycle, no payload

mod local;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::models::{
    CommunityMetadata, CommunityRecord, PublicationDraft, PublicationPatch, PublicationRecord,
};

pub use local::LocalChannel;

// == Topic ==
/// Named notification channel scoped to one community.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Community(String),
    Publications(String),
    PublicationsMetadata(String),
    Peers(String),
    Synced(String),
    Syncing(String),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Community(id) => write!(f, "update-{}", id),
            Topic::Publications(id) => write!(f, "update-{}-publications", id),
            Topic::PublicationsMetadata(id) => write!(f, "update-{}-publicationsMetadata", id),
            Topic::Peers(id) => write!(f, "peer-{}", id),
            Topic::Synced(id) => write!(f, "synced-{}", id),
            Topic::Syncing(id) => write!(f, "syncing-{}", id),
        }
    }
}

// == Notification ==
/// Payload delivered on a topic.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Community(CommunityRecord),
    Publications(Vec<PublicationRecord>),
    PublicationsMetadata(Vec<PublicationPatch>),
    Peers(Vec<String>),
    Synced,
    Syncing,
}

// == Remote Channel ==
/// Asynchronous command/notification interface of the backing store.
///
/// Every request may fail with `StoreError::RemoteUnavailable`; retries are
/// the implementation's concern, callers propagate.
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    async fn community_get(&self, community_id: &str) -> Result<Option<CommunityRecord>>;

    async fn community_post(&self, community_id: &str, data: CommunityMetadata) -> Result<()>;

    async fn community_put(&self, community_id: &str, data: CommunityMetadata) -> Result<()>;

    async fn community_delete(&self, community_id: &str) -> Result<()>;

    /// Publishes `nickname` as the local user's display name in each community.
    async fn community_put_nicknames(&self, community_ids: &[String], nickname: &str)
        -> Result<()>;

    async fn community_get_online_peers(&self, community_id: &str) -> Result<Vec<String>>;

    async fn publications_get(
        &self,
        community_id: &str,
        publication_id: &str,
    ) -> Result<Option<PublicationRecord>>;

    async fn publications_get_all(&self, community_id: &str) -> Result<Vec<PublicationRecord>>;

    async fn publications_get_metadata(&self, community_id: &str)
        -> Result<Vec<PublicationPatch>>;

    /// Returns the id assigned to the new publication.
    async fn publications_post(&self, community_id: &str, data: PublicationDraft)
        -> Result<String>;

    /// Posts a publication whose content is addressed by `hash`.
    async fn publications_post_by_hash(
        &self,
        community_id: &str,
        data: PublicationDraft,
    ) -> Result<String>;

    async fn publications_put(
        &self,
        community_id: &str,
        publication_id: &str,
        data: PublicationPatch,
    ) -> Result<()>;

    async fn publications_delete(&self, community_id: &str, publication_id: &str) -> Result<()>;

    /// Registers interest in a topic. Only notifications sent after this call
    /// are delivered to the returned receiver.
    fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<Notification>;
}
