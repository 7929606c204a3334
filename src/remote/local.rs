//! In-process loopback backing store.
//!
//! Holds communities and publications in memory and publishes the
//! notification a replicated store would emit after each mutation. Used by
//! the standalone binary and by tests, which can also inject notifications
//! directly and take the channel offline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, trace};

use super::{Notification, RemoteChannel, Topic};
use crate::error::{Result, StoreError};
use crate::models::{
    CommunityMetadata, CommunityRecord, PublicationDraft, PublicationPatch, PublicationRecord,
};

/// Default capacity of each topic's broadcast channel.
const TOPIC_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Backing {
    communities: HashMap<String, CommunityRecord>,
    publications: HashMap<String, Vec<PublicationRecord>>,
    peers: HashMap<String, Vec<String>>,
    nicknames: HashMap<String, Vec<String>>,
}

// == Call Counters ==
#[derive(Debug, Default)]
struct Calls {
    community_get: AtomicUsize,
    online_peers: AtomicUsize,
    publications_get: AtomicUsize,
    publications_get_all: AtomicUsize,
}

// == Local Channel ==
/// Loopback `RemoteChannel` backed by in-memory maps.
#[derive(Debug)]
pub struct LocalChannel {
    backing: RwLock<Backing>,
    topics: Mutex<HashMap<Topic, broadcast::Sender<Notification>>>,
    available: AtomicBool,
    /// Announce new posts as partial updates instead of the full list
    announce_patches: AtomicBool,
    next_id: AtomicU64,
    calls: Calls,
    capacity: usize,
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalChannel {
    // == Constructor ==
    /// Creates an empty, online channel.
    pub fn new() -> Self {
        Self::with_capacity(TOPIC_CAPACITY)
    }

    /// Creates an empty channel whose topics buffer `capacity` notifications.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            backing: RwLock::new(Backing::default()),
            topics: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            announce_patches: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            calls: Calls::default(),
            capacity: capacity.max(1),
        }
    }

    // == Test and simulation hooks ==
    /// Takes the channel offline (every request fails) or back online.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Makes posts announce the new record on `update-<id>-publicationsMetadata`
    /// rather than republishing the full list, as a peer relaying a single
    /// change would.
    pub fn set_patch_announcements(&self, enabled: bool) {
        self.announce_patches.store(enabled, Ordering::SeqCst);
    }

    /// Delivers a notification to current subscribers of `topic`.
    ///
    /// Returns the number of receivers reached.
    pub fn publish(&self, topic: &Topic, notification: Notification) -> usize {
        let sender = self.sender(topic);
        let reached = sender.send(notification).unwrap_or(0);
        trace!("Published on {} to {} receivers", topic, reached);
        reached
    }

    /// Stores publications without emitting any notification.
    pub async fn seed_publications(&self, community_id: &str, records: Vec<PublicationRecord>) {
        let mut backing = self.backing.write().await;
        backing
            .publications
            .insert(community_id.to_string(), records);
    }

    /// Stores community metadata without emitting any notification.
    pub async fn seed_community(&self, record: CommunityRecord) {
        let mut backing = self.backing.write().await;
        backing.communities.insert(record.id.clone(), record);
    }

    /// Replaces the online peers of a community and notifies `peer-<id>`.
    pub async fn set_online_peers(&self, community_id: &str, peers: Vec<String>) {
        {
            let mut backing = self.backing.write().await;
            backing
                .peers
                .insert(community_id.to_string(), peers.clone());
        }
        self.publish(&Topic::Peers(community_id.to_string()), Notification::Peers(peers));
    }

    /// Nicknames broadcast into a community, in arrival order.
    pub async fn nicknames(&self, community_id: &str) -> Vec<String> {
        let backing = self.backing.read().await;
        backing
            .nicknames
            .get(community_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the backing store still holds the community.
    pub async fn has_community(&self, community_id: &str) -> bool {
        let backing = self.backing.read().await;
        backing.communities.contains_key(community_id)
            || backing.publications.contains_key(community_id)
    }

    /// Number of bulk publication fetches served.
    pub fn bulk_fetches(&self) -> usize {
        self.calls.publications_get_all.load(Ordering::SeqCst)
    }

    /// Number of single publication fetches served.
    pub fn record_fetches(&self) -> usize {
        self.calls.publications_get.load(Ordering::SeqCst)
    }

    /// Number of community metadata fetches served.
    pub fn community_fetches(&self) -> usize {
        self.calls.community_get.load(Ordering::SeqCst)
    }

    /// Number of online peer fetches served.
    pub fn peer_fetches(&self) -> usize {
        self.calls.online_peers.load(Ordering::SeqCst)
    }

    // == Internals ==
    fn sender(&self, topic: &Topic) -> broadcast::Sender<Notification> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::RemoteUnavailable(
                "local channel is offline".to_string(),
            ))
        }
    }

    fn assign_id(&self) -> String {
        format!("pub-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn insert_publication(&self, community_id: &str, data: PublicationDraft) -> String {
        let id = self.assign_id();
        let record = PublicationRecord::from_draft(id.clone(), data, Utc::now());
        let list = {
            let mut backing = self.backing.write().await;
            let list = backing
                .publications
                .entry(community_id.to_string())
                .or_default();
            list.push(record.clone());
            list.clone()
        };
        if self.announce_patches.load(Ordering::SeqCst) {
            self.publish(
                &Topic::PublicationsMetadata(community_id.to_string()),
                Notification::PublicationsMetadata(vec![PublicationPatch::from(record)]),
            );
        } else {
            self.publish_publications(community_id, list);
        }
        id
    }

    fn publish_publications(&self, community_id: &str, list: Vec<PublicationRecord>) {
        self.publish(
            &Topic::Publications(community_id.to_string()),
            Notification::Publications(list),
        );
    }
}

#[async_trait]
impl RemoteChannel for LocalChannel {
    async fn community_get(&self, community_id: &str) -> Result<Option<CommunityRecord>> {
        self.ensure_available()?;
        self.calls.community_get.fetch_add(1, Ordering::SeqCst);
        let backing = self.backing.read().await;
        Ok(backing.communities.get(community_id).cloned())
    }

    async fn community_post(&self, community_id: &str, data: CommunityMetadata) -> Result<()> {
        self.ensure_available()?;
        let record = CommunityRecord {
            id: community_id.to_string(),
            size: 0,
            metadata: data,
        };
        {
            let mut backing = self.backing.write().await;
            backing
                .communities
                .insert(community_id.to_string(), record.clone());
        }
        self.publish(
            &Topic::Community(community_id.to_string()),
            Notification::Community(record),
        );
        Ok(())
    }

    async fn community_put(&self, community_id: &str, data: CommunityMetadata) -> Result<()> {
        self.ensure_available()?;
        let record = {
            let mut backing = self.backing.write().await;
            let record = backing
                .communities
                .entry(community_id.to_string())
                .or_insert_with(|| CommunityRecord::new(community_id));
            record.metadata.extend(data);
            record.clone()
        };
        self.publish(
            &Topic::Community(community_id.to_string()),
            Notification::Community(record),
        );
        Ok(())
    }

    async fn community_delete(&self, community_id: &str) -> Result<()> {
        self.ensure_available()?;
        let mut backing = self.backing.write().await;
        backing.communities.remove(community_id);
        backing.publications.remove(community_id);
        backing.peers.remove(community_id);
        debug!("Local channel dropped community {}", community_id);
        Ok(())
    }

    async fn community_put_nicknames(
        &self,
        community_ids: &[String],
        nickname: &str,
    ) -> Result<()> {
        self.ensure_available()?;
        let mut backing = self.backing.write().await;
        for id in community_ids {
            backing
                .nicknames
                .entry(id.clone())
                .or_default()
                .push(nickname.to_string());
        }
        Ok(())
    }

    async fn community_get_online_peers(&self, community_id: &str) -> Result<Vec<String>> {
        self.ensure_available()?;
        self.calls.online_peers.fetch_add(1, Ordering::SeqCst);
        let backing = self.backing.read().await;
        Ok(backing.peers.get(community_id).cloned().unwrap_or_default())
    }

    async fn publications_get(
        &self,
        community_id: &str,
        publication_id: &str,
    ) -> Result<Option<PublicationRecord>> {
        self.ensure_available()?;
        self.calls.publications_get.fetch_add(1, Ordering::SeqCst);
        let backing = self.backing.read().await;
        Ok(backing
            .publications
            .get(community_id)
            .and_then(|list| list.iter().find(|p| p.id == publication_id))
            .cloned())
    }

    async fn publications_get_all(&self, community_id: &str) -> Result<Vec<PublicationRecord>> {
        self.ensure_available()?;
        self.calls.publications_get_all.fetch_add(1, Ordering::SeqCst);
        let backing = self.backing.read().await;
        Ok(backing
            .publications
            .get(community_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn publications_get_metadata(
        &self,
        community_id: &str,
    ) -> Result<Vec<PublicationPatch>> {
        self.ensure_available()?;
        let backing = self.backing.read().await;
        Ok(backing
            .publications
            .get(community_id)
            .map(|list| list.iter().map(PublicationPatch::metadata_of).collect())
            .unwrap_or_default())
    }

    async fn publications_post(
        &self,
        community_id: &str,
        data: PublicationDraft,
    ) -> Result<String> {
        self.ensure_available()?;
        Ok(self.insert_publication(community_id, data).await)
    }

    async fn publications_post_by_hash(
        &self,
        community_id: &str,
        data: PublicationDraft,
    ) -> Result<String> {
        self.ensure_available()?;
        if data.hash.is_none() {
            return Err(StoreError::InvalidArgument(
                "post by hash requires a content hash".to_string(),
            ));
        }
        Ok(self.insert_publication(community_id, data).await)
    }

    async fn publications_put(
        &self,
        community_id: &str,
        publication_id: &str,
        data: PublicationPatch,
    ) -> Result<()> {
        self.ensure_available()?;
        let list = {
            let mut backing = self.backing.write().await;
            let list = backing
                .publications
                .entry(community_id.to_string())
                .or_default();
            match list.iter_mut().find(|p| p.id == publication_id) {
                Some(existing) => existing.apply(data),
                None => {
                    let mut record = PublicationRecord::from(data);
                    record.id = publication_id.to_string();
                    list.push(record);
                }
            }
            list.clone()
        };
        self.publish_publications(community_id, list);
        Ok(())
    }

    async fn publications_delete(&self, community_id: &str, publication_id: &str) -> Result<()> {
        self.ensure_available()?;
        let list = {
            let mut backing = self.backing.write().await;
            let list = backing
                .publications
                .entry(community_id.to_string())
                .or_default();
            list.retain(|p| p.id != publication_id);
            list.clone()
        };
        self.publish_publications(community_id, list);
        Ok(())
    }

    fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<Notification> {
        self.sender(topic).subscribe()
    }
}
