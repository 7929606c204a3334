//! Publication Cache Module
//!
//! Per-community cache of publications. Reads are served from memory when
//! possible; writes are forwarded to the remote channel and only land in the
//! cache through the notifications the backing store emits.

use std::cmp::Ordering;
use std::sync::{Arc, Weak};

use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use crate::cache::{CacheEvent, EventBus, Record, RecordCache, ReservationId};
use crate::error::{Result, StoreError};
use crate::models::{PublicationDraft, PublicationPatch, PublicationRecord};
use crate::remote::{Notification, RemoteChannel, Topic};

impl Record for PublicationRecord {
    type Patch = PublicationPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn patch_id(patch: &PublicationPatch) -> &str {
        &patch.id
    }

    fn from_patch(patch: PublicationPatch) -> Self {
        PublicationRecord::from(patch)
    }

    fn apply(&mut self, patch: PublicationPatch) {
        PublicationRecord::apply(self, patch)
    }

    fn content_len(&self) -> u64 {
        PublicationRecord::content_len(self)
    }

    /// Newest first; undated records last; ties by id.
    fn order(a: &Self, b: &Self) -> Ordering {
        match (&a.created_at, &b.created_at) {
            (Some(x), Some(y)) => y.cmp(x).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        }
    }
}

// == Publication Cache ==
pub struct PublicationCache {
    community_id: String,
    remote: Arc<dyn RemoteChannel>,
    cache: RwLock<RecordCache<PublicationRecord>>,
    events: EventBus<CacheEvent>,
}

impl PublicationCache {
    // == Constructor ==
    /// Creates the cache and starts listening to the community's
    /// publication topics. Must be called inside a tokio runtime.
    ///
    /// Fails with `InvalidArgument` when `community_id` is empty.
    pub fn new(
        remote: Arc<dyn RemoteChannel>,
        community_id: &str,
        event_capacity: usize,
    ) -> Result<Arc<Self>> {
        if community_id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "Please provide a community id".to_string(),
            ));
        }

        let full = remote.subscribe(&Topic::Publications(community_id.to_string()));
        let metadata = remote.subscribe(&Topic::PublicationsMetadata(community_id.to_string()));
        let synced = remote.subscribe(&Topic::Synced(community_id.to_string()));

        let cache = Arc::new(Self {
            community_id: community_id.to_string(),
            remote,
            cache: RwLock::new(RecordCache::new()),
            events: EventBus::new(event_capacity),
        });

        tokio::spawn(listen(Arc::downgrade(&cache), full, metadata, synced));
        Ok(cache)
    }

    /// Registers an observer for this cache's change events.
    pub fn subscribe(&self) -> Receiver<CacheEvent> {
        self.events.subscribe()
    }

    // == Get ==
    /// Returns the cached publication, fetching it by id on a miss.
    ///
    /// `Ok(None)` means the backing store has no such publication.
    pub async fn get(&self, id: &str) -> Result<Option<PublicationRecord>> {
        if let Some(cached) = self.cache.read().await.get(id) {
            trace!("Publication {}/{} served from cache", self.community_id, id);
            return Ok(Some(cached.clone()));
        }

        let fetched = self.remote.publications_get(&self.community_id, id).await?;
        if let Some(publication) = &fetched {
            self.cache.write().await.insert(publication.clone());
        }
        Ok(fetched)
    }

    // == Get All ==
    /// Returns the full list, refetching it only when no bulk fetch has
    /// happened since creation or since the last resync signal.
    pub async fn get_all(&self) -> Result<Vec<PublicationRecord>> {
        {
            let cache = self.cache.read().await;
            if cache.is_fetched_all() {
                return Ok(cache.records().to_vec());
            }
        }

        let list = self.remote.publications_get_all(&self.community_id).await?;
        let (changed, snapshot) = {
            let mut cache = self.cache.write().await;
            let changed = cache.replace_all(list);
            cache.mark_fetched_all();
            (changed, cache.records().to_vec())
        };

        debug!(
            "Fetched {} publications for {}",
            snapshot.len(),
            self.community_id
        );
        if changed {
            self.events.emit(CacheEvent::Updated);
        }
        Ok(snapshot)
    }

    // == Size ==
    /// Sum of cached content lengths.
    pub async fn get_size(&self) -> u64 {
        self.cache.read().await.total_size()
    }

    /// Size including optimistic changes the cache does not reflect yet.
    pub async fn projected_size(&self) -> u64 {
        self.cache.read().await.projected_size()
    }

    // == Optimistic size ==
    /// Opens a size change ahead of a post, before the remote assigns an id.
    pub async fn reserve(&self, delta: i64) -> ReservationId {
        self.cache.write().await.reserve(delta)
    }

    /// Binds a reservation to the posted id; it lapses once that record is
    /// cached, whichever topic delivers it.
    pub async fn confirm(&self, reservation: ReservationId, id: &str) {
        self.cache.write().await.confirm_arrival(reservation, id);
    }

    /// Opens a size change ahead of a delete; it lapses once `id` leaves
    /// the cache.
    pub async fn reserve_removal(&self, id: &str, delta: i64) -> ReservationId {
        self.cache.write().await.reserve_removal(id, delta)
    }

    pub async fn release(&self, reservation: ReservationId) {
        self.cache.write().await.release(reservation);
    }

    pub async fn is_fetched_all(&self) -> bool {
        self.cache.read().await.is_fetched_all()
    }

    // == Remote passthroughs ==
    pub async fn get_metadata(&self) -> Result<Vec<PublicationPatch>> {
        self.remote.publications_get_metadata(&self.community_id).await
    }

    pub async fn post(&self, data: PublicationDraft) -> Result<String> {
        self.remote.publications_post(&self.community_id, data).await
    }

    pub async fn post_by_hash(&self, data: PublicationDraft) -> Result<String> {
        self.remote
            .publications_post_by_hash(&self.community_id, data)
            .await
    }

    pub async fn put(&self, id: &str, data: PublicationPatch) -> Result<()> {
        self.remote
            .publications_put(&self.community_id, id, data)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.remote
            .publications_delete(&self.community_id, id)
            .await
    }

    // == Notifications ==
    async fn apply(&self, notification: Notification) {
        match notification {
            Notification::Publications(list) => {
                self.cache.write().await.replace_all(list);
                self.events.emit(CacheEvent::Updated);
            }
            Notification::PublicationsMetadata(patches) => {
                self.cache.write().await.merge(patches);
                self.events.emit(CacheEvent::Updated);
            }
            Notification::Synced => {
                self.cache.write().await.mark_stale();
                debug!("Publications of {} marked stale", self.community_id);
                self.events.emit(CacheEvent::Synced);
            }
            other => trace!("Ignoring {:?} on publication topics", other),
        }
    }
}

/// Applies notifications until the cache is dropped or a topic closes.
async fn listen(
    cache: Weak<PublicationCache>,
    mut full: Receiver<Notification>,
    mut metadata: Receiver<Notification>,
    mut synced: Receiver<Notification>,
) {
    loop {
        let received = tokio::select! {
            r = full.recv() => r,
            r = metadata.recv() => r,
            r = synced.recv() => r,
        };

        let Some(cache) = cache.upgrade() else {
            break;
        };

        match received {
            Ok(notification) => cache.apply(notification).await,
            Err(RecvError::Lagged(skipped)) => {
                warn!(
                    "Publication listener for {} lagged by {} notifications, forcing refetch",
                    cache.community_id, skipped
                );
                cache.cache.write().await.mark_stale();
            }
            Err(RecvError::Closed) => break,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::LocalChannel;

    fn record(id: &str, src: &str) -> PublicationRecord {
        PublicationRecord {
            id: id.to_string(),
            src: Some(src.to_string()),
            hash: None,
            caption: None,
            nickname: None,
            path: None,
            created_at: None,
        }
    }

    fn setup() -> (Arc<LocalChannel>, Arc<PublicationCache>) {
        let channel = Arc::new(LocalChannel::new());
        let cache = PublicationCache::new(channel.clone(), "c1", 16).unwrap();
        (channel, cache)
    }

    #[tokio::test]
    async fn test_requires_community_id() {
        let channel = Arc::new(LocalChannel::new());
        let result = PublicationCache::new(channel, "", 16);
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_get_all_fetches_once() {
        let (channel, cache) = setup();
        channel
            .seed_publications("c1", vec![record("1", "aa"), record("2", "bbbb")])
            .await;

        assert_eq!(cache.get_all().await.unwrap().len(), 2);
        assert_eq!(cache.get_all().await.unwrap().len(), 2);

        assert_eq!(channel.bulk_fetches(), 1);
        assert_eq!(cache.get_size().await, 6);
    }

    #[tokio::test]
    async fn test_get_all_emits_only_on_change() {
        let (channel, cache) = setup();
        let mut events = cache.subscribe();

        // Empty remote list leaves the empty cache unchanged
        cache.get_all().await.unwrap();
        assert!(events.try_recv().is_err());

        channel.seed_publications("c1", vec![record("1", "aa")]).await;
        channel.publish(&Topic::Synced("c1".to_string()), Notification::Synced);
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Synced);

        cache.get_all().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated);
    }

    #[tokio::test]
    async fn test_get_caches_fetched_record() {
        let (channel, cache) = setup();
        channel.seed_publications("c1", vec![record("1", "aa")]).await;

        assert!(cache.get("1").await.unwrap().is_some());
        assert!(cache.get("1").await.unwrap().is_some());
        assert_eq!(channel.record_fetches(), 1);

        // Fetch-by-id does not count as a bulk fetch
        assert!(!cache.is_fetched_all().await);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (channel, cache) = setup();
        assert_eq!(cache.get("nope").await.unwrap(), None);
        assert_eq!(cache.get_size().await, 0);
        assert_eq!(channel.record_fetches(), 1);
    }

    #[tokio::test]
    async fn test_post_mutates_only_through_notification() {
        let (_channel, cache) = setup();
        let mut events = cache.subscribe();

        let id = cache
            .post(PublicationDraft {
                src: Some("abc".to_string()),
                ..PublicationDraft::default()
            })
            .await
            .unwrap();

        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated);
        assert_eq!(cache.get_size().await, 3);
        assert!(cache.get(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_metadata_notification_merges() {
        let (channel, cache) = setup();
        channel.seed_publications("c1", vec![record("1", "aa")]).await;
        cache.get_all().await.unwrap();
        let mut events = cache.subscribe();

        channel.publish(
            &Topic::PublicationsMetadata("c1".to_string()),
            Notification::PublicationsMetadata(vec![PublicationPatch {
                id: "1".to_string(),
                caption: Some("cat".to_string()),
                ..PublicationPatch::default()
            }]),
        );
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated);

        let merged = cache.get("1").await.unwrap().unwrap();
        assert_eq!(merged.src.as_deref(), Some("aa"));
        assert_eq!(merged.caption.as_deref(), Some("cat"));
    }

    #[tokio::test]
    async fn test_reservation_lapses_on_metadata_confirmation() {
        let (channel, cache) = setup();
        let mut events = cache.subscribe();

        let reservation = cache.reserve(3).await;
        cache.confirm(reservation, "p1").await;
        assert_eq!(cache.projected_size().await, 3);

        channel.publish(
            &Topic::PublicationsMetadata("c1".to_string()),
            Notification::PublicationsMetadata(vec![PublicationPatch {
                id: "p1".to_string(),
                src: Some("abc".to_string()),
                ..PublicationPatch::default()
            }]),
        );
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated);

        assert_eq!(cache.get_size().await, 3);
        assert_eq!(cache.projected_size().await, 3);
    }

    #[tokio::test]
    async fn test_full_list_with_repeated_id_counts_once() {
        let (channel, cache) = setup();
        let mut events = cache.subscribe();

        channel.publish(
            &Topic::Publications("c1".to_string()),
            Notification::Publications(vec![record("p1", "aa"), record("p1", "aa")]),
        );
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated);

        assert_eq!(cache.get_size().await, 2);
        assert!(cache.get("p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remote_failure_propagates() {
        let (channel, cache) = setup();
        channel.set_available(false);

        assert!(matches!(
            cache.get_all().await,
            Err(StoreError::RemoteUnavailable(_))
        ));
        assert!(matches!(
            cache.delete("1").await,
            Err(StoreError::RemoteUnavailable(_))
        ));
        assert!(!cache.is_fetched_all().await);
    }

    #[tokio::test]
    async fn test_listener_stops_after_drop() {
        let (channel, cache) = setup();
        drop(cache);

        let topic = Topic::Synced("c1".to_string());
        let mut reached = channel.publish(&topic, Notification::Synced);
        for _ in 0..100 {
            if reached == 0 {
                break;
            }
            tokio::task::yield_now().await;
            reached = channel.publish(&topic, Notification::Synced);
        }
        assert_eq!(reached, 0, "listener should release its receivers");
    }
}
