//! Community Cache Module
//!
//! Per-community metadata with a derived `size`, online peer tracking and
//! the community's publication cache.

use std::sync::{Arc, Weak};

use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

use crate::cache::{CacheEvent, EventBus, PublicationCache};
use crate::error::{Result, StoreError};
use crate::models::{CommunityMetadata, CommunityRecord, PublicationDraft, PublicationRecord};
use crate::remote::{Notification, Topic};
use crate::store::Context;

struct CommunityState {
    data: Option<CommunityRecord>,
    online_peers: Option<Vec<String>>,
    publications: Arc<PublicationCache>,
}

// == Community Cache ==
pub struct CommunityCache {
    community_id: String,
    ctx: Arc<Context>,
    state: RwLock<CommunityState>,
    events: EventBus<CacheEvent>,
}

impl CommunityCache {
    // == Constructor ==
    /// Creates the cache, its publication cache, and starts listening to the
    /// community topics. Must be called inside a tokio runtime.
    pub fn new(ctx: Arc<Context>, community_id: &str) -> Result<Arc<Self>> {
        if community_id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "Please provide a community id".to_string(),
            ));
        }

        let capacity = ctx.config().event_capacity;
        let publications = PublicationCache::new(ctx.remote().clone(), community_id, capacity)?;

        let remote = ctx.remote();
        let update = remote.subscribe(&Topic::Community(community_id.to_string()));
        let peers = remote.subscribe(&Topic::Peers(community_id.to_string()));
        let synced = remote.subscribe(&Topic::Synced(community_id.to_string()));
        let syncing = remote.subscribe(&Topic::Syncing(community_id.to_string()));

        let cache = Arc::new(Self {
            community_id: community_id.to_string(),
            state: RwLock::new(CommunityState {
                data: None,
                online_peers: None,
                publications,
            }),
            events: EventBus::new(capacity),
            ctx,
        });

        tokio::spawn(listen(Arc::downgrade(&cache), update, peers, synced, syncing));
        Ok(cache)
    }

    /// Registers an observer for this community's events.
    pub fn subscribe(&self) -> Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// The current publication cache (replaced by `delete`).
    pub async fn publications(&self) -> Arc<PublicationCache> {
        self.state.read().await.publications.clone()
    }

    // == Get ==
    /// Returns the community metadata, fetched on first access, with `size`
    /// derived from the cached publications.
    pub async fn get(&self) -> Result<CommunityRecord> {
        let (cached, publications) = {
            let state = self.state.read().await;
            (state.data.clone(), state.publications.clone())
        };

        let data = match cached {
            Some(data) => data,
            None => {
                let fetched = self
                    .ctx
                    .remote()
                    .community_get(&self.community_id)
                    .await?
                    .unwrap_or_else(|| CommunityRecord::new(self.community_id.as_str()));
                let mut state = self.state.write().await;
                // A notification may have filled the slot while fetching
                state.data.get_or_insert(fetched).clone()
            }
        };

        Ok(data.with_size(publications.projected_size().await))
    }

    // == Publications ==
    /// Full publication list; refreshes the cached `size`.
    pub async fn get_all_publications(&self) -> Result<Vec<PublicationRecord>> {
        let publications = self.publications().await;
        let list = publications.get_all().await?;
        let size = publications.projected_size().await;
        if let Some(data) = self.state.write().await.data.as_mut() {
            data.size = size;
        }
        Ok(list)
    }

    /// Grows `size` by the draft's content length before posting.
    ///
    /// The reservation lapses once the posted record is cached. A rejected
    /// post takes it back before the error is returned.
    pub async fn post_publication(&self, data: PublicationDraft) -> Result<String> {
        let publications = self.publications().await;
        let delta = data.content_len() as i64;
        let reservation = publications.reserve(delta).await;

        match publications.post(data).await {
            Ok(id) => {
                publications.confirm(reservation, &id).await;
                Ok(id)
            }
            Err(e) => {
                publications.release(reservation).await;
                warn!(
                    "Post to {} failed, size reservation of {} released: {}",
                    self.community_id, delta, e
                );
                Err(e)
            }
        }
    }

    /// Shrinks `size` by the publication's content length before deleting.
    ///
    /// The reservation lapses once the record leaves the cache. A rejected
    /// delete restores the size before the error is returned.
    pub async fn delete_publication(&self, id: &str) -> Result<()> {
        let publications = self.publications().await;
        let delta = publications
            .get(id)
            .await?
            .map_or(0, |p| p.content_len() as i64);
        let reservation = publications.reserve_removal(id, -delta).await;

        match publications.delete(id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                publications.release(reservation).await;
                warn!(
                    "Delete of {}/{} failed, size restored: {}",
                    self.community_id, id, e
                );
                Err(e)
            }
        }
    }

    // == Peers ==
    /// Online peers with the local user's nickname first.
    pub async fn get_online_peers(&self) -> Result<Vec<String>> {
        let cached = self.state.read().await.online_peers.clone();
        let peers = match cached {
            Some(peers) => peers,
            None => {
                let fetched = self
                    .ctx
                    .remote()
                    .community_get_online_peers(&self.community_id)
                    .await?;
                let mut state = self.state.write().await;
                state.online_peers.get_or_insert(fetched).clone()
            }
        };

        let mut online = Vec::with_capacity(peers.len() + 1);
        online.push(self.ctx.nickname().await?);
        online.extend(peers);
        Ok(online)
    }

    // == Remote passthroughs ==
    pub async fn post(&self, data: CommunityMetadata) -> Result<()> {
        self.ctx.remote().community_post(&self.community_id, data).await
    }

    pub async fn put(&self, data: CommunityMetadata) -> Result<()> {
        self.ctx.remote().community_put(&self.community_id, data).await
    }

    // == Delete ==
    /// Drops every cached piece of this community, starts a fresh
    /// publication cache, then deletes the community remotely.
    pub async fn delete(&self) -> Result<()> {
        let fresh = PublicationCache::new(
            self.ctx.remote().clone(),
            &self.community_id,
            self.ctx.config().event_capacity,
        )?;
        {
            let mut state = self.state.write().await;
            state.data = None;
            state.online_peers = Some(Vec::new());
            state.publications = fresh;
        }
        self.events.emit(CacheEvent::Updated);
        info!("Cleared local state of community {}", self.community_id);

        self.ctx.remote().community_delete(&self.community_id).await
    }

    // == Notifications ==
    async fn apply(&self, notification: Notification) {
        match notification {
            Notification::Community(record) => {
                self.state.write().await.data = Some(record);
                self.events.emit(CacheEvent::Updated);
            }
            Notification::Peers(peers) => {
                self.state.write().await.online_peers = Some(peers);
                self.events.emit(CacheEvent::Peers);
            }
            Notification::Synced => {
                {
                    let mut state = self.state.write().await;
                    state.data = None;
                    state.online_peers = None;
                }
                debug!("Community {} synced, cache cleared", self.community_id);
                self.events.emit(CacheEvent::Synced);
            }
            Notification::Syncing => {
                self.events.emit(CacheEvent::Syncing);
            }
            other => trace!("Ignoring {:?} on community topics", other),
        }
    }
}

/// Applies notifications until the cache is dropped or a topic closes.
async fn listen(
    cache: Weak<CommunityCache>,
    mut update: Receiver<Notification>,
    mut peers: Receiver<Notification>,
    mut synced: Receiver<Notification>,
    mut syncing: Receiver<Notification>,
) {
    loop {
        let received = tokio::select! {
            r = update.recv() => r,
            r = peers.recv() => r,
            r = synced.recv() => r,
            r = syncing.recv() => r,
        };

        let Some(cache) = cache.upgrade() else {
            break;
        };

        match received {
            Ok(notification) => cache.apply(notification).await,
            Err(RecvError::Lagged(skipped)) => {
                warn!(
                    "Community listener for {} lagged by {} notifications, clearing cache",
                    cache.community_id, skipped
                );
                cache.apply(Notification::Synced).await;
            }
            Err(RecvError::Closed) => break,
        }
    }
}
