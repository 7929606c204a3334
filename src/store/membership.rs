//! Membership Registry
//!
//! The persisted set of communities the user belongs to, and the single
//! `CommunityCache` per community id.
//!
//! `get_all` lists the most recently joined community first.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast::Receiver;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::cache::{CommunityCache, EventBus};
use crate::error::{Result, StoreError};
use crate::persist::{self, MEMBERSHIP_KEY};
use crate::store::Context;

// == Membership Event ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    /// Membership changed; carries the new list in `get_all` order
    Updated(Vec<String>),
}

// == Membership Registry ==
pub struct MembershipRegistry {
    ctx: Arc<Context>,
    communities: RwLock<HashMap<String, Arc<CommunityCache>>>,
    events: EventBus<MembershipEvent>,
}

impl MembershipRegistry {
    pub fn new(ctx: Arc<Context>) -> Self {
        let events = EventBus::new(ctx.config().event_capacity);
        Self {
            ctx,
            communities: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> Receiver<MembershipEvent> {
        self.events.subscribe()
    }

    // == Get All ==
    /// Joined community ids, most recently joined first.
    pub async fn get_all(&self) -> Result<Vec<String>> {
        let mut ids = self.ctx.membership_ids().await?;
        ids.reverse();
        Ok(ids)
    }

    // == Has ==
    pub async fn has(&self, id: &str) -> Result<bool> {
        self.ctx.init_memberships().await?;
        Ok(self.ctx.membership_lock().read().await.iter().any(|m| m == id))
    }

    // == Get ==
    /// Returns the community cache for `id`, creating it on first use.
    /// Joined or not, the same instance is returned for the same id.
    pub async fn get(&self, id: &str) -> Result<Arc<CommunityCache>> {
        self.ctx.init_memberships().await?;
        if let Some(existing) = self.communities.read().await.get(id) {
            return Ok(existing.clone());
        }

        let mut communities = self.communities.write().await;
        if let Some(existing) = communities.get(id) {
            return Ok(existing.clone());
        }
        let community = CommunityCache::new(self.ctx.clone(), id)?;
        communities.insert(id.to_string(), community.clone());
        Ok(community)
    }

    // == Post ==
    /// Joins a community. Joining twice is a no-op apart from re-persisting.
    ///
    /// Resolves once the membership is durable. The local nickname is then
    /// announced to the community; a failed announcement is logged, not
    /// returned, since the join itself already happened.
    pub async fn post(&self, id: &str) -> Result<Arc<CommunityCache>> {
        let community = self.get(id).await?;

        {
            let mut members = self.ctx.membership_lock().write().await;
            let added = !members.iter().any(|m| m == id);
            if added {
                members.push(id.to_string());
            }
            if let Err(e) = persist::save(self.ctx.kv(), MEMBERSHIP_KEY, &*members).await {
                if added {
                    members.pop();
                }
                return Err(e);
            }
        }
        info!("Joined community {}", id);

        match self.ctx.nickname().await {
            Ok(nickname) => {
                if let Err(e) = self
                    .ctx
                    .remote()
                    .community_put_nicknames(&[id.to_string()], &nickname)
                    .await
                {
                    warn!("Could not announce nickname to {}: {}", id, e);
                }
            }
            Err(e) => warn!("No nickname to announce to {}: {}", id, e),
        }

        self.events.emit(MembershipEvent::Updated(self.get_all().await?));
        Ok(community)
    }

    // == Delete ==
    /// Leaves a community: the removal is persisted first, then the
    /// community's cached state is cleared and it is deleted remotely.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let community = self.get(id).await?;

        {
            let mut members = self.ctx.membership_lock().write().await;
            let Some(position) = members.iter().position(|m| m == id) else {
                return Err(StoreError::InvalidArgument(format!(
                    "not a member of community '{}'",
                    id
                )));
            };
            let removed = members.remove(position);
            if let Err(e) = persist::save(self.ctx.kv(), MEMBERSHIP_KEY, &*members).await {
                members.insert(position, removed);
                return Err(e);
            }
        }
        info!("Left community {}", id);
        self.events.emit(MembershipEvent::Updated(self.get_all().await?));

        community.delete().await
    }

    /// Number of joined communities.
    pub async fn len(&self) -> Result<usize> {
        self.ctx.init_memberships().await?;
        Ok(self.ctx.membership_lock().read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::persist::{KvStore, MemoryKv, Persisted, USER_KEY};
    use crate::remote::LocalChannel;
    use serde_json::json;

    struct Fixture {
        channel: Arc<LocalChannel>,
        kv: Arc<MemoryKv>,
        registry: MembershipRegistry,
    }

    fn fixture() -> Fixture {
        let channel = Arc::new(LocalChannel::new());
        let kv = Arc::new(MemoryKv::new());
        let ctx = Context::new(channel.clone(), kv.clone(), Config::default());
        Fixture {
            channel,
            kv,
            registry: MembershipRegistry::new(ctx),
        }
    }

    async fn persisted(kv: &MemoryKv) -> Vec<String> {
        let raw = kv.raw(MEMBERSHIP_KEY).await.unwrap();
        Persisted::<Vec<String>>::decode(raw).unwrap().data
    }

    #[tokio::test]
    async fn test_post_then_get_all() {
        let f = fixture();
        f.registry.post("c1").await.unwrap();
        f.registry.post("c2").await.unwrap();

        assert_eq!(f.registry.get_all().await.unwrap(), vec!["c2", "c1"]);

        f.registry.delete("c1").await.unwrap();
        assert_eq!(f.registry.get_all().await.unwrap(), vec!["c2"]);
    }

    #[tokio::test]
    async fn test_post_survives_unreadable_profile() {
        let f = fixture();
        f.kv.set(USER_KEY, json!(42)).await.unwrap();

        f.registry.post("c1").await.unwrap();

        assert!(f.registry.has("c1").await.unwrap());
        assert_eq!(persisted(&f.kv).await, vec!["c1"]);
        assert!(f.channel.nicknames("c1").await.is_empty());
    }

    #[tokio::test]
    async fn test_has_follows_post_and_delete() {
        let f = fixture();
        assert!(!f.registry.has("c1").await.unwrap());

        f.registry.post("c1").await.unwrap();
        assert!(f.registry.has("c1").await.unwrap());

        f.registry.delete("c1").await.unwrap();
        assert!(!f.registry.has("c1").await.unwrap());
    }

    #[tokio::test]
    async fn test_post_is_idempotent() {
        let f = fixture();
        let first = f.registry.post("c1").await.unwrap();
        let second = f.registry.post("c1").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(f.registry.len().await.unwrap(), 1);
        assert_eq!(persisted(&f.kv).await, vec!["c1"]);
    }

    #[tokio::test]
    async fn test_get_is_memoized() {
        let f = fixture();
        let a = f.registry.get("c9").await.unwrap();
        let b = f.registry.get("c9").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!f.registry.has("c9").await.unwrap());
    }

    #[tokio::test]
    async fn test_membership_persisted_after_each_change() {
        let f = fixture();
        f.registry.post("c1").await.unwrap();
        f.registry.post("c2").await.unwrap();
        assert_eq!(persisted(&f.kv).await, vec!["c1", "c2"]);

        f.registry.delete("c1").await.unwrap();
        assert_eq!(persisted(&f.kv).await, vec!["c2"]);
    }

    #[tokio::test]
    async fn test_post_announces_nickname() {
        let f = fixture();
        f.kv.set("user", json!({"nickname": "Ann"})).await.unwrap();

        f.registry.post("c1").await.unwrap();

        assert_eq!(f.channel.nicknames("c1").await, vec!["Ann"]);
    }

    #[tokio::test]
    async fn test_post_emits_snapshot() {
        let f = fixture();
        let mut events = f.registry.subscribe();

        f.registry.post("c1").await.unwrap();
        f.registry.post("c2").await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            MembershipEvent::Updated(vec!["c1".to_string()])
        );
        assert_eq!(
            events.recv().await.unwrap(),
            MembershipEvent::Updated(vec!["c2".to_string(), "c1".to_string()])
        );
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back() {
        let f = fixture();
        f.registry.post("c1").await.unwrap();
        f.kv.set_failing(true);

        assert!(matches!(
            f.registry.post("c2").await,
            Err(StoreError::Persistence(_))
        ));
        assert!(!f.registry.has("c2").await.unwrap());

        assert!(f.registry.delete("c1").await.is_err());
        assert!(f.registry.has("c1").await.unwrap());
    }

    #[tokio::test]
    async fn test_offline_join_still_durable() {
        let f = fixture();
        f.channel.set_available(false);

        f.registry.post("c1").await.unwrap();

        assert!(f.registry.has("c1").await.unwrap());
        assert_eq!(persisted(&f.kv).await, vec!["c1"]);
    }

    #[tokio::test]
    async fn test_delete_unknown_is_invalid() {
        let f = fixture();
        assert!(matches!(
            f.registry.delete("nope").await,
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let f = fixture();
        assert!(matches!(
            f.registry.post("").await,
            Err(StoreError::InvalidArgument(_))
        ));
    }
}
