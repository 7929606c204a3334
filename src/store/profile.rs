//! User Profile
//!
//! The persisted singleton profile. Nickname changes are announced to every
//! joined community.

use std::sync::Arc;

use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheEvent, EventBus};
use crate::error::{Result, StoreError};
use crate::models::{Profile, ProfilePatch};
use crate::persist::{self, USER_KEY};
use crate::store::{Context, MembershipRegistry};
use crate::tasks::spawn_warmup_task;

// == User Profile ==
pub struct UserProfile {
    ctx: Arc<Context>,
    communities: Arc<MembershipRegistry>,
    events: EventBus<CacheEvent>,
}

impl UserProfile {
    pub fn new(ctx: Arc<Context>, communities: Arc<MembershipRegistry>) -> Self {
        let events = EventBus::new(ctx.config().event_capacity);
        Self {
            ctx,
            communities,
            events,
        }
    }

    pub fn subscribe(&self) -> Receiver<CacheEvent> {
        self.events.subscribe()
    }

    // == Get ==
    pub async fn get(&self) -> Result<Profile> {
        self.ctx.profile().await
    }

    // == Put ==
    /// Merges `patch` over the profile and persists it before announcing
    /// the nickname to every joined community.
    pub async fn put(&self, patch: ProfilePatch) -> Result<Profile> {
        if let Some(message) = patch.validate() {
            return Err(StoreError::InvalidArgument(message));
        }
        self.ctx.init_profile().await?;

        let updated = {
            let mut profile = self.ctx.profile_lock().write().await;
            let mut next = profile.clone();
            next.apply(patch);
            persist::save(self.ctx.kv(), USER_KEY, &next).await?;
            *profile = next.clone();
            next
        };
        info!("Profile updated, nickname '{}'", updated.nickname);

        let joined = self.ctx.membership_ids().await?;
        if !joined.is_empty() {
            if let Err(e) = self
                .ctx
                .remote()
                .community_put_nicknames(&joined, &updated.nickname)
                .await
            {
                warn!(
                    "Could not announce nickname to {} communities: {}",
                    joined.len(),
                    e
                );
            }
        }

        self.events.emit(CacheEvent::Updated);
        Ok(updated)
    }

    // == Warm-up ==
    /// Starts the bounded pass that primes every joined community's
    /// publications.
    pub fn warm_up(&self) -> JoinHandle<()> {
        spawn_warmup_task(
            self.communities.clone(),
            self.ctx.config().warmup_concurrency,
        )
    }

    // == Blacklist ==
    /// Leaves every joined community listed in `blacklist`, then restarts
    /// the warm-up pass for the remaining ones.
    pub async fn remove_blacklisted_communities(
        &self,
        blacklist: &[String],
    ) -> Result<JoinHandle<()>> {
        self.ctx.init_profile().await?;
        self.ctx.init_memberships().await?;

        for id in self.communities.get_all().await? {
            if blacklist.contains(&id) {
                warn!("Leaving blacklisted community {}", id);
                self.communities.delete(&id).await?;
            }
        }

        Ok(self.warm_up())
    }
}
