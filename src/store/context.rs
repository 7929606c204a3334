//! Shared state owned by the composition root.
//!
//! Every subsystem receives the same `Arc<Context>`: collaborators, config,
//! the profile and the membership list, each loaded exactly once.

use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::models::Profile;
use crate::persist::{self, KvStore, MEMBERSHIP_KEY, USER_KEY};
use crate::remote::RemoteChannel;

// == Context ==
pub struct Context {
    remote: Arc<dyn RemoteChannel>,
    kv: Arc<dyn KvStore>,
    config: Config,
    profile: RwLock<Profile>,
    profile_ready: OnceCell<()>,
    /// Joined community ids in join order, no duplicates
    memberships: RwLock<Vec<String>>,
    memberships_ready: OnceCell<()>,
}

impl Context {
    // == Constructor ==
    pub fn new(remote: Arc<dyn RemoteChannel>, kv: Arc<dyn KvStore>, config: Config) -> Arc<Self> {
        Arc::new(Self {
            remote,
            kv,
            config,
            profile: RwLock::new(Profile::guest()),
            profile_ready: OnceCell::new(),
            memberships: RwLock::new(Vec::new()),
            memberships_ready: OnceCell::new(),
        })
    }

    pub fn remote(&self) -> &Arc<dyn RemoteChannel> {
        &self.remote
    }

    pub fn kv(&self) -> &dyn KvStore {
        self.kv.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // == Profile ==
    /// Loads the persisted profile once; concurrent callers share the load.
    ///
    /// Without a stored profile the generated guest profile is persisted.
    /// A failed load leaves the cell empty so the next caller retries.
    pub async fn init_profile(&self) -> Result<()> {
        self.profile_ready
            .get_or_try_init(|| async {
                match persist::load::<Profile>(self.kv(), USER_KEY).await? {
                    Some(stored) => {
                        debug!("Loaded profile '{}'", stored.nickname);
                        *self.profile.write().await = stored;
                    }
                    None => {
                        let fresh = self.profile.read().await.clone();
                        persist::save(self.kv(), USER_KEY, &fresh).await?;
                        info!("Created guest profile '{}'", fresh.nickname);
                    }
                }
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    /// Current profile snapshot.
    pub async fn profile(&self) -> Result<Profile> {
        self.init_profile().await?;
        Ok(self.profile.read().await.clone())
    }

    pub async fn nickname(&self) -> Result<String> {
        Ok(self.profile().await?.nickname)
    }

    pub(crate) fn profile_lock(&self) -> &RwLock<Profile> {
        &self.profile
    }

    // == Memberships ==
    /// Loads the persisted membership list once; concurrent callers share
    /// the load. Duplicate ids in storage are collapsed.
    pub async fn init_memberships(&self) -> Result<()> {
        self.memberships_ready
            .get_or_try_init(|| async {
                let stored: Vec<String> = persist::load(self.kv(), MEMBERSHIP_KEY)
                    .await?
                    .unwrap_or_default();
                let mut ids: Vec<String> = Vec::with_capacity(stored.len());
                for id in stored {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                debug!("Loaded {} memberships", ids.len());
                *self.memberships.write().await = ids;
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    /// Joined ids in join order.
    pub async fn membership_ids(&self) -> Result<Vec<String>> {
        self.init_memberships().await?;
        Ok(self.memberships.read().await.clone())
    }

    pub(crate) fn membership_lock(&self) -> &RwLock<Vec<String>> {
        &self.memberships
    }
}
