//! Store Module
//!
//! Composition root: builds the shared context, the user profile and the
//! membership registry once, loads persisted state, and starts the warm-up
//! pass.

mod context;
mod membership;
mod profile;

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::persist::KvStore;
use crate::remote::RemoteChannel;

pub use context::Context;
pub use membership::{MembershipEvent, MembershipRegistry};
pub use profile::UserProfile;

// == Store ==
/// The state layer handed to the presentation layer.
///
/// Construct one per process with [`Store::open`] and share it by `Arc`.
pub struct Store {
    pub user: Arc<UserProfile>,
    pub communities: Arc<MembershipRegistry>,
    warmup: Mutex<Option<JoinHandle<()>>>,
}

impl Store {
    /// Builds the store and loads the profile and memberships.
    ///
    /// When `config.eager_warmup` is set the warm-up pass is started in the
    /// background; see [`Store::abort_background`].
    pub async fn open(
        remote: Arc<dyn RemoteChannel>,
        kv: Arc<dyn KvStore>,
        config: Config,
    ) -> Result<Self> {
        let eager = config.eager_warmup;
        let ctx = Context::new(remote, kv, config);
        ctx.init_profile().await?;
        ctx.init_memberships().await?;

        let communities = Arc::new(MembershipRegistry::new(ctx.clone()));
        let user = Arc::new(UserProfile::new(ctx, communities.clone()));
        let warmup = eager.then(|| user.warm_up());

        info!(
            "Store opened with {} joined communities",
            communities.len().await?
        );

        Ok(Self {
            user,
            communities,
            warmup: Mutex::new(warmup),
        })
    }

    /// Aborts the startup warm-up pass if it is still running.
    pub fn abort_background(&self) {
        let mut warmup = self.warmup.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = warmup.take() {
            handle.abort();
        }
    }

    /// Waits for the startup warm-up pass, if one was started.
    pub async fn wait_background(&self) {
        let handle = {
            let mut warmup = self.warmup.lock().unwrap_or_else(|e| e.into_inner());
            warmup.take()
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
