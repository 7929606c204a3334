//! Publication Warm-up Task
//!
//! Background pass that fetches the publications of every joined community
//! so their data is cached and redistributed without the UI visiting them.
//! At most `concurrency` communities are fetched at a time.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::MembershipRegistry;

/// Spawns the warm-up pass over the registry's current memberships.
///
/// # Arguments
/// * `communities` - Registry whose joined communities are primed
/// * `concurrency` - Maximum number of communities fetched at once (min 1)
///
/// # Returns
/// A JoinHandle for the spawned task, which can be awaited or aborted.
pub fn spawn_warmup_task(
    communities: Arc<MembershipRegistry>,
    concurrency: usize,
) -> JoinHandle<()> {
    let concurrency = concurrency.max(1);

    tokio::spawn(async move {
        let ids = match communities.get_all().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Warm-up skipped, memberships unavailable: {}", e);
                return;
            }
        };
        info!(
            "Warming {} communities, {} at a time",
            ids.len(),
            concurrency
        );

        let permits = Arc::new(Semaphore::new(concurrency));
        let mut tasks = JoinSet::new();
        for id in ids {
            // Waiting here keeps at most `concurrency` tasks alive
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let communities = communities.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = warm_one(&communities, &id).await;
                (id, result)
            });
        }

        let mut warmed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(count))) => {
                    debug!("Warmed {} with {} publications", id, count);
                    warmed += 1;
                }
                Ok((id, Err(e))) => warn!("Warm-up of {} failed: {}", id, e),
                Err(e) => warn!("Warm-up task panicked or was cancelled: {}", e),
            }
        }
        info!("Warm-up finished, {} communities primed", warmed);
    })
}

async fn warm_one(communities: &MembershipRegistry, id: &str) -> Result<usize> {
    let community = communities.get(id).await?;
    Ok(community.get_all_publications().await?.len())
}
