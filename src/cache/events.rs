//! Per-instance change notifications for observers (the UI).

use tokio::sync::broadcast;

// == Cache Event ==
/// What changed on a cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    /// Cached content changed
    Updated,
    /// Online peer list changed
    Peers,
    /// The backing store started replicating this community
    Syncing,
    /// Replication finished; cached state was invalidated
    Synced,
}

// == Event Bus ==
/// Typed observer registry backed by a broadcast channel.
///
/// Emitting never blocks; observers that fall behind see `Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus<E> {
    tx: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Registers a listener; it receives events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Returns the number of listeners reached.
    pub fn emit(&self, event: E) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}
