//! Registry of live chat connections.
//!
//! The map is only reachable through the methods below, each of which takes
//! the lock for the duration of one bookkeeping step. Snapshots are copied
//! out so that writes to clients never happen while the lock is held.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use super::connection::{ConnectionId, LineSink};

/// Thread-safe set of connections currently in the chat
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ConnectionId, Arc<dyn LineSink>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection.
    ///
    /// Returns `false` and leaves the existing entry untouched if `id` is
    /// already registered.
    pub async fn add(&self, id: ConnectionId, sink: Arc<dyn LineSink>) -> bool {
        let mut clients = self.clients.lock().await;
        if clients.contains_key(&id) {
            tracing::warn!("Connection {} is already registered", id);
            return false;
        }
        clients.insert(id, sink);
        tracing::debug!("Connection {} registered ({} total)", id, clients.len());
        true
    }

    /// Unregister a connection. Idempotent.
    ///
    /// Returns `true` only for the call that actually removed the entry.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(&id).is_some();
        if removed {
            tracing::debug!("Connection {} unregistered ({} left)", id, clients.len());
        }
        removed
    }

    /// Unregister several connections under one lock acquisition.
    ///
    /// Returns how many were actually present.
    pub async fn remove_all(&self, ids: &[ConnectionId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut clients = self.clients.lock().await;
        ids.iter().filter(|id| clients.remove(id).is_some()).count()
    }

    /// Point-in-time copy of every registered connection except `excluded`
    pub async fn snapshot_excluding(
        &self,
        excluded: ConnectionId,
    ) -> Vec<(ConnectionId, Arc<dyn LineSink>)> {
        let clients = self.clients.lock().await;
        clients
            .iter()
            .filter(|(id, _)| **id != excluded)
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect()
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.clients.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}
