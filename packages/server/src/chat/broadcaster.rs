//! Fan-out of one chat line to every other registered connection.

use std::sync::Arc;

use futures_util::future::join_all;

use super::{connection::ConnectionId, registry::ClientRegistry};

/// Outcome of one broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Targets that accepted the full line
    pub delivered: usize,
    /// Targets whose write failed and that were removed from the registry
    pub pruned: Vec<ConnectionId>,
}

/// Relays lines to the registry's connections.
///
/// A failed write is terminal for that target: it is pruned from the
/// registry after the sweep and never retried. Other targets are unaffected.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        Self { registry }
    }

    /// Send `text` plus a newline to every registered connection but `excluding`.
    ///
    /// Returns once every write has finished, so consecutive calls from one
    /// sender reach each recipient in order.
    pub async fn broadcast(&self, text: &str, excluding: ConnectionId) -> BroadcastReport {
        let targets = self.registry.snapshot_excluding(excluding).await;
        let line = format!("{}\n", text);

        let results = join_all(targets.iter().map(|(id, sink)| {
            let line = line.as_str();
            async move { (*id, sink.send(line).await) }
        }))
        .await;

        let mut report = BroadcastReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!("Dropping connection {} after failed send: {}", id, e);
                    report.pruned.push(id);
                }
            }
        }

        if !report.pruned.is_empty() {
            let removed = self.registry.remove_all(&report.pruned).await;
            tracing::debug!("Pruned {} dead connection(s) from the registry", removed);
        }

        report
    }
}
