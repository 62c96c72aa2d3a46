//! Data-refresh events
//!
//! Upstream loaders report completed warehouse loads through a
//! [`RefreshNotifier`]; a listener task purges the affected cache tags.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::{CacheTag, QueryCache};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEvent {
    pub id: Uuid,
    /// Refreshed tags; empty means every tag
    pub tags: Vec<CacheTag>,
    /// Who reported the refresh, for the log
    pub source: String,
}

impl RefreshEvent {
    pub fn new(tags: Vec<CacheTag>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tags,
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("refresh listener has stopped")]
pub struct ListenerClosed;

/// Sending half handed to whatever observes warehouse loads
#[derive(Debug, Clone)]
pub struct RefreshNotifier {
    tx: mpsc::Sender<RefreshEvent>,
}

impl RefreshNotifier {
    pub async fn refreshed(&self, event: RefreshEvent) -> Result<(), ListenerClosed> {
        self.tx.send(event).await.map_err(|_| ListenerClosed)
    }
}

pub fn channel(buffer: usize) -> (RefreshNotifier, mpsc::Receiver<RefreshEvent>) {
    let (tx, rx) = mpsc::channel(buffer);
    (RefreshNotifier { tx }, rx)
}

/// Invalidate cache tags as refresh events arrive; ends when every notifier
/// is dropped
pub fn spawn_refresh_listener(cache: QueryCache, mut rx: mpsc::Receiver<RefreshEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let purged = if event.tags.is_empty() {
                cache.invalidate_all()
            } else {
                event.tags.iter().map(|tag| cache.invalidate(*tag)).sum()
            };
            info!(
                "Data refresh {} from '{}' purged {} entries across {:?}",
                event.id, event.source, purged, event.tags
            );
        }
        debug!("Refresh listener stopped");
    })
}

/// Periodically drop index references to expired entries
pub fn spawn_index_pruner(cache: QueryCache, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            cache.prune_index();
        }
    })
}
