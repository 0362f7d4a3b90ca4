//! Background Sync
//!
//! Deferred writes (contact and quote forms submitted while offline) wait in
//! a queue kept outside the cache. On a sync trigger each item is POSTed;
//! successes leave the queue, failures stay for the next trigger. There is
//! no backoff: retry cadence belongs to the host.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spin::Mutex;
use uuid::Uuid;

use crate::error::SyncError;
use crate::http::Request;
use crate::network::Network;

/// A deferred POST
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub id: Uuid,
    pub url: String,
    pub body: String,
    pub content_type: String,
    pub queued_at: DateTime<Utc>,
}

impl PendingRequest {
    /// A JSON form submission
    pub fn json(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            body: body.into(),
            content_type: "application/json".to_string(),
            queued_at: Utc::now(),
        }
    }

    fn to_request(&self) -> Request {
        Request::post(self.url.clone(), Bytes::from(self.body.clone()))
            .with_header("Content-Type", self.content_type.clone())
    }
}

/// Persistent store of pending requests
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Items in the order they were queued
    async fn pending(&self) -> Result<Vec<PendingRequest>, SyncError>;

    async fn push(&self, item: PendingRequest) -> Result<(), SyncError>;

    /// Drop an item; removing an unknown id is not an error
    async fn remove(&self, id: Uuid) -> Result<(), SyncError>;
}

/// Queue held in memory
#[derive(Debug, Default)]
pub struct MemorySyncQueue {
    items: Mutex<Vec<PendingRequest>>,
}

impl MemorySyncQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncQueue for MemorySyncQueue {
    async fn pending(&self) -> Result<Vec<PendingRequest>, SyncError> {
        Ok(self.items.lock().clone())
    }

    async fn push(&self, item: PendingRequest) -> Result<(), SyncError> {
        self.items.lock().push(item);
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), SyncError> {
        self.items.lock().retain(|i| i.id != id);
        Ok(())
    }
}

/// Queue persisted as a JSON array in a single file.
///
/// Writes go to `<path>.tmp` and are renamed over the queue file, so a crash
/// mid-write leaves the previous queue intact.
#[derive(Debug)]
pub struct FileSyncQueue {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: tokio::sync::Mutex<()>,
}

impl FileSyncQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<PendingRequest>, SyncError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, items: &[PendingRequest]) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let json = serde_json::to_string_pretty(items)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SyncQueue for FileSyncQueue {
    async fn pending(&self) -> Result<Vec<PendingRequest>, SyncError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn push(&self, item: PendingRequest) -> Result<(), SyncError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        items.push(item);
        self.store(&items).await
    }

    async fn remove(&self, id: Uuid) -> Result<(), SyncError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() != before {
            self.store(&items).await?;
        }
        Ok(())
    }
}

/// Result of one flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items delivered and removed
    pub sent: usize,
    /// Items left queued for the next trigger
    pub retained: usize,
}

/// POST every queued item once.
pub async fn flush(queue: &dyn SyncQueue, network: &dyn Network) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport::default();

    for item in queue.pending().await? {
        match network.fetch(&item.to_request()).await {
            Ok(resp) if resp.ok() => {
                queue.remove(item.id).await?;
                report.sent += 1;
            }
            Ok(resp) => {
                log::warn!("[SW Sync] {} rejected with {}, keeping", item.url, resp.status);
                report.retained += 1;
            }
            Err(e) => {
                log::debug!("[SW Sync] {} not sent: {}", item.url, e);
                report.retained += 1;
            }
        }
    }

    log::info!(
        "[SW Sync] flushed: {} sent, {} retained",
        report.sent,
        report.retained
    );
    Ok(report)
}
