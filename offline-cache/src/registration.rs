//! Worker Registration
//!
//! Tracks the versions installed for one origin: at most one active worker
//! and at most one waiting behind it. All versions share the same cache
//! storage and client registry.

use std::sync::Arc;

use crate::cache::{CacheStorage, SharedCacheStorage};
use crate::clients::{ClientInfo, Clients, SharedClients};
use crate::config::OfflineConfig;
use crate::error::{ConfigError, WorkerError};
use crate::http::Request;
use crate::lifecycle::WorkerState;
use crate::messages::{ClientMessage, MessageReply};
use crate::network::Network;
use crate::worker::{FetchOutcome, OfflineWorker};

/// Registration for one origin
#[derive(Debug)]
pub struct Registration {
    origin: String,
    storage: SharedCacheStorage,
    clients: SharedClients,
    active: Option<Arc<OfflineWorker>>,
    waiting: Option<Arc<OfflineWorker>>,
}

impl Registration {
    /// Create a registration with empty storage of the given quota
    pub fn new(origin: impl Into<String>, quota: usize) -> Self {
        Self::with_storage(origin, CacheStorage::shared(quota))
    }

    /// Create a registration over existing storage
    pub fn with_storage(origin: impl Into<String>, storage: SharedCacheStorage) -> Self {
        Self {
            origin: origin.into(),
            storage,
            clients: Clients::shared(),
            active: None,
            waiting: None,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn storage(&self) -> &SharedCacheStorage {
        &self.storage
    }

    pub fn clients(&self) -> &SharedClients {
        &self.clients
    }

    /// Get active worker
    pub fn active(&self) -> Option<&Arc<OfflineWorker>> {
        self.active.as_ref()
    }

    /// Get waiting worker
    pub fn waiting(&self) -> Option<&Arc<OfflineWorker>> {
        self.waiting.as_ref()
    }

    /// Build a worker bound to this registration's storage and clients
    pub fn worker(
        &self,
        version: impl Into<String>,
        config: OfflineConfig,
        network: Arc<dyn Network>,
    ) -> Result<OfflineWorker, ConfigError> {
        OfflineWorker::new(
            version,
            self.origin.clone(),
            config,
            network,
            Arc::clone(&self.storage),
            Arc::clone(&self.clients),
        )
    }

    /// Install a new version. With no active worker it activates at once;
    /// otherwise it waits unless it skipped waiting during install. A failed
    /// install leaves the current workers untouched.
    pub async fn register(&mut self, worker: OfflineWorker) -> Result<WorkerState, WorkerError> {
        let worker = Arc::new(worker);
        let state = worker.install().await?;

        if state == WorkerState::Installed && self.active.is_none() {
            worker.activate()?;
        }

        if worker.is_active() {
            self.promote(Arc::clone(&worker))?;
        } else {
            if let Some(previous) = self.waiting.replace(Arc::clone(&worker)) {
                log::info!(
                    "[SW Registration] {} replaces waiting {}",
                    worker.version(),
                    previous.version()
                );
                previous.retire()?;
            }
            log::info!("[SW Registration] {} waiting", worker.version());
        }
        Ok(worker.state())
    }

    /// Make an activated worker the active one and retire what it replaced.
    /// An older waiting worker is superseded too and never takes over later.
    fn promote(&mut self, worker: Arc<OfflineWorker>) -> Result<(), WorkerError> {
        if let Some(waiting) = self.waiting.take() {
            if !Arc::ptr_eq(&waiting, &worker) {
                log::info!(
                    "[SW Registration] {} supersedes waiting {}",
                    worker.version(),
                    waiting.version()
                );
                waiting.retire()?;
            }
        }
        if let Some(previous) = self.active.replace(Arc::clone(&worker)) {
            previous.retire()?;
        }
        log::info!("[SW Registration] {} active", worker.version());
        Ok(())
    }

    /// Activate the waiting worker, if any
    fn activate_waiting(&mut self) -> Result<bool, WorkerError> {
        let Some(waiting) = self.waiting.take() else {
            return Ok(false);
        };
        waiting.skip_waiting()?;
        self.promote(waiting)?;
        Ok(true)
    }

    /// Deliver a page message. SKIP_WAITING goes to the waiting worker;
    /// everything else to the active one.
    pub fn post_message(&mut self, message: ClientMessage) -> Result<MessageReply, WorkerError> {
        if message == ClientMessage::SkipWaiting {
            return Ok(if self.activate_waiting()? {
                MessageReply::SkippedWaiting
            } else {
                MessageReply::Ignored
            });
        }
        match &self.active {
            Some(active) => active.handle_message(message),
            None => Ok(MessageReply::Ignored),
        }
    }

    /// A page was opened
    pub fn open_page(&self, id: impl Into<String>, url: impl Into<String>) {
        let active = self.active.as_ref().map(|w| w.version());
        self.clients
            .write()
            .add(ClientInfo::new(id, url), active);
    }

    /// A page was closed. Once no page is controlled by the active worker,
    /// the waiting worker takes over. Returns whether that happened.
    pub fn close_page(&mut self, id: &str) -> Result<bool, WorkerError> {
        self.clients.write().remove(id);

        let still_controlled = match &self.active {
            Some(active) => !self
                .clients
                .read()
                .controlled_by(active.version())
                .is_empty(),
            None => false,
        };
        if still_controlled {
            return Ok(false);
        }
        self.activate_waiting()
    }

    /// Route a fetch to the active worker
    pub async fn fetch(&self, request: Request) -> FetchOutcome {
        match &self.active {
            Some(active) => active.handle_fetch(request).await,
            None => FetchOutcome::Passthrough,
        }
    }
}
