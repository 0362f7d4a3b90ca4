//! Offline Cache Worker
//!
//! One worker version: its lifecycle state machine and the handlers for
//! every event the host delivers to it. Workers of one origin share the
//! cache storage and the client registry; nothing else is shared, so fetch
//! handlers may run concurrently on an `Arc<OfflineWorker>`.

use std::sync::Arc;

use spin::{Mutex, RwLock};
use tokio::task::JoinSet;

use crate::allow_list::AllowList;
use crate::cache::{CacheStorage, SharedCacheStorage};
use crate::clients::{Clients, SharedClients};
use crate::config::{resolve, OfflineConfig};
use crate::error::{ConfigError, NetworkError, OfflineError, SyncError, WorkerError};
use crate::fallback::Fallback;
use crate::http::{Request, RequestMethod, Response};
use crate::lifecycle::{is_valid_transition, LifecycleEvent, LifecycleLog, WorkerState};
use crate::messages::{ClientMessage, MessageReply};
use crate::network::Network;
use crate::notify::{ClickOutcome, Notification, NotificationClick, PushMessage};
use crate::sync::{self, SyncQueue, SyncReport};

/// Where a response handed to the page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    OfflinePage,
    Placeholder,
}

/// Result of intercepting one fetch
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request natively
    Passthrough,
    /// Respond to the page with this response
    Respond {
        response: Response,
        source: ResponseSource,
    },
    /// The network failed and no fallback applies; the page sees a rejection
    Failed(NetworkError),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Respond { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Self::Respond { source, .. } => Some(*source),
            _ => None,
        }
    }
}

/// Events the host delivers to a worker
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Message(ClientMessage),
    Sync { tag: String },
    Push(PushMessage),
    NotificationClick(NotificationClick),
}

/// Result of dispatching a [`WorkerEvent`]
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// State after install (installed, or activated when skipping waiting)
    Installed(WorkerState),
    Activated,
    Fetch(FetchOutcome),
    Message(MessageReply),
    Sync(SyncReport),
    Notification(Notification),
    NotificationClick(ClickOutcome),
}

/// One version of the offline cache manager
pub struct OfflineWorker {
    version: String,
    origin: String,
    config: OfflineConfig,
    allow_list: AllowList,
    network: Arc<dyn Network>,
    storage: SharedCacheStorage,
    clients: SharedClients,
    sync_queue: Option<Arc<dyn SyncQueue>>,
    state: RwLock<WorkerState>,
    lifecycle: RwLock<LifecycleLog>,
    /// Dynamic cache writes still in flight
    writes: Mutex<JoinSet<()>>,
}

impl OfflineWorker {
    /// Create a worker over shared storage and clients. Fails if the
    /// configuration does not validate.
    pub fn new(
        version: impl Into<String>,
        origin: impl Into<String>,
        config: OfflineConfig,
        network: Arc<dyn Network>,
        storage: SharedCacheStorage,
        clients: SharedClients,
    ) -> Result<Self, ConfigError> {
        let allow_list = config.validate()?;
        Ok(Self {
            version: version.into(),
            origin: origin.into().trim_end_matches('/').to_string(),
            config,
            allow_list,
            network,
            storage,
            clients,
            sync_queue: None,
            state: RwLock::new(WorkerState::Parsed),
            lifecycle: RwLock::new(LifecycleLog::new()),
            writes: Mutex::new(JoinSet::new()),
        })
    }

    /// A worker with its own fresh storage and client registry
    pub fn standalone(
        version: impl Into<String>,
        origin: impl Into<String>,
        config: OfflineConfig,
        network: Arc<dyn Network>,
    ) -> Result<Self, ConfigError> {
        let storage = CacheStorage::shared(config.quota_bytes);
        Self::new(version, origin, config, network, storage, Clients::shared())
    }

    /// Attach the queue that background sync flushes
    pub fn with_sync_queue(mut self, queue: Arc<dyn SyncQueue>) -> Self {
        self.sync_queue = Some(queue);
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    pub fn is_active(&self) -> bool {
        self.state() == WorkerState::Activated
    }

    pub fn is_waiting(&self) -> bool {
        self.state() == WorkerState::Installed
    }

    pub fn storage(&self) -> &SharedCacheStorage {
        &self.storage
    }

    pub fn clients(&self) -> &SharedClients {
        &self.clients
    }

    /// Snapshot of the lifecycle events so far
    pub fn lifecycle(&self) -> LifecycleLog {
        self.lifecycle.read().clone()
    }

    fn record(&self, event: LifecycleEvent) {
        self.lifecycle.write().record(event);
    }

    fn transition(&self, to: WorkerState) -> Result<(), WorkerError> {
        let from = {
            let mut state = self.state.write();
            let from = *state;
            if !is_valid_transition(from, to) {
                return Err(WorkerError::InvalidStateTransition { from, to });
            }
            *state = to;
            from
        };
        log::debug!("[SW] {}: {} -> {}", self.version, from, to);
        self.record(LifecycleEvent::StateChange { from, to });
        Ok(())
    }

    // ── install ─────────────────────────────────────────────

    /// Pre-cache the shell. Every asset is fetched before anything is
    /// written; one failure discards the whole attempt and the worker
    /// becomes redundant.
    pub async fn install(&self) -> Result<WorkerState, WorkerError> {
        self.transition(WorkerState::Installing)?;

        let urls = self.config.shell_urls(&self.origin);
        log::info!(
            "[SW Install] {}: pre-caching {} shell assets",
            self.version,
            urls.len()
        );

        let mut pairs = Vec::with_capacity(urls.len());
        for url in urls {
            let request = Request::new(url.clone());
            match self.network.fetch(&request).await {
                Ok(response) if response.ok() => pairs.push((request, response)),
                Ok(response) => {
                    return Err(self.fail_install(url, format!("status {}", response.status)))
                }
                Err(e) => return Err(self.fail_install(url, e.to_string())),
            }
        }

        let assets = pairs.len();
        let committed = self
            .storage
            .write()
            .put_all(&self.config.cache_names.static_assets, pairs);
        if let Err(e) = committed {
            let name = self.config.cache_names.static_assets.clone();
            return Err(self.fail_install(name, e.to_string()));
        }

        self.record(LifecycleEvent::Installed { assets });
        self.transition(WorkerState::Installed)?;
        log::info!("[SW Install] {}: installed", self.version);

        if self.config.skip_waiting_on_install {
            self.activate()?;
        }
        Ok(self.state())
    }

    fn fail_install(&self, asset: String, reason: String) -> WorkerError {
        log::warn!(
            "[SW Install] {}: failed on {}: {}",
            self.version,
            asset,
            reason
        );
        if let Err(e) = self.transition(WorkerState::Redundant) {
            log::error!("[SW Install] {}: {}", self.version, e);
        }
        WorkerError::InstallFailed { asset, reason }
    }

    // ── activate ────────────────────────────────────────────

    /// Leave the waiting state now
    pub fn skip_waiting(&self) -> Result<(), WorkerError> {
        if !self.is_waiting() {
            return Err(WorkerError::NotWaiting {
                version: self.version.clone(),
            });
        }
        self.activate()
    }

    /// Purge stale generations, then claim every open page.
    pub fn activate(&self) -> Result<(), WorkerError> {
        self.transition(WorkerState::Activating)?;

        let deleted = self.purge_stale();
        self.record(LifecycleEvent::CachesPurged {
            deleted: deleted.clone(),
        });

        let count = self.clients.write().claim(&self.version);
        self.record(LifecycleEvent::ClientsClaimed { count });

        self.transition(WorkerState::Activated)?;
        log::info!(
            "[SW Activate] {}: purged {:?}, claimed {} clients",
            self.version,
            deleted,
            count
        );
        Ok(())
    }

    /// Delete every generation that is neither the current static nor the
    /// current dynamic one. Returns the names deleted.
    pub fn purge_stale(&self) -> Vec<String> {
        let names = &self.config.cache_names;
        let mut storage = self.storage.write();
        let stale: Vec<String> = storage
            .keys()
            .into_iter()
            .filter(|name| !names.is_current(name))
            .collect();
        for name in &stale {
            storage.delete(name);
        }
        stale
    }

    /// Mark this worker superseded
    pub fn retire(&self) -> Result<(), WorkerError> {
        if self.state() == WorkerState::Redundant {
            return Ok(());
        }
        self.transition(WorkerState::Redundant)
    }

    // ── fetch ───────────────────────────────────────────────

    /// Cache-first interception of one request.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        if !self.state().can_intercept_fetch() {
            return FetchOutcome::Passthrough;
        }
        if request.method != RequestMethod::Get || !request.is_http() {
            return FetchOutcome::Passthrough;
        }

        let cached = {
            let names = self.config.cache_names.current();
            self.storage.read().match_in(&names, &request)
        };
        if let Some(response) = cached {
            log::trace!("[SW Fetch] cache hit {}", request.url);
            return FetchOutcome::Respond {
                response,
                source: ResponseSource::Cache,
            };
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                if self.allow_list.is_eligible(&request, &response) {
                    self.spawn_dynamic_write(request, response.clone());
                }
                FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Network,
                }
            }
            Err(e) => self.offline_fallback(&request, e),
        }
    }

    fn offline_fallback(&self, request: &Request, error: NetworkError) -> FetchOutcome {
        let fallback = {
            let storage = self.storage.read();
            Fallback::for_request(request, &storage, &self.config, &self.origin)
        };
        match fallback {
            Fallback::OfflinePage(response) => {
                log::debug!("[SW Fetch] offline page for {}", request.url);
                FetchOutcome::Respond {
                    response,
                    source: ResponseSource::OfflinePage,
                }
            }
            Fallback::Placeholder(response) => FetchOutcome::Respond {
                response,
                source: ResponseSource::Placeholder,
            },
            Fallback::None => {
                log::debug!("[SW Fetch] {} failed: {}", request.url, error);
                FetchOutcome::Failed(error)
            }
        }
    }

    /// Write into the dynamic generation without holding up the response.
    /// Failures are logged and otherwise ignored. A write that lands after
    /// a generation was deleted is dropped rather than recreating it.
    fn spawn_dynamic_write(&self, request: Request, response: Response) {
        let storage = Arc::clone(&self.storage);
        let name = self.config.cache_names.dynamic.clone();
        let max_entries = self.config.max_dynamic_entries;
        let epoch = self.storage.read().epoch();

        let mut writes = self.writes.lock();
        while writes.try_join_next().is_some() {}
        writes.spawn(async move {
            let mut storage = storage.write();
            if storage.epoch() != epoch {
                log::debug!("[SW Cache] {}: dropping stale write of {}", name, request.url);
                return;
            }
            match storage.put_bounded(&name, &request, response, max_entries) {
                Ok(()) => log::trace!("[SW Cache] {}: stored {}", name, request.url),
                Err(e) => log::warn!("[SW Cache] {}: not storing {}: {}", name, request.url, e),
            }
        });
    }

    /// Wait for every in-flight dynamic cache write
    pub async fn settle(&self) {
        let mut writes = std::mem::take(&mut *self.writes.lock());
        while let Some(result) = writes.join_next().await {
            match result {
                Err(e) if !e.is_cancelled() => log::warn!("[SW Cache] write task failed: {}", e),
                _ => {}
            }
        }
    }

    // ── messages, sync, push ────────────────────────────────

    pub fn handle_message(&self, message: ClientMessage) -> Result<MessageReply, WorkerError> {
        match message {
            ClientMessage::SkipWaiting => {
                if !self.is_waiting() {
                    log::debug!("[SW Message] {}: SKIP_WAITING ignored in {}", self.version, self.state());
                    return Ok(MessageReply::Ignored);
                }
                self.skip_waiting()?;
                Ok(MessageReply::SkippedWaiting)
            }
            ClientMessage::ClearCache => {
                self.writes.lock().abort_all();
                let deleted = self.storage.write().clear();
                log::info!("[SW Message] {}: cleared {:?}", self.version, deleted);
                self.record(LifecycleEvent::CachesCleared {
                    deleted: deleted.clone(),
                });
                Ok(MessageReply::CacheCleared { deleted })
            }
            ClientMessage::PerformanceMetric { name, value } => {
                log::debug!("[SW Message] metric {} = {:?}", name, value);
                Ok(MessageReply::MetricAcknowledged { name })
            }
        }
    }

    /// Flush the pending-request queue when `tag` is the configured sync
    /// tag. Without a queue this is a no-op.
    pub async fn handle_sync(&self, tag: &str) -> Result<SyncReport, SyncError> {
        if tag != self.config.sync_tag {
            log::debug!("[SW Sync] ignoring tag {}", tag);
            return Ok(SyncReport::default());
        }
        match &self.sync_queue {
            Some(queue) => sync::flush(queue.as_ref(), self.network.as_ref()).await,
            None => Ok(SyncReport::default()),
        }
    }

    pub fn handle_push(&self, push: &PushMessage) -> Notification {
        Notification::from_push(push, &self.config.notification)
    }

    /// Resolve a click, opening or focusing the site root if asked to
    pub fn handle_notification_click(&self, click: &NotificationClick) -> ClickOutcome {
        let root = resolve(&self.origin, "/");
        let outcome = ClickOutcome::for_click(click, &root);
        if let ClickOutcome::OpenWindow(url) = &outcome {
            let controller = self.is_active().then_some(self.version.as_str());
            self.clients.write().open_window(url, controller);
        }
        outcome
    }

    /// Route one event to its handler
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventOutcome, OfflineError> {
        let outcome = match event {
            WorkerEvent::Install => EventOutcome::Installed(self.install().await?),
            WorkerEvent::Activate => {
                self.activate()?;
                EventOutcome::Activated
            }
            WorkerEvent::Fetch(request) => EventOutcome::Fetch(self.handle_fetch(request).await),
            WorkerEvent::Message(message) => EventOutcome::Message(self.handle_message(message)?),
            WorkerEvent::Sync { tag } => EventOutcome::Sync(self.handle_sync(&tag).await?),
            WorkerEvent::Push(push) => EventOutcome::Notification(self.handle_push(&push)),
            WorkerEvent::NotificationClick(click) => {
                EventOutcome::NotificationClick(self.handle_notification_click(&click))
            }
        };
        Ok(outcome)
    }
}

impl std::fmt::Debug for OfflineWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineWorker")
            .field("version", &self.version)
            .field("origin", &self.origin)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{RequestDestination, ResponseType};
    use crate::testing::MockNetwork;

    const ORIGIN: &str = "https://playgrounds.example";

    fn url(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    fn shell_network() -> Arc<MockNetwork> {
        let net = Arc::new(MockNetwork::new());
        net.ok(url("/"), "<html>root</html>")
            .ok(url("/index.html"), "<html>index</html>")
            .ok(url("/manifest.json"), "{}")
            .ok(url("/offline.html"), "<html>offline</html>");
        net
    }

    fn worker(net: Arc<MockNetwork>) -> OfflineWorker {
        OfflineWorker::standalone("v1", ORIGIN, OfflineConfig::default(), net).unwrap()
    }

    async fn active_worker(net: Arc<MockNetwork>) -> OfflineWorker {
        let w = worker(net);
        w.install().await.unwrap();
        w.activate().unwrap();
        w
    }

    #[tokio::test]
    async fn test_install_caches_every_shell_asset() {
        let w = worker(shell_network());
        assert_eq!(w.install().await.unwrap(), WorkerState::Installed);

        let storage = w.storage().read();
        let cache = storage.get("playground-static-v1").unwrap();
        assert_eq!(cache.len(), 4);
        for path in ["/", "/index.html", "/manifest.json", "/offline.html"] {
            assert!(cache.contains(&Request::new(url(path))), "{path}");
        }
    }

    #[tokio::test]
    async fn test_install_failure_commits_nothing() {
        let net = shell_network();
        net.fail(url("/manifest.json"));
        let w = worker(net);

        let err = w.install().await.unwrap_err();
        assert!(matches!(err, WorkerError::InstallFailed { ref asset, .. } if asset.ends_with("/manifest.json")));
        assert_eq!(w.state(), WorkerState::Redundant);
        assert!(w.storage().read().keys().is_empty());
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let net = shell_network();
        net.route(url("/offline.html"), Response::basic(404, ""));
        let w = worker(net);
        assert!(w.install().await.is_err());
        assert!(!w.storage().read().has("playground-static-v1"));
    }

    #[tokio::test]
    async fn test_install_skip_waiting_activates() {
        let config = OfflineConfig {
            skip_waiting_on_install: true,
            ..OfflineConfig::default()
        };
        let w = OfflineWorker::standalone("v1", ORIGIN, config, shell_network()).unwrap();
        assert_eq!(w.install().await.unwrap(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_purges_before_claiming() {
        let w = worker(shell_network());
        w.storage().write().open("playground-static-v0");
        w.storage().write().open("playground-v0");
        w.clients()
            .write()
            .add(crate::clients::ClientInfo::new("page", url("/")), None);

        w.install().await.unwrap();
        w.activate().unwrap();

        assert_eq!(w.storage().read().keys(), vec!["playground-static-v1".to_string()]);
        let log = w.lifecycle();
        let purged = log
            .position(|e| matches!(e, LifecycleEvent::CachesPurged { .. }))
            .unwrap();
        let claimed = log
            .position(|e| matches!(e, LifecycleEvent::ClientsClaimed { count: 1 }))
            .unwrap();
        assert!(purged < claimed);
        assert_eq!(w.clients().read().controlled_by("v1").len(), 1);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let w = worker(shell_network());
        assert!(matches!(
            w.activate(),
            Err(WorkerError::InvalidStateTransition { from: WorkerState::Parsed, .. })
        ));
    }

    #[tokio::test]
    async fn test_not_intercepting_before_activation() {
        let w = worker(shell_network());
        w.install().await.unwrap();
        let outcome = w.handle_fetch(Request::new(url("/index.html"))).await;
        assert!(matches!(outcome, FetchOutcome::Passthrough));
    }

    #[tokio::test]
    async fn test_non_get_and_non_http_pass_through() {
        let w = active_worker(shell_network()).await;
        let post = Request::post(url("/api/contact"), "{}");
        assert!(matches!(w.handle_fetch(post).await, FetchOutcome::Passthrough));
        let ext = Request::new("chrome-extension://abc/content.js");
        assert!(matches!(w.handle_fetch(ext).await, FetchOutcome::Passthrough));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let net = shell_network();
        let w = active_worker(net.clone()).await;
        let before = net.call_count(&url("/index.html"));

        let outcome = w.handle_fetch(Request::navigate(url("/index.html"))).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(net.call_count(&url("/index.html")), before);
    }

    #[tokio::test]
    async fn test_allow_listed_response_is_cached() {
        let net = shell_network();
        net.ok(url("/img/tower.png"), "PNGDATA");
        let w = active_worker(net.clone()).await;

        let first = w.handle_fetch(Request::image(url("/img/tower.png"))).await;
        assert_eq!(first.source(), Some(ResponseSource::Network));
        w.settle().await;

        net.set_offline(true);
        let second = w.handle_fetch(Request::image(url("/img/tower.png"))).await;
        assert_eq!(second.source(), Some(ResponseSource::Cache));
        assert_eq!(&second.response().unwrap().body[..], b"PNGDATA");
    }

    #[tokio::test]
    async fn test_unlisted_response_not_cached() {
        let net = shell_network();
        net.ok(url("/api/products"), "[]");
        let w = active_worker(net).await;

        w.handle_fetch(Request::new(url("/api/products"))).await;
        w.settle().await;
        assert!(!w.storage().read().has("playground-dynamic-v1"));
    }

    #[tokio::test]
    async fn test_error_and_opaque_responses_returned_uncached() {
        let net = shell_network();
        net.route(url("/missing.png"), Response::basic(404, "nope"));
        net.route(
            "https://cdn.other.example/logo.png",
            Response::opaque(),
        );
        let w = active_worker(net).await;

        let missing = w.handle_fetch(Request::image(url("/missing.png"))).await;
        assert_eq!(missing.response().unwrap().status, 404);
        let opaque = w
            .handle_fetch(Request::image("https://cdn.other.example/logo.png"))
            .await;
        assert_eq!(
            opaque.response().unwrap().response_type,
            ResponseType::Opaque
        );
        w.settle().await;
        assert!(!w.storage().read().has("playground-dynamic-v1"));
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_offline_page() {
        let net = shell_network();
        let w = active_worker(net.clone()).await;
        net.set_offline(true);

        let outcome = w.handle_fetch(Request::navigate(url("/projects/42"))).await;
        assert_eq!(outcome.source(), Some(ResponseSource::OfflinePage));
        assert_eq!(&outcome.response().unwrap().body[..], b"<html>offline</html>");
    }

    #[tokio::test]
    async fn test_offline_image_gets_placeholder() {
        let net = shell_network();
        let w = active_worker(net.clone()).await;
        net.set_offline(true);

        let outcome = w.handle_fetch(Request::image(url("/img/new.jpg"))).await;
        let response = outcome.response().unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Placeholder));
        assert_eq!(response.content_type(), Some("image/svg+xml"));
        assert!(response.ok());
    }

    #[tokio::test]
    async fn test_offline_script_propagates() {
        let net = shell_network();
        let w = active_worker(net.clone()).await;
        net.set_offline(true);

        let request = Request::new(url("/assets/app.js")).with_destination(RequestDestination::Script);
        assert!(matches!(
            w.handle_fetch(request).await,
            FetchOutcome::Failed(NetworkError::Offline { .. })
        ));
    }

    #[tokio::test]
    async fn test_quota_exceeded_write_does_not_fail_fetch() {
        let config = OfflineConfig {
            quota_bytes: 80,
            ..OfflineConfig::default()
        };
        let net = shell_network();
        net.ok(url("/img/huge.png"), vec![0u8; 4096]);
        let w = OfflineWorker::standalone("v1", ORIGIN, config, net).unwrap();
        w.install().await.unwrap();
        w.activate().unwrap();

        let outcome = w.handle_fetch(Request::image(url("/img/huge.png"))).await;
        assert_eq!(outcome.response().unwrap().body.len(), 4096);
        w.settle().await;
        assert!(!w.storage().read().has("playground-dynamic-v1"));
    }

    #[tokio::test]
    async fn test_dynamic_cache_is_bounded() {
        let config = OfflineConfig {
            max_dynamic_entries: Some(2),
            ..OfflineConfig::default()
        };
        let net = shell_network();
        for i in 0..3 {
            net.ok(url(&format!("/img/{i}.png")), "p");
        }
        let w = OfflineWorker::standalone("v1", ORIGIN, config, net).unwrap();
        w.install().await.unwrap();
        w.activate().unwrap();

        for i in 0..3 {
            w.handle_fetch(Request::image(url(&format!("/img/{i}.png")))).await;
            w.settle().await;
        }
        let storage = w.storage().read();
        let dynamic = storage.get("playground-dynamic-v1").unwrap();
        assert_eq!(dynamic.keys(), vec![url("/img/1.png"), url("/img/2.png")]);
    }

    #[tokio::test]
    async fn test_skip_waiting_message() {
        let w = worker(shell_network());
        assert_eq!(
            w.handle_message(ClientMessage::SkipWaiting).unwrap(),
            MessageReply::Ignored
        );
        w.install().await.unwrap();
        assert_eq!(
            w.handle_message(ClientMessage::SkipWaiting).unwrap(),
            MessageReply::SkippedWaiting
        );
        assert!(w.is_active());
    }

    #[tokio::test]
    async fn test_clear_cache_message() {
        let w = active_worker(shell_network()).await;
        let reply = w.handle_message(ClientMessage::ClearCache).unwrap();
        assert_eq!(
            reply,
            MessageReply::CacheCleared {
                deleted: vec!["playground-static-v1".to_string()]
            }
        );
        assert!(w.storage().read().keys().is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache_discards_pending_dynamic_writes() {
        let net = shell_network();
        net.ok(url("/img/a.png"), "PNG");
        let w = active_worker(net).await;

        let outcome = w.handle_fetch(Request::image(url("/img/a.png"))).await;
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        w.handle_message(ClientMessage::ClearCache).unwrap();
        w.settle().await;
        assert!(w.storage().read().keys().is_empty());
    }

    #[tokio::test]
    async fn test_write_sampled_before_clear_is_dropped() {
        let net = shell_network();
        net.ok(url("/img/b.png"), "PNG");
        let w = active_worker(net).await;

        // A reset from elsewhere, not through this worker's message handler
        w.handle_fetch(Request::image(url("/img/b.png"))).await;
        w.storage().write().clear();
        w.settle().await;
        assert!(!w.storage().read().has("playground-dynamic-v1"));
    }

    #[tokio::test]
    async fn test_metric_acknowledged_without_side_effects() {
        let w = active_worker(shell_network()).await;
        let keys = w.storage().read().keys();
        let reply = w
            .handle_message(ClientMessage::PerformanceMetric {
                name: "CLS".into(),
                value: Some(0.02),
            })
            .unwrap();
        assert_eq!(reply, MessageReply::MetricAcknowledged { name: "CLS".into() });
        assert_eq!(w.storage().read().keys(), keys);
    }

    #[tokio::test]
    async fn test_sync_without_queue_is_noop() {
        let w = active_worker(shell_network()).await;
        assert_eq!(w.handle_sync("sync-forms").await.unwrap(), SyncReport::default());
    }

    #[tokio::test]
    async fn test_notification_click_opens_root() {
        let w = active_worker(shell_network()).await;
        let outcome = w.handle_notification_click(&NotificationClick::action("explore"));
        assert_eq!(outcome, ClickOutcome::OpenWindow(url("/")));
        assert_eq!(w.clients().read().controlled_by("v1").len(), 1);

        let outcome = w.handle_notification_click(&NotificationClick::action("close"));
        assert_eq!(outcome, ClickOutcome::Dismissed);
        assert_eq!(w.clients().read().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_routes_events() {
        let w = worker(shell_network());
        assert!(matches!(
            w.dispatch(WorkerEvent::Install).await.unwrap(),
            EventOutcome::Installed(WorkerState::Installed)
        ));
        assert!(matches!(
            w.dispatch(WorkerEvent::Activate).await.unwrap(),
            EventOutcome::Activated
        ));
        let outcome = w
            .dispatch(WorkerEvent::Push(PushMessage::text("Spring sale")))
            .await
            .unwrap();
        match outcome {
            EventOutcome::Notification(n) => assert_eq!(n.body, "Spring sale"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(w.dispatch(WorkerEvent::Activate).await.is_err());
    }
}
