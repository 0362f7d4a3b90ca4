use crate::lifecycle::WorkerState;

/// Errors from the cache storage layer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache not found: {name}")]
    NotFound { name: String },

    #[error("Quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Only GET requests can be cached, got {method}")]
    UnsupportedMethod { method: &'static str },
}

/// Errors from the network seam.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The host is offline or the connection could not be established.
    #[error("Network unreachable: {url}")]
    Offline { url: String },

    #[error("Request aborted: {url}")]
    Aborted { url: String },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("Network backend error: {0}")]
    Backend(String),
}

/// Errors from worker lifecycle operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: WorkerState, to: WorkerState },

    #[error("Install failed while pre-caching {asset}: {reason}")]
    InstallFailed { asset: String, reason: String },

    #[error("Worker {version} is not waiting")]
    NotWaiting { version: String },

    #[error("Worker {version} is redundant")]
    Redundant { version: String },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors from loading and validating configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid allow-list pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Cache name for {kind} bucket is empty")]
    EmptyCacheName { kind: &'static str },

    #[error("Cache name {name} is used by more than one bucket")]
    DuplicateCacheName { name: String },

    #[error("Shell asset {path} is not root-relative")]
    InvalidShellAsset { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the background sync queue.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Any error surfaced by this crate.
#[derive(thiserror::Error, Debug)]
pub enum OfflineError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Invalid message: {0}")]
    Message(#[from] serde_json::Error),
}
