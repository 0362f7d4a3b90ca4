//! Offline Cache Manager
//!
//! Request interception and caching policy for the playground catalog
//! site's installable shell.
//!
//! # Architecture
//!
//! - `config`: versioned cache names, shell asset list, dynamic allow-list
//! - `http`: request/response model seen by the interceptor
//! - `cache`: named cache generations and the shared storage
//! - `allow_list`: eligibility of fetched resources for the dynamic cache
//! - `network`: the `Network` seam (reqwest-backed with the `http` feature)
//! - `lifecycle`: worker states and valid transitions
//! - `worker`: one worker version (install → activate → fetch/message/sync/push)
//! - `registration`: active and waiting versions for one origin
//! - `fallback`: offline page and image placeholder
//! - `messages`: `SKIP_WAITING`, `CLEAR_CACHE`, `PERFORMANCE_METRIC`
//! - `sync`: background sync queue and flush
//! - `notify`: push notifications and click handling
//! - `clients`: open pages and their controller

pub mod allow_list;
pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod lifecycle;
pub mod messages;
pub mod network;
pub mod notify;
pub mod registration;
pub mod sync;
pub mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use allow_list::AllowList;
pub use cache::{Cache, CacheStorage, SharedCacheStorage};
pub use clients::{ClientInfo, Clients, SharedClients};
pub use config::{CacheNames, OfflineConfig};
pub use error::{CacheError, ConfigError, NetworkError, OfflineError, SyncError, WorkerError};
pub use http::{Request, RequestDestination, RequestMethod, RequestMode, Response, ResponseType};
pub use lifecycle::WorkerState;
pub use messages::{ClientMessage, MessageReply};
pub use network::Network;
pub use registration::Registration;
pub use worker::{EventOutcome, FetchOutcome, OfflineWorker, ResponseSource, WorkerEvent};
