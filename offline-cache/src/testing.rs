//! In-memory network double for tests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bytes::Bytes;
use spin::Mutex;

use crate::error::NetworkError;
use crate::http::{Request, RequestMethod, Response};
use crate::network::Network;

/// A scripted network. Unknown URLs answer 404; `set_offline(true)` makes
/// every fetch reject.
#[derive(Debug, Default)]
pub struct MockNetwork {
    routes: Mutex<BTreeMap<String, Response>>,
    failing: Mutex<BTreeSet<String>>,
    offline: Mutex<bool>,
    calls: Mutex<Vec<(RequestMethod, String)>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`
    pub fn route(&self, url: impl Into<String>, response: Response) -> &Self {
        self.routes.lock().insert(url.into(), response);
        self
    }

    /// Serve a same-origin 200 with `body`
    pub fn ok(&self, url: impl Into<String>, body: impl Into<Bytes>) -> &Self {
        let url = url.into();
        let response = Response::basic(200, body).with_url(url.clone());
        self.route(url, response)
    }

    /// Reject fetches of `url` as if the connection dropped
    pub fn fail(&self, url: impl Into<String>) -> &Self {
        self.failing.lock().insert(url.into());
        self
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    /// Every fetch attempted, in order
    pub fn calls(&self) -> Vec<(RequestMethod, String)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|(_, u)| u == url).count()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls
            .lock()
            .push((request.method, request.url.clone()));

        if *self.offline.lock() || self.failing.lock().contains(&request.url) {
            return Err(NetworkError::Offline {
                url: request.url.clone(),
            });
        }

        Ok(self
            .routes
            .lock()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::basic(404, "").with_url(request.url.clone())))
    }
}
