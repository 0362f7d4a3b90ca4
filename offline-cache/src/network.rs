//! Network Seam
//!
//! The cache manager never talks to sockets itself; every network round
//! trip goes through a [`Network`] implementation supplied by the host.

use async_trait::async_trait;

use crate::error::NetworkError;
use crate::http::{Request, Response};

/// Performs network fetches on behalf of the worker.
///
/// A rejected fetch (`Err`) means no response arrived at all: offline,
/// connection refused, aborted. HTTP error statuses are `Ok` responses.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

#[cfg(feature = "http")]
pub use self::reqwest_backend::HttpNetwork;

#[cfg(feature = "http")]
mod reqwest_backend {
    use super::*;
    use crate::http::{RequestMethod, ResponseType};

    /// `reqwest`-backed network for hosted builds.
    ///
    /// Responses from `origin` are reported as [`ResponseType::Basic`];
    /// everything else as [`ResponseType::Cors`], which keeps third-party
    /// responses out of the dynamic cache.
    #[derive(Debug, Clone)]
    pub struct HttpNetwork {
        client: reqwest::Client,
        origin: String,
    }

    impl HttpNetwork {
        pub fn new(origin: impl Into<String>) -> Self {
            Self::with_client(reqwest::Client::new(), origin)
        }

        pub fn with_client(client: reqwest::Client, origin: impl Into<String>) -> Self {
            Self {
                client,
                origin: origin.into().trim_end_matches('/').to_string(),
            }
        }

        fn method(method: RequestMethod) -> reqwest::Method {
            match method {
                RequestMethod::Get => reqwest::Method::GET,
                RequestMethod::Post => reqwest::Method::POST,
                RequestMethod::Put => reqwest::Method::PUT,
                RequestMethod::Delete => reqwest::Method::DELETE,
                RequestMethod::Patch => reqwest::Method::PATCH,
                RequestMethod::Head => reqwest::Method::HEAD,
                RequestMethod::Options => reqwest::Method::OPTIONS,
            }
        }
    }

    #[async_trait]
    impl Network for HttpNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
            let url = reqwest::Url::parse(&request.url).map_err(|_| NetworkError::InvalidUrl {
                url: request.url.clone(),
            })?;

            let mut builder = self.client.request(Self::method(request.method), url);
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            let resp = builder.send().await.map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    NetworkError::Offline {
                        url: request.url.clone(),
                    }
                } else {
                    NetworkError::Backend(e.to_string())
                }
            })?;

            let final_url = resp.url().to_string();
            let response_type = if final_url.starts_with(&format!("{}/", self.origin)) {
                ResponseType::Basic
            } else {
                ResponseType::Cors
            };
            let status = resp.status().as_u16();
            let mut response = Response::new(status)
                .with_type(response_type)
                .with_url(final_url);
            for (name, value) in resp.headers() {
                if let Ok(value) = value.to_str() {
                    response = response.with_header(name.as_str(), value);
                }
            }
            let body = resp
                .bytes()
                .await
                .map_err(|e| NetworkError::Backend(e.to_string()))?;
            Ok(response.with_body(body))
        }
    }

}
