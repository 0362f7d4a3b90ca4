//! Request / Response Model
//!
//! The subset of the fetch model the cache manager reasons about: method,
//! destination and mode on the way in, status and response type on the way
//! out. Bodies are `Bytes`, so handing one response to both the page and
//! the cache is a reference-count bump rather than a second read.

use std::collections::BTreeMap;

use bytes::Bytes;

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl RequestMethod {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

/// What the requesting page intends to do with the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestDestination {
    /// fetch() / XHR
    #[default]
    Empty,
    Audio,
    Document,
    Font,
    Frame,
    Image,
    Manifest,
    Script,
    Style,
    Video,
    Worker,
}

/// Request mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    SameOrigin,
    NoCors,
    #[default]
    Cors,
    /// Top-level or frame navigation
    Navigate,
}

/// An outgoing request as seen by the interceptor
#[derive(Debug, Clone)]
pub struct Request {
    /// Absolute request URL
    pub url: String,
    /// HTTP method
    pub method: RequestMethod,
    /// Request destination
    pub destination: RequestDestination,
    /// Request mode
    pub mode: RequestMode,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body (if any)
    pub body: Option<Bytes>,
}

impl Request {
    /// Create a plain GET request
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RequestMethod::Get,
            destination: RequestDestination::Empty,
            mode: RequestMode::Cors,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// A top-level document navigation
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::new(url)
            .with_destination(RequestDestination::Document)
            .with_mode(RequestMode::Navigate)
    }

    /// An `<img>` load
    pub fn image(url: impl Into<String>) -> Self {
        Self::new(url)
            .with_destination(RequestDestination::Image)
            .with_mode(RequestMode::NoCors)
    }

    /// A POST carrying `body`
    pub fn post(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let mut request = Self::new(url).with_method(RequestMethod::Post);
        request.body = Some(body.into());
        request
    }

    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_destination(mut self, destination: RequestDestination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Whether this request loads a document
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate || self.destination == RequestDestination::Document
    }

    /// URL scheme, lowercased, without the trailing `:`
    pub fn scheme(&self) -> Option<String> {
        let (scheme, _) = self.url.split_once(':')?;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
            return None;
        }
        Some(scheme.to_ascii_lowercase())
    }

    /// Whether the URL is http or https
    pub fn is_http(&self) -> bool {
        matches!(self.scheme().as_deref(), Some("http") | Some("https"))
    }

    /// Storage key for this request. Only GET requests are ever keyed.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.url)
    }
}

/// Response type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Same-origin, fully inspectable
    Basic,
    /// Cross-origin with CORS headers
    Cors,
    /// Constructed locally
    #[default]
    Default,
    /// Network error
    Error,
    /// Cross-origin without CORS; status and body are hidden
    Opaque,
    OpaqueRedirect,
}

/// A response snapshot
#[derive(Debug, Clone)]
pub struct Response {
    /// Response type
    pub response_type: ResponseType,
    /// Final URL
    pub url: String,
    /// Status code
    pub status: u16,
    /// Status text
    pub status_text: String,
    /// Response headers (lowercased names)
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response with an empty body
    pub fn new(status: u16) -> Self {
        Self {
            response_type: ResponseType::Default,
            url: String::new(),
            status,
            status_text: status_text_for(status).to_string(),
            headers: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    /// A same-origin response as the network layer would produce it
    pub fn basic(status: u16, body: impl Into<Bytes>) -> Self {
        Self::new(status)
            .with_type(ResponseType::Basic)
            .with_body(body)
    }

    /// A cross-origin no-cors response
    pub fn opaque() -> Self {
        Self::new(0).with_type(ResponseType::Opaque)
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Check if response is OK
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the response may be written into a cache generation:
    /// exactly 200 and fully inspectable.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    /// Header lookup, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Stored size of this response
    pub fn size(&self) -> usize {
        self.body.len()
            + self
                .headers
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
    }
}

/// Get status text for status code
pub(crate) fn status_text_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}
