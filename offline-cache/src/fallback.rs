//! Offline fallbacks for failed fetches.
//!
//! Only destinations with a sensible substitute get one: documents fall back
//! to the cached offline page, images to an inline SVG placeholder. Every
//! other failure propagates to the page.

use crate::cache::CacheStorage;
use crate::config::OfflineConfig;
use crate::http::{Request, RequestDestination, Response};

/// Placeholder served for images that cannot be loaded offline.
pub const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200">"##,
    r##"<rect width="200" height="200" fill="#f3f4f6"/>"##,
    r##"<text x="100" y="100" text-anchor="middle" dy=".3em" font-family="sans-serif" font-size="14" fill="#9ca3af">"##,
    "Image unavailable offline",
    "</text></svg>"
);

/// Served to navigations when the offline page itself was never cached.
const OFFLINE_HTML: &str = concat!(
    "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">",
    "<title>Offline</title></head><body>",
    "<h1>You are offline</h1>",
    "<p>Check your connection and try again.</p>",
    "</body></html>"
);

/// Substitute chosen for a failed fetch
#[derive(Debug, Clone)]
pub enum Fallback {
    /// Offline document for a navigation
    OfflinePage(Response),
    /// Synthetic image
    Placeholder(Response),
    /// No substitute; the failure propagates
    None,
}

impl Fallback {
    /// Pick the substitute for `request`, reading the offline page from the
    /// current static generation.
    pub fn for_request(
        request: &Request,
        storage: &CacheStorage,
        config: &OfflineConfig,
        origin: &str,
    ) -> Self {
        if request.is_navigation() {
            let offline = Request::navigate(config.offline_page_url(origin));
            let names = config.cache_names.current();
            let response = storage
                .match_in(&names, &offline)
                .unwrap_or_else(synthetic_offline_page);
            return Self::OfflinePage(response);
        }

        if request.destination == RequestDestination::Image {
            return Self::Placeholder(placeholder_image());
        }

        Self::None
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::OfflinePage(r) | Self::Placeholder(r) => Some(r),
            Self::None => None,
        }
    }
}

/// The inline SVG placeholder, status 200
pub fn placeholder_image() -> Response {
    Response::new(200)
        .with_header("Content-Type", "image/svg+xml")
        .with_header("Cache-Control", "no-store")
        .with_body(PLACEHOLDER_SVG)
}

fn synthetic_offline_page() -> Response {
    Response::new(503)
        .with_header("Content-Type", "text/html; charset=utf-8")
        .with_body(OFFLINE_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://playgrounds.example";

    #[test]
    fn test_navigation_gets_cached_offline_page() {
        let config = OfflineConfig::default();
        let mut storage = CacheStorage::new(1024 * 1024);
        storage
            .put(
                &config.cache_names.static_assets,
                &Request::new(config.offline_page_url(ORIGIN)),
                Response::basic(200, "<h1>offline</h1>"),
            )
            .unwrap();

        let fb = Fallback::for_request(
            &Request::navigate(format!("{ORIGIN}/products")),
            &storage,
            &config,
            ORIGIN,
        );
        match fb {
            Fallback::OfflinePage(resp) => assert_eq!(&resp.body[..], b"<h1>offline</h1>"),
            other => panic!("unexpected fallback: {other:?}"),
        }
    }

    #[test]
    fn test_navigation_without_cached_page_still_answers() {
        let config = OfflineConfig::default();
        let storage = CacheStorage::new(1024);
        let resp = Fallback::for_request(
            &Request::navigate(format!("{ORIGIN}/")),
            &storage,
            &config,
            ORIGIN,
        )
        .into_response()
        .unwrap();
        assert_eq!(resp.status, 503);
        assert!(resp.content_type().unwrap().starts_with("text/html"));
    }

    #[test]
    fn test_image_gets_svg_placeholder() {
        let config = OfflineConfig::default();
        let storage = CacheStorage::new(1024);
        let resp = Fallback::for_request(
            &Request::image(format!("{ORIGIN}/img/swing.jpg")),
            &storage,
            &config,
            ORIGIN,
        )
        .into_response()
        .unwrap();
        assert!(resp.ok());
        assert_eq!(resp.content_type(), Some("image/svg+xml"));
        assert!(std::str::from_utf8(&resp.body).unwrap().starts_with("<svg"));
    }

    #[test]
    fn test_other_destinations_propagate() {
        let config = OfflineConfig::default();
        let storage = CacheStorage::new(1024);
        let fb = Fallback::for_request(
            &Request::new(format!("{ORIGIN}/api/products.json")),
            &storage,
            &config,
            ORIGIN,
        );
        assert!(matches!(fb, Fallback::None));
    }
}
