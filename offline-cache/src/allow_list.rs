//! Dynamic Cache Allow-List
//!
//! Decides which successfully fetched resources become available offline
//! after their first visit.

use regex::RegexSet;

use crate::error::ConfigError;
use crate::http::{Request, RequestMethod, Response};

/// Compiled set of URL rules.
#[derive(Debug, Clone)]
pub struct AllowList {
    patterns: Vec<String>,
    set: RegexSet,
}

impl AllowList {
    /// Compile `patterns`. Each one is validated on its own so the error
    /// names the offending pattern.
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();

        for pattern in &patterns {
            regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }

        let set = RegexSet::new(&patterns).map_err(|source| ConfigError::InvalidPattern {
            pattern: patterns.join(" | "),
            source,
        })?;

        Ok(Self { patterns, set })
    }

    /// An allow-list that matches nothing
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: RegexSet::empty(),
        }
    }

    /// Check a URL against every rule
    pub fn matches(&self, url: &str) -> bool {
        self.set.is_match(url)
    }

    /// Source patterns, in configuration order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a fetched pair may be written into the dynamic generation.
    pub fn is_eligible(&self, request: &Request, response: &Response) -> bool {
        request.method == RequestMethod::Get
            && response.is_cacheable()
            && self.matches(&request.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_allow_list;
    use crate::http::ResponseType;

    fn site_list() -> AllowList {
        AllowList::new(default_allow_list()).unwrap()
    }

    #[test]
    fn test_matches_fonts_images_and_bundles() {
        let list = site_list();
        assert!(list.matches("https://fonts.googleapis.com/css2?family=Inter"));
        assert!(list.matches("https://fonts.gstatic.com/s/inter/v12/a.woff2"));
        assert!(list.matches("https://example.com/img/slide-tower.webp"));
        assert!(list.matches("https://example.com/assets/index-4f2a.js"));
        assert!(list.matches("https://example.com/assets/index-4f2a.css"));
    }

    #[test]
    fn test_rejects_documents_and_api() {
        let list = site_list();
        assert!(!list.matches("https://example.com/products"));
        assert!(!list.matches("https://example.com/api/contact"));
        assert!(!list.matches("https://example.com/catalog.pdf"));
    }

    #[test]
    fn test_invalid_pattern_is_named() {
        let err = AllowList::new(["ok\\.png$", "(unclosed"]).unwrap_err();
        match err {
            ConfigError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "(unclosed"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_matches_nothing() {
        let list = AllowList::empty();
        assert!(list.is_empty());
        assert!(!list.matches("https://example.com/a.png"));
    }

    #[test]
    fn test_eligibility_needs_get_200_basic() {
        let list = site_list();
        let req = Request::new("https://example.com/a.png");
        assert!(list.is_eligible(&req, &Response::basic(200, "png")));
        assert!(!list.is_eligible(&req, &Response::basic(404, "")));
        assert!(!list.is_eligible(
            &req,
            &Response::new(200).with_type(ResponseType::Cors)
        ));
        let post = Request::post("https://example.com/a.png", "x");
        assert!(!list.is_eligible(&post, &Response::basic(200, "png")));
    }
}
