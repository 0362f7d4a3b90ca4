//! Offline cache configuration.
//!
//! Everything a deploy must keep in sync with the served site lives here:
//! the versioned cache names, the shell asset list and the dynamic
//! allow-list. Loaded from TOML or taken from [`OfflineConfig::default`].

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::allow_list::AllowList;
use crate::error::ConfigError;

/// Versioned cache generation names. Bump all three on deploy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheNames {
    /// Legacy single-bucket generation; never kept on activation.
    #[serde(default = "default_app_name")]
    pub app: String,
    /// Shell assets fetched at install.
    #[serde(default = "default_static_name", rename = "static")]
    pub static_assets: String,
    /// Allow-listed resources cached at runtime.
    #[serde(default = "default_dynamic_name")]
    pub dynamic: String,
}

impl CacheNames {
    /// Names of the generations that survive activation.
    pub fn current(&self) -> [&str; 2] {
        [self.static_assets.as_str(), self.dynamic.as_str()]
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current().contains(&name)
    }
}

impl Default for CacheNames {
    fn default() -> Self {
        Self {
            app: default_app_name(),
            static_assets: default_static_name(),
            dynamic: default_dynamic_name(),
        }
    }
}

/// Presentation of push notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,
    #[serde(default = "default_notification_body")]
    pub default_body: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_icon")]
    pub badge: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            default_body: default_notification_body(),
            icon: default_icon(),
            badge: default_icon(),
        }
    }
}

/// Top-level configuration injected into every worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfflineConfig {
    #[serde(default)]
    pub cache_names: CacheNames,
    #[serde(default = "default_shell_assets")]
    pub shell_assets: Vec<String>,
    #[serde(default = "default_offline_page")]
    pub offline_page: String,
    #[serde(default = "default_allow_list")]
    pub allow_list: Vec<String>,
    #[serde(default)]
    pub skip_waiting_on_install: bool,
    #[serde(default = "default_max_dynamic_entries")]
    pub max_dynamic_entries: Option<usize>,
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: usize,
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            cache_names: CacheNames::default(),
            shell_assets: default_shell_assets(),
            offline_page: default_offline_page(),
            allow_list: default_allow_list(),
            skip_waiting_on_install: false,
            max_dynamic_entries: default_max_dynamic_entries(),
            quota_bytes: default_quota_bytes(),
            sync_tag: default_sync_tag(),
            notification: NotificationConfig::default(),
        }
    }
}

impl OfflineConfig {
    /// Parse a config from a TOML file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string. Missing keys take the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check names and paths, and compile the allow-list.
    pub fn validate(&self) -> Result<AllowList, ConfigError> {
        let names = [
            ("app", &self.cache_names.app),
            ("static", &self.cache_names.static_assets),
            ("dynamic", &self.cache_names.dynamic),
        ];
        let mut seen = BTreeSet::new();
        for (kind, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyCacheName { kind });
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateCacheName { name: name.clone() });
            }
        }

        for path in self.shell_assets.iter().chain(Some(&self.offline_page)) {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidShellAsset { path: path.clone() });
            }
        }

        AllowList::new(&self.allow_list)
    }

    /// Shell assets resolved against `origin`.
    pub fn shell_urls(&self, origin: &str) -> Vec<String> {
        self.shell_assets
            .iter()
            .map(|path| resolve(origin, path))
            .collect()
    }

    pub fn offline_page_url(&self, origin: &str) -> String {
        resolve(origin, &self.offline_page)
    }
}

/// Join an origin and a root-relative path.
pub fn resolve(origin: &str, path: &str) -> String {
    format!("{}{}", origin.trim_end_matches('/'), path)
}

fn default_app_name() -> String {
    "playground-v1".to_string()
}

fn default_static_name() -> String {
    "playground-static-v1".to_string()
}

fn default_dynamic_name() -> String {
    "playground-dynamic-v1".to_string()
}

fn default_shell_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/offline.html"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_page() -> String {
    "/offline.html".to_string()
}

/// Google Fonts, raster/vector images, and built stylesheets and scripts.
pub(crate) fn default_allow_list() -> Vec<String> {
    [
        r"^https://fonts\.googleapis\.com/",
        r"^https://fonts\.gstatic\.com/",
        r"\.(?:png|jpg|jpeg|svg|gif|webp|ico)(?:\?.*)?$",
        r"\.(?:css|js)(?:\?.*)?$",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_dynamic_entries() -> Option<usize> {
    Some(60)
}

fn default_quota_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_sync_tag() -> String {
    "sync-forms".to_string()
}

fn default_notification_title() -> String {
    "Playground Equipment".to_string()
}

fn default_notification_body() -> String {
    "New update available".to_string()
}

fn default_icon() -> String {
    "/icons/icon-192x192.png".to_string()
}
