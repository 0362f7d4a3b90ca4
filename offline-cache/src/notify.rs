//! Push messages and notification clicks.
//!
//! Presentation only; nothing here touches cache state.

use serde::{Deserialize, Serialize};

use crate::config::NotificationConfig;

/// Action id that opens the site
pub const ACTION_EXPLORE: &str = "explore";
/// Action id that only dismisses
pub const ACTION_CLOSE: &str = "close";

/// Push event payload
#[derive(Debug, Clone, Default)]
pub struct PushMessage {
    data: Option<Vec<u8>>,
}

impl PushMessage {
    pub fn new(data: Option<Vec<u8>>) -> Self {
        Self { data }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Some(text.into().into_bytes()))
    }

    /// Get data
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Payload as text, if present, non-empty and valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        self.data
            .as_deref()
            .and_then(|d| std::str::from_utf8(d).ok())
            .filter(|s| !s.trim().is_empty())
    }
}

/// A button on a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// System notification to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the notification for a push. The body is the payload text,
    /// or the configured default when there is none.
    pub fn from_push(push: &PushMessage, config: &NotificationConfig) -> Self {
        Self {
            title: config.title.clone(),
            body: push
                .as_text()
                .map(str::to_string)
                .unwrap_or_else(|| config.default_body.clone()),
            icon: config.icon.clone(),
            badge: config.badge.clone(),
            vibrate: vec![100, 50, 100],
            actions: vec![
                NotificationAction {
                    action: ACTION_EXPLORE.to_string(),
                    title: "View".to_string(),
                },
                NotificationAction {
                    action: ACTION_CLOSE.to_string(),
                    title: "Close".to_string(),
                },
            ],
        }
    }
}

/// A click on a notification or one of its actions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationClick {
    /// `None` when the notification body itself was clicked
    pub action: Option<String>,
}

impl NotificationClick {
    pub fn body() -> Self {
        Self::default()
    }

    pub fn action(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
        }
    }
}

/// What the host should do after a click
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Open (or focus) a window at this URL
    OpenWindow(String),
    /// Close the notification and do nothing else
    Dismissed,
}

impl ClickOutcome {
    /// `explore` opens the site root; `close` and unknown actions dismiss.
    /// A click on the notification body opens the root as well.
    pub fn for_click(click: &NotificationClick, app_root: &str) -> Self {
        match click.action.as_deref() {
            None | Some(ACTION_EXPLORE) => Self::OpenWindow(app_root.to_string()),
            Some(_) => Self::Dismissed,
        }
    }
}
