//! Page-to-worker messages.
//!
//! Pages post JSON objects tagged by `type`:
//!
//! ```json
//! { "type": "SKIP_WAITING" }
//! { "type": "CLEAR_CACHE" }
//! { "type": "PERFORMANCE_METRIC", "name": "LCP", "value": 1830.5 }
//! ```

use serde::{Deserialize, Serialize};

/// Inbound control message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Activate a waiting worker now
    SkipWaiting,
    /// Delete every cache generation
    ClearCache,
    /// Informational; acknowledged, never acted on
    PerformanceMetric {
        #[serde(default)]
        name: String,
        #[serde(default)]
        value: Option<f64>,
    },
}

impl ClientMessage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        // Serializing a plain tagged enum cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Outcome of handling a message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageReply {
    /// The worker left the waiting state and is now active
    SkippedWaiting,
    /// Generations deleted by a cache reset
    CacheCleared { deleted: Vec<String> },
    /// Metric accepted
    MetricAcknowledged { name: String },
    /// The message does not apply to this worker's state
    Ignored,
}
