//! Content recovered from a live production page.

use serde::{Deserialize, Serialize};

/// Structured content prepared for import into the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    /// Normalized key of the missing URL.
    pub key: String,
    /// URL that was actually fetched.
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub body_text: String,
    /// Whether `body_text` was cut at the configured bound.
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub headings: Vec<String>,
}
