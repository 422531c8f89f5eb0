//! Inventory URL entries and content-type tags.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parity::normalize;

/// Classification of a URL's origin or purpose.
///
/// Unrecognized names are kept as [`ContentType::Other`] so inventories produced by a
/// newer collector still load; the strategy engine treats them as unclassified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    Blog,
    News,
    Listing,
    Neighborhood,
    PropertyType,
    Static,
    Unknown,
    Other(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Blog => "blog",
            Self::News => "news",
            Self::Listing => "listing",
            Self::Neighborhood => "neighborhood",
            Self::PropertyType => "property-type",
            Self::Static => "static",
            Self::Unknown => "unknown",
            Self::Other(name) => name,
        }
    }

    /// Parse a content-type name. Never fails.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "blog" => Self::Blog,
            "news" => Self::News,
            "listing" => Self::Listing,
            "neighborhood" => Self::Neighborhood,
            "property-type" | "property_type" => Self::PropertyType,
            "static" => Self::Static,
            "" | "unknown" => Self::Unknown,
            _ => Self::Other(name),
        }
    }

    /// Editorial types whose live pages can be scraped back into the content store.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Blog | Self::News)
    }
}

impl From<String> for ContentType {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<ContentType> for String {
    fn from(value: ContentType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialOrd for ContentType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ContentType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// One observed or declared URL.
///
/// The normalized key is always derived from the raw URL (or from the route template
/// for template entries); a value supplied by the inventory file is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "UrlEntryRecord")]
pub struct UrlEntry {
    #[serde(rename = "url")]
    raw_url: String,
    #[serde(rename = "normalized")]
    normalized_key: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    route_template: Option<String>,
}

impl UrlEntry {
    /// Create a literal entry.
    pub fn new(raw_url: impl Into<String>, content_type: ContentType) -> Self {
        let raw_url = raw_url.into();
        Self {
            normalized_key: normalize(&raw_url),
            raw_url,
            content_type,
            last_modified: None,
            priority: None,
            route_template: None,
        }
    }

    /// Create a template entry standing for a family of concrete URLs.
    pub fn template(template: impl Into<String>, content_type: ContentType) -> Self {
        let template = template.into();
        Self {
            normalized_key: normalize(&template),
            raw_url: template.clone(),
            content_type,
            last_modified: None,
            priority: None,
            route_template: Some(template),
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn normalized_key(&self) -> &str {
        &self.normalized_key
    }

    pub fn route_template(&self) -> Option<&str> {
        self.route_template.as_deref()
    }

    pub fn is_template(&self) -> bool {
        self.route_template.is_some()
    }

    /// Priority used for ordering; absent counts as zero.
    pub fn sort_priority(&self) -> f64 {
        self.priority.unwrap_or(0.0)
    }
}

/// Wire shape of an inventory record.
#[derive(Deserialize)]
struct UrlEntryRecord {
    url: String,
    #[serde(default, rename = "type", alias = "content_type")]
    content_type: Option<ContentType>,
    #[serde(default)]
    last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    priority: Option<f64>,
    #[serde(default)]
    route_template: Option<String>,
}

impl From<UrlEntryRecord> for UrlEntry {
    fn from(record: UrlEntryRecord) -> Self {
        let content_type = record.content_type.unwrap_or(ContentType::Unknown);
        let template = record
            .route_template
            .filter(|t| !t.trim().is_empty());

        let mut entry = match template {
            Some(template) => {
                let mut entry = UrlEntry::template(template, content_type);
                entry.raw_url = record.url;
                entry
            }
            None => UrlEntry::new(record.url, content_type),
        };
        entry.last_modified = record.last_modified;
        entry.priority = record.priority;
        entry
    }
}
