//! Core domain types: items, events, and item identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Item identity
// ---------------------------------------------------------------------------

/// Derive the stable identifier of an item from its canonical URL.
///
/// The id is the hex SHA-256 of the trimmed URL. It depends on nothing but the
/// URL, so the same link always maps to the same id across runs and hosts.
pub fn derive_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A candidate link pulled from a feed, with best-effort metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Content-derived identifier; see [`derive_id`].
    pub id: String,
    /// Provider the item was fetched from.
    pub source_id: String,
    /// Canonical absolute URL.
    pub url: String,
    /// Title, empty when unknown.
    #[serde(default)]
    pub title: String,
    /// Description, empty when unknown.
    #[serde(default)]
    pub description: String,
    /// Preview image URL, empty when unknown.
    #[serde(default)]
    pub image_url: String,
    /// Non-empty trimmed keywords in feed order.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Publication time, if the feed carried a parseable one.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Create an item for `url`, assigning its id. Returns `None` for a blank URL.
    pub fn new(source_id: impl Into<String>, url: &str) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            id: derive_id(url),
            source_id: source_id.into(),
            url: url.to_string(),
            title: String::new(),
            description: String::new(),
            image_url: String::new(),
            keywords: Vec::new(),
            published_at: None,
        })
    }
}

/// Clean a keyword list: trim, drop empties and repeats, keep first-seen order.
pub fn normalize_keywords<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for kw in raw {
        let kw = kw.as_ref().trim();
        if !kw.is_empty() && !out.iter().any(|k| k == kw) {
            out.push(kw.to_string());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// The wire representation of a non-duplicate item, handed to every sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub source_id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl From<&Item> for Event {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            source_id: item.source_id.clone(),
            url: item.url.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            image_url: item.image_url.clone(),
            keywords: item.keywords.clone(),
            published_at: item.published_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn derive_id_is_deterministic() {
        let a = derive_id("https://example.com/news/1");
        let b = derive_id("https://example.com/news/1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        // Fixed vector guards against accidental algorithm changes between releases.
        assert_eq!(
            derive_id("hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn derive_id_differs_by_url() {
        assert_ne!(
            derive_id("https://example.com/a"),
            derive_id("https://example.com/b")
        );
    }

    #[test]
    fn item_new_rejects_blank_url() {
        assert!(Item::new("p", "   ").is_none());
        let item = Item::new("p", " https://example.com/x ").unwrap();
        assert_eq!(item.url, "https://example.com/x");
        assert_eq!(item.id, derive_id("https://example.com/x"));
    }

    #[test]
    fn keywords_are_trimmed_and_deduplicated() {
        let kws = normalize_keywords(" india , ,politics,india,  economy ".split(','));
        assert_eq!(kws, vec!["india", "politics", "economy"]);
    }

    #[test]
    fn event_omits_unknown_publication_time() {
        let mut item = Item::new("ndtv", "https://example.com/a").unwrap();
        let json = serde_json::to_value(Event::from(&item)).unwrap();
        assert!(json.get("published_at").is_none());
        assert_eq!(json["source_id"], "ndtv");

        item.published_at = Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
        let json = serde_json::to_value(Event::from(&item)).unwrap();
        assert_eq!(json["published_at"], "2025-01-02T03:04:05Z");
    }
}
