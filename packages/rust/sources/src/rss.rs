//! RSS 2.0 parser.

use chrono::{DateTime, Utc};
use feedrelay_shared::{FeedRelayError, Item, Result, normalize_keywords};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ParsedFeed;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
    #[serde(rename = "enclosure", default)]
    enclosures: Vec<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime: Option<String>,
}

/// Parse an RSS 2.0 document. Items without a `<link>` are skipped.
pub(crate) fn parse(xml: &str, source_id: &str) -> Result<ParsedFeed> {
    let xml = scrub_html_entities(xml);
    let rss: Rss =
        from_str(&xml).map_err(|e| FeedRelayError::parse(format!("invalid RSS document: {e}")))?;

    let items = rss
        .channel
        .items
        .into_iter()
        .filter_map(|it| {
            let mut item = Item::new(source_id, it.link.as_deref().unwrap_or_default())?;
            item.title = it.title.unwrap_or_default().trim().to_string();
            item.description = it.description.unwrap_or_default().trim().to_string();
            item.keywords = normalize_keywords(it.categories.iter().map(|c| c.value.as_str()));
            item.published_at = it.pub_date.as_deref().and_then(parse_rss_date);
            item.image_url = it
                .enclosures
                .into_iter()
                .filter(|e| e.mime.as_deref().is_none_or(|m| m.starts_with("image/")))
                .filter_map(|e| e.url)
                .map(|u| u.trim().to_string())
                .find(|u| !u.is_empty())
                .unwrap_or_default();
            Some(item)
        })
        .collect();

    Ok(ParsedFeed {
        items,
        nested: Vec::new(),
    })
}

/// `pubDate` is RFC 2822; some feeds emit RFC 3339 instead.
fn parse_rss_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// HTML entities that are not predefined in XML.
fn scrub_html_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&mdash;", "-")
        .replace("&ndash;", "-")
        .replace("&hellip;", "...")
}
