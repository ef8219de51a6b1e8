//! Google News / XML sitemap parser.
//!
//! Handles both `<urlset>` documents (one item per `<url>`, with the optional
//! `news:` and `image:` extensions) and `<sitemapindex>` documents, whose
//! nested `<sitemap><loc>` entries are returned for the caller to follow.
//! Elements are matched by local name so any namespace prefix works.

use chrono::{DateTime, NaiveDate, Utc};
use feedrelay_shared::{FeedRelayError, Item, Result, normalize_keywords};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::ParsedFeed;

#[derive(Debug, Default)]
struct UrlEntry {
    loc: String,
    title: String,
    keywords: String,
    publication_date: String,
    lastmod: String,
    image: String,
}

impl UrlEntry {
    fn into_item(self, source_id: &str) -> Option<Item> {
        let mut item = Item::new(source_id, &self.loc)?;
        item.title = self.title;
        item.image_url = self.image;
        item.keywords = normalize_keywords(self.keywords.split(','));
        item.published_at =
            parse_w3c_datetime(&self.publication_date).or_else(|| parse_w3c_datetime(&self.lastmod));
        Some(item)
    }
}

/// Parse a sitemap document.
pub(crate) fn parse(xml: &str, source_id: &str) -> Result<ParsedFeed> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = ParsedFeed::default();
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut root: Option<String> = None;
    let mut entry: Option<UrlEntry> = None;
    let mut nested: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if root.is_none() {
                    root = Some(name.clone());
                }
                match (name.as_str(), stack.last().map(String::as_str)) {
                    ("url", Some("urlset")) => entry = Some(UrlEntry::default()),
                    ("sitemap", Some("sitemapindex")) => nested = Some(String::new()),
                    _ => {}
                }
                stack.push(name);
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
            }
            Ok(Event::Text(t)) => {
                let decoded = t
                    .unescape()
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                text.push_str(&decoded);
            }
            Ok(Event::CData(c)) => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::End(_)) => {
                let name = stack.pop().unwrap_or_default();
                let parent = stack.last().map(String::as_str);
                let value = text.trim();

                match (name.as_str(), parent) {
                    ("loc", Some("url")) => {
                        if let Some(en) = entry.as_mut() {
                            en.loc = value.to_string();
                        }
                    }
                    ("lastmod", Some("url")) => {
                        if let Some(en) = entry.as_mut() {
                            en.lastmod = value.to_string();
                        }
                    }
                    ("title", Some("news")) => {
                        if let Some(en) = entry.as_mut() {
                            en.title = value.to_string();
                        }
                    }
                    ("keywords", Some("news")) => {
                        if let Some(en) = entry.as_mut() {
                            en.keywords = value.to_string();
                        }
                    }
                    ("publication_date", Some("news")) => {
                        if let Some(en) = entry.as_mut() {
                            en.publication_date = value.to_string();
                        }
                    }
                    ("loc", Some("image")) => {
                        if let Some(en) = entry.as_mut().filter(|en| en.image.is_empty()) {
                            en.image = value.to_string();
                        }
                    }
                    ("loc", Some("sitemap")) => {
                        if let Some(n) = nested.as_mut() {
                            *n = value.to_string();
                        }
                    }
                    ("url", Some("urlset")) => {
                        if let Some(item) = entry.take().and_then(|en| en.into_item(source_id)) {
                            feed.items.push(item);
                        }
                    }
                    ("sitemap", Some("sitemapindex")) => {
                        if let Some(loc) = nested.take().filter(|l| !l.is_empty()) {
                            feed.nested.push(loc);
                        }
                    }
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FeedRelayError::parse(format!(
                    "invalid sitemap XML at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    match root.as_deref() {
        Some("urlset") | Some("sitemapindex") => Ok(feed),
        Some(other) => Err(FeedRelayError::parse(format!(
            "expected <urlset> or <sitemapindex>, found <{other}>"
        ))),
        None => Err(FeedRelayError::parse("document has no root element")),
    }
}

/// Parse a W3C datetime: full RFC 3339, minute precision, or a bare date.
fn parse_w3c_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const NEWS_SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
        xmlns:news="http://www.google.com/schemas/sitemap-news/0.9"
        xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
  <url>
    <loc>https://news.example.com/india/budget-2025</loc>
    <news:news>
      <news:publication>
        <news:name>Example News</news:name>
        <news:language>en</news:language>
      </news:publication>
      <news:publication_date>2025-02-01T10:30:00+05:30</news:publication_date>
      <news:title><![CDATA[Budget 2025 & what it means]]></news:title>
      <news:keywords>budget, economy , ,budget</news:keywords>
    </news:news>
    <image:image>
      <image:loc>https://cdn.example.com/budget.jpg</image:loc>
    </image:image>
    <image:image>
      <image:loc>https://cdn.example.com/second.jpg</image:loc>
    </image:image>
  </url>
  <url>
    <loc>https://news.example.com/sports/final</loc>
    <lastmod>2025-02-02</lastmod>
  </url>
  <url>
    <loc>   </loc>
  </url>
</urlset>"#;

    #[test]
    fn parses_news_urlset() {
        let feed = parse(NEWS_SITEMAP, "example").unwrap();
        assert!(feed.nested.is_empty());
        assert_eq!(feed.items.len(), 2);

        let first = &feed.items[0];
        assert_eq!(first.url, "https://news.example.com/india/budget-2025");
        assert_eq!(first.source_id, "example");
        assert_eq!(first.title, "Budget 2025 & what it means");
        assert_eq!(first.keywords, vec!["budget", "economy"]);
        assert_eq!(first.image_url, "https://cdn.example.com/budget.jpg");
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2025, 2, 1, 5, 0, 0).unwrap())
        );

        let second = &feed.items[1];
        assert_eq!(second.title, "");
        assert!(second.keywords.is_empty());
        assert_eq!(
            second.published_at,
            Some(Utc.with_ymd_and_hms(2025, 2, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn unparseable_date_is_none() {
        let xml = r#"<urlset><url><loc>https://a.example.com/x</loc>
            <news:news><news:publication_date>yesterday</news:publication_date></news:news>
            </url></urlset>"#;
        let feed = parse(xml, "p").unwrap();
        assert_eq!(feed.items[0].published_at, None);
    }

    #[test]
    fn parses_sitemap_index() {
        let xml = r#"<?xml version="1.0"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://news.example.com/sitemap-1.xml</loc></sitemap>
  <sitemap><loc> https://news.example.com/sitemap-2.xml </loc><lastmod>2025-01-01</lastmod></sitemap>
</sitemapindex>"#;
        let feed = parse(xml, "p").unwrap();
        assert!(feed.items.is_empty());
        assert_eq!(
            feed.nested,
            vec![
                "https://news.example.com/sitemap-1.xml",
                "https://news.example.com/sitemap-2.xml"
            ]
        );
    }

    #[test]
    fn rejects_html_documents() {
        let err = parse("<html><body>Not found</body></html>", "p").unwrap_err();
        assert!(err.to_string().contains("<html>"));
    }

    #[test]
    fn rejects_malformed_xml() {
        assert!(parse("<urlset><url><loc>x</url>", "p").is_err());
    }
}
