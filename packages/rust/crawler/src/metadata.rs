//! Page metadata extraction (Open Graph, Twitter cards, `<title>`).

use std::sync::LazyLock;

use feedrelay_shared::Item;
use scraper::{Html, Selector};
use url::Url;

/// Metadata read from one HTML page. Empty strings mean "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub image_url: String,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.image_url.is_empty()
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:title"]"#));
static TWITTER_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"meta[name="twitter:title"], meta[property="twitter:title"]"#)
});
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));

static OG_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="og:description"]"#));
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[name="description"]"#));
static TWITTER_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"meta[name="twitter:description"], meta[property="twitter:description"]"#)
});

static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:image"]"#));
static OG_IMAGE_URL: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="og:image:url"]"#));
static TWITTER_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"meta[name="twitter:image"], meta[property="twitter:image"]"#)
});

/// Extract title, description, and preview image from an HTML document.
/// Each field takes the first non-empty candidate in priority order.
pub fn extract(html: &str) -> PageMetadata {
    let doc = Html::parse_document(html);

    let title = meta_content(&doc, &OG_TITLE)
        .or_else(|| meta_content(&doc, &TWITTER_TITLE))
        .or_else(|| {
            doc.select(&TITLE)
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .find(|t| !t.is_empty())
        })
        .unwrap_or_default();

    let description = meta_content(&doc, &OG_DESCRIPTION)
        .or_else(|| meta_content(&doc, &META_DESCRIPTION))
        .or_else(|| meta_content(&doc, &TWITTER_DESCRIPTION))
        .unwrap_or_default();

    let image_url = meta_content(&doc, &OG_IMAGE)
        .or_else(|| meta_content(&doc, &OG_IMAGE_URL))
        .or_else(|| meta_content(&doc, &TWITTER_IMAGE))
        .unwrap_or_default();

    PageMetadata {
        title,
        description,
        image_url,
    }
}

fn meta_content(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Write non-empty fields of `meta` onto `item`. The image URL is resolved
/// against the item URL. The item id is left alone.
pub fn overlay(item: &mut Item, meta: PageMetadata) {
    if !meta.title.is_empty() {
        item.title = meta.title;
    }
    if !meta.description.is_empty() {
        item.description = meta.description;
    }
    if !meta.image_url.is_empty() {
        item.image_url = resolve_url(&item.url, &meta.image_url);
    }
}

fn resolve_url(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}
