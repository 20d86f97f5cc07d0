//! Extracts structured metadata from a (possibly truncated) HTML `<head>` (§4.5).
//!
//! Preferred path uses `scraper` (html5ever under the hood), tolerant of malformed
//! markup the way the teacher's `main_content_extraction` module relies on `scraper`'s
//! forgiving parser. A regex fallback covers inputs `scraper` can't usefully parse at
//! all (e.g. a prefix cut off mid-tag); regex patterns are grounded on the original
//! implementation's `_meta_rx`/`_charset_rx`/`_title_rx`/`_link_rx`.

use crate::types::{HeadData, LinkEntry};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("BUG: hardcoded CSS selector 'title' is invalid"));
static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("BUG: hardcoded CSS selector 'meta' is invalid"));
static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link").expect("BUG: hardcoded CSS selector 'link' is invalid"));
static JSONLD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("BUG: hardcoded CSS selector for ld+json script is invalid")
});
static HTML_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("html").expect("BUG: hardcoded CSS selector 'html' is invalid"));

static TITLE_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));
static CHARSET_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta[^>]+charset\s*=\s*["']?([a-zA-Z0-9_-]+)"#).expect("valid regex")
});
static META_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta\s+[^>]*\b(?:name|property|http-equiv)\s*=\s*["']([^"']+)["'][^>]*\bcontent\s*=\s*["']([^"']*)["']"#)
        .expect("valid regex")
});
static LANG_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<html[^>]+lang\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

/// Parses a `<head>` prefix into `HeadData`. Never fails: a document-level parse
/// failure (or a fragment too mangled for `scraper` to find anything in) falls back to
/// regex extraction, and if that too finds nothing, returns an empty `HeadData` (§4.5:
/// "partial success is preferred over hard failure").
pub fn parse_head(src: &str) -> HeadData {
    let parsed = parse_with_scraper(src);
    if !parsed.is_empty() {
        return parsed;
    }
    parse_with_regex(src)
}

fn parse_with_scraper(src: &str) -> HeadData {
    let document = Html::parse_document(src);
    let mut data = HeadData::default();

    if let Some(title_el) = document.select(&TITLE_SELECTOR).next() {
        let text = title_el.text().collect::<String>();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            data.title = Some(trimmed.to_string());
        }
    }

    for meta in document.select(&META_SELECTOR) {
        let content = meta.value().attr("content").unwrap_or_default();

        if let Some(charset) = meta.value().attr("charset") {
            data.charset = Some(charset.to_string());
        } else if let Some(http_equiv) = meta.value().attr("http-equiv") {
            if http_equiv.eq_ignore_ascii_case("content-type") {
                if let Some(cs) = extract_charset_from_content_type(content) {
                    data.charset = Some(cs);
                }
            }
            data.meta.insert(http_equiv.to_lowercase(), content.to_string());
        }

        if let Some(name) = meta.value().attr("name") {
            data.meta.insert(name.to_lowercase(), content.to_string());
        } else if let Some(property) = meta.value().attr("property") {
            data.meta.insert(property.to_lowercase(), content.to_string());
        }
    }

    for link in document.select(&LINK_SELECTOR) {
        let Some(rel) = link.value().attr("rel") else {
            continue;
        };
        let entry = LinkEntry {
            href: link.value().attr("href").map(str::to_string),
            as_: link.value().attr("as").map(str::to_string),
            type_: link.value().attr("type").map(str::to_string),
            hreflang: link.value().attr("hreflang").map(str::to_string),
        };
        data.link.entry(rel.to_lowercase()).or_default().push(entry);
    }

    for script in document.select(&JSONLD_SELECTOR) {
        let body = script.text().collect::<String>();
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => data.jsonld.push(value),
            Err(err) => log::debug!("skipping invalid JSON-LD block: {err}"),
        }
    }

    if let Some(html_el) = document.select(&HTML_SELECTOR).next() {
        if let Some(lang) = html_el.value().attr("lang") {
            data.lang = lang.to_string();
        }
    }

    data
}

fn parse_with_regex(src: &str) -> HeadData {
    let mut data = HeadData::default();

    if let Some(caps) = TITLE_RX.captures(src) {
        let title = strip_tags(&caps[1]);
        if !title.trim().is_empty() {
            data.title = Some(title.trim().to_string());
        }
    }

    if let Some(caps) = CHARSET_RX.captures(src) {
        data.charset = Some(caps[1].to_string());
    }

    for caps in META_RX.captures_iter(src) {
        data.meta.insert(caps[1].to_lowercase(), caps[2].to_string());
    }

    if let Some(caps) = LANG_RX.captures(src) {
        data.lang = caps[1].to_string();
    }

    data
}

fn extract_charset_from_content_type(content: &str) -> Option<String> {
    let lower = content.to_lowercase();
    let idx = lower.find("charset=")?;
    Some(content[idx + "charset=".len()..].trim().to_string())
}

fn strip_tags(s: &str) -> String {
    static TAG_RX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"));
    TAG_RX.replace_all(s, "").to_string()
}
