//! Sitemap discovery source (§4.7): default-location probing, robots.txt fallback,
//! gzip decoding, and sitemap-index recursion.
//!
//! Grounded on `original_source/crawl4ai/async_url_seeder.py::_from_sitemaps` and
//! `_iter_sitemap`.

use crate::cache::DiskCache;
use crate::error::SeederResult;
use crate::http_client::HttpClient;
use crate::pattern::PatternMatcher;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

const SITEMAP_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const HEAD_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_SITEMAP_INDEX_DEPTH: usize = 5;

/// Streams matching URLs for `domain` into `tx`, consulting and populating the
/// source-list cache.
pub async fn stream_urls(
    client: &HttpClient,
    cache: &DiskCache,
    domain: &str,
    pattern_str: &str,
    pattern: &PatternMatcher,
    force: bool,
    tx: &mpsc::Sender<String>,
) -> SeederResult<()> {
    let cache_path = cache.source_list_path(crate::config::Source::Sitemap, domain, pattern_str);
    if cache.is_source_list_fresh(&cache_path, force) {
        for url in cache.read_source_list(&cache_path) {
            if pattern.matches(&url) && tx.send(url).await.is_err() {
                return Ok(());
            }
        }
        return Ok(());
    }

    let host = crate::cache::sanitize_domain(domain);
    if let Some(sitemap_url) = probe_default_locations(client, &host).await {
        iterate_sitemap(client, &sitemap_url, 0, &|url| {
            cache.append_source_list_line(&cache_path, &url);
        }, tx, pattern)
        .await;
        return Ok(());
    }

    for sitemap_url in robots_txt_hints(client, &host).await {
        iterate_sitemap(client, &sitemap_url, 0, &|url| {
            cache.append_source_list_line(&cache_path, &url);
        }, tx, pattern)
        .await;
    }
    Ok(())
}

/// Probes `https://<host>/sitemap.xml`, `https://<host>/sitemap_index.xml`, then the
/// same under `http://`, returning the first that resolves via a non-redirect-following
/// HEAD (following at most one redirect manually).
async fn probe_default_locations(client: &HttpClient, host: &str) -> Option<String> {
    for scheme in ["https", "http"] {
        for path in ["sitemap.xml", "sitemap_index.xml"] {
            let candidate = format!("{scheme}://{host}/{path}");
            if let Some(resolved) = resolve_one_redirect(client, &candidate).await {
                return Some(resolved);
            }
        }
    }
    None
}

async fn resolve_one_redirect(client: &HttpClient, url: &str) -> Option<String> {
    let response = client.head(url, HEAD_PROBE_TIMEOUT).await.ok()?;
    let status = response.status();
    if status.is_success() {
        return Some(url.to_string());
    }
    if status.is_redirection() {
        let location = response.headers().get("location")?.to_str().ok()?;
        return Url::parse(url).ok()?.join(location).ok().map(|u| u.to_string());
    }
    None
}

async fn robots_txt_hints(client: &HttpClient, host: &str) -> Vec<String> {
    let robots_url = format!("https://{host}/robots.txt");
    let Ok(response) = client.get(&robots_url, HEAD_PROBE_TIMEOUT).await else {
        return Vec::new();
    };
    if !response.status().is_success() {
        return Vec::new();
    }
    let Ok(body) = response.text().await else {
        return Vec::new();
    };

    body.lines()
        .filter_map(|line| {
            let lower = line.to_lowercase();
            lower
                .strip_prefix("sitemap:")
                .map(|_| line.splitn(2, ':').nth(1).unwrap_or("").trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Fetches and parses one sitemap document, recursing into sitemap-index entries.
/// Network and parse errors are logged; the function yields nothing for that document
/// and its siblings (other index entries, or other robots.txt hints) continue.
fn iterate_sitemap<'a>(
    client: &'a HttpClient,
    sitemap_url: &'a str,
    depth: usize,
    on_url: &'a (dyn Fn(String) + Sync),
    tx: &'a mpsc::Sender<String>,
    pattern: &'a PatternMatcher,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        if depth > MAX_SITEMAP_INDEX_DEPTH {
            log::warn!("sitemap index recursion depth exceeded at {sitemap_url}");
            return;
        }

        let body = match fetch_sitemap_body(client, sitemap_url).await {
            Ok(body) => body,
            Err(err) => {
                log::warn!("failed to fetch sitemap {sitemap_url}: {err}");
                return;
            }
        };

        let parsed = match parse_sitemap_document(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("failed to parse sitemap {sitemap_url}: {err}");
                return;
            }
        };

        match parsed {
            SitemapDocument::Index(locs) => {
                for loc in locs {
                    let Some(resolved) = resolve_relative(sitemap_url, &loc) else {
                        continue;
                    };
                    iterate_sitemap(client, &resolved, depth + 1, on_url, tx, pattern).await;
                }
            }
            SitemapDocument::UrlSet(locs) => {
                for loc in locs {
                    let Some(resolved) = resolve_relative(sitemap_url, &loc) else {
                        continue;
                    };
                    on_url(resolved.clone());
                    if pattern.matches(&resolved) && tx.send(resolved).await.is_err() {
                        return;
                    }
                }
            }
        }
    })
}

fn resolve_relative(base: &str, loc: &str) -> Option<String> {
    if let Ok(url) = Url::parse(loc) {
        return Some(url.to_string());
    }
    Url::parse(base).ok()?.join(loc).ok().map(|u| u.to_string())
}

async fn fetch_sitemap_body(client: &HttpClient, url: &str) -> anyhow::Result<Vec<u8>> {
    let response = client.get(url, SITEMAP_FETCH_TIMEOUT).await?;
    if !response.status().is_success() {
        anyhow::bail!("unexpected status {}", response.status());
    }
    let bytes = response.bytes().await?;

    if url.ends_with(".gz") {
        let mut decoder = flate2::read::GzDecoder::new(&bytes[..]);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    } else {
        Ok(bytes.to_vec())
    }
}

enum SitemapDocument {
    Index(Vec<String>),
    UrlSet(Vec<String>),
}

/// Tolerant XML parsing: accepts documents with or without the standard sitemap
/// namespace (and with arbitrary custom namespaces), by matching on local tag names
/// rather than fully-qualified names.
fn parse_sitemap_document(body: &[u8]) -> anyhow::Result<SitemapDocument> {
    let mut reader = Reader::from_reader(body);
    reader.trim_text(true);

    let mut locs = Vec::new();
    let mut is_index = false;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                "sitemapindex" => is_index = true,
                "loc" => in_loc = true,
                _ => {}
            },
            Ok(Event::End(e)) => {
                if local_name(e.name().as_ref()) == "loc" {
                    in_loc = false;
                }
            }
            Ok(Event::Text(t)) if in_loc => {
                let text = t.unescape()?.into_owned();
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    locs.push(trimmed.to_string());
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                // Recover-mode: stop at the first unparseable byte but keep whatever
                // <loc> entries were already collected, matching the original's
                // lxml recover=True behavior.
                log::debug!("sitemap XML parse stopped early: {err}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    if locs.is_empty() {
        anyhow::bail!("no <loc> entries found");
    }

    Ok(if is_index {
        SitemapDocument::Index(locs)
    } else {
        SitemapDocument::UrlSet(locs)
    })
}

fn local_name(qname: &[u8]) -> &str {
    let s = std::str::from_utf8(qname).unwrap_or("");
    s.rsplit_once(':').map_or(s, |(_, local)| local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_urlset_without_namespace() {
        let xml = br#"<urlset><url><loc>https://example.com/a</loc></url><url><loc>https://example.com/b</loc></url></urlset>"#;
        match parse_sitemap_document(xml).expect("parses") {
            SitemapDocument::UrlSet(locs) => {
                assert_eq!(locs, vec!["https://example.com/a", "https://example.com/b"]);
            }
            SitemapDocument::Index(_) => panic!("expected urlset"),
        }
    }

    #[test]
    fn parses_sitemap_index_with_custom_namespace() {
        let xml = br#"<custom:sitemapindex xmlns:custom="urn:example">
<custom:sitemap><custom:loc>https://example.com/sitemap-a.xml</custom:loc></custom:sitemap>
<custom:sitemap><custom:loc>https://example.com/sitemap-b.xml</custom:loc></custom:sitemap>
</custom:sitemapindex>"#;
        match parse_sitemap_document(xml).expect("parses") {
            SitemapDocument::Index(locs) => {
                assert_eq!(
                    locs,
                    vec![
                        "https://example.com/sitemap-a.xml",
                        "https://example.com/sitemap-b.xml"
                    ]
                );
            }
            SitemapDocument::UrlSet(_) => panic!("expected index"),
        }
    }

    #[test]
    fn resolves_relative_loc_against_sitemap_url() {
        let resolved = resolve_relative("https://example.com/sub/sitemap.xml", "/page-1").unwrap();
        assert_eq!(resolved, "https://example.com/page-1");
    }

    #[test]
    fn local_name_strips_namespace_prefix() {
        assert_eq!(local_name(b"s:loc"), "loc");
        assert_eq!(local_name(b"loc"), "loc");
    }
}
