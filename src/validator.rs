//! Per-URL validation (§4.8, §4.9): redirect resolution, bounded head-prefix GET,
//! decompression fallback, and cache fill.
//!
//! Grounded on `original_source/crawl4ai/async_url_seeder.py::_resolve_head`,
//! `_fetch_head`, `_validate`.

use crate::cache::{CacheKind, DiskCache, UrlCacheEntry};
use crate::config::ValidationMode;
use crate::head_parser::parse_head;
use crate::http_client::HttpClient;
use crate::types::{HeadData, URLRecord, UrlStatus};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING};
use std::io::Read;
use std::time::Duration;
use url::Url;

const HEAD_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const HEAD_EXTRACT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REDIRECTS: usize = 5;
const MAX_HEAD_BYTES: usize = 64 * 1024;
const FALLBACK_PREFIX_BYTES: usize = 10 * 1024;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BROTLI_MAGIC: [u8; 4] = [0x8b, 0x6c, 0x0a, 0x1a];

/// Validates a single URL according to the configured mode, consulting and filling the
/// appropriate cache kind. `force` bypasses the cache read (but the fresh result is
/// still written back, keeping the cache current).
pub async fn validate(
    client: &HttpClient,
    cache: &DiskCache,
    url: &str,
    mode: ValidationMode,
    verify_redirect_targets: bool,
    force: bool,
) -> URLRecord {
    match mode {
        ValidationMode::None => URLRecord::new(url.to_string(), UrlStatus::Unknown),
        ValidationMode::LiveOnly => validate_live_only(client, cache, url, verify_redirect_targets, force).await,
        ValidationMode::ExtractHead => validate_extract_head(client, cache, url, force).await,
    }
}

async fn validate_live_only(
    client: &HttpClient,
    cache: &DiskCache,
    url: &str,
    verify_redirect_targets: bool,
    force: bool,
) -> URLRecord {
    if let Some(entry) = cache.read_url_entry(CacheKind::Live, url, force) {
        log::debug!("live cache hit for {url}");
        return URLRecord::new(entry.url, entry.status);
    }

    let resolved = resolve_head(client, url, verify_redirect_targets, 0).await;
    let record = match resolved {
        Some(final_url) => URLRecord::new(final_url, UrlStatus::Valid),
        None => URLRecord::new(url.to_string(), UrlStatus::NotValid)
            .with_error("redirect target did not resolve to a successful response"),
    };

    cache.write_url_entry(CacheKind::Live, &UrlCacheEntry::from(&record));
    record
}

/// `resolve_head` (§4.8): HEAD with no automatic redirect following.
///
/// - 2xx -> the request URL itself.
/// - 3xx with `Location` -> `urljoin`'d target; if `verify_redirect_targets`, the
///   target is itself recursively probed and only accepted if it resolves to 2xx.
/// - anything else, or a network error -> unresolved (`None`).
pub async fn resolve_head(
    client: &HttpClient,
    url: &str,
    verify_redirect_targets: bool,
    depth: usize,
) -> Option<String> {
    if depth > MAX_REDIRECTS {
        return None;
    }
    let response = client.head(url, HEAD_PROBE_TIMEOUT).await.ok()?;
    let status = response.status();

    if status.is_success() {
        return Some(url.to_string());
    }
    if status.is_redirection() {
        let location = response.headers().get("location")?.to_str().ok()?;
        let target = Url::parse(url).ok()?.join(location).ok()?.to_string();
        if verify_redirect_targets {
            return Box::pin(resolve_head(client, &target, verify_redirect_targets, depth + 1)).await;
        }
        return Some(target);
    }
    None
}

async fn validate_extract_head(client: &HttpClient, cache: &DiskCache, url: &str, force: bool) -> URLRecord {
    if let Some(entry) = cache.read_url_entry(CacheKind::Head, url, force) {
        log::debug!("head cache hit for {url}");
        return URLRecord::new(entry.url, entry.status).with_head_data(entry.head_data);
    }

    let record = match fetch_head_prefix(client, url).await {
        Ok((html, final_url)) => {
            let head_data = parse_head(&html);
            URLRecord::new(final_url, UrlStatus::Valid).with_head_data(head_data)
        }
        Err(err) => {
            log::debug!("head extraction failed for {url}: {err}");
            URLRecord::new(url.to_string(), UrlStatus::NotValid)
                .with_head_data(HeadData::default())
                .with_error(err.to_string())
        }
    };

    cache.write_url_entry(CacheKind::Head, &UrlCacheEntry::from(&record));
    record
}

/// Streams up to `MAX_HEAD_BYTES`, stopping at `</head>` (case-insensitive) or the byte
/// cap, following up to `MAX_REDIRECTS` redirects manually. Returns the decoded HTML
/// string and the final URL on success.
async fn fetch_head_prefix(client: &HttpClient, url: &str) -> anyhow::Result<(String, String)> {
    let mut current = url.to_string();

    for _ in 0..=MAX_REDIRECTS {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let response = client
            .get_with_headers(&current, headers, HEAD_EXTRACT_TIMEOUT)
            .await?;
        let status = response.status();

        if status.is_redirection() {
            let Some(location) = response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
            else {
                anyhow::bail!("redirect without Location header");
            };
            current = Url::parse(&current)?.join(&location)?.to_string();
            continue;
        }
        if !status.is_success() {
            anyhow::bail!("unexpected status {status}");
        }

        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_lowercase);
        let final_url = response.url().to_string();

        let mut buf: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
            if contains_close_head_tag(&buf) || buf.len() >= MAX_HEAD_BYTES {
                break;
            }
        }

        let decoded = decode_body(&buf, content_encoding.as_deref());
        let truncated = truncate_at_head_close(&decoded);
        let html = decode_utf8_lossy_with_latin1_fallback(&truncated);
        return Ok((html, final_url));
    }

    anyhow::bail!("exceeded {MAX_REDIRECTS} redirects")
}

fn contains_close_head_tag(buf: &[u8]) -> bool {
    let lower = buf.to_ascii_lowercase();
    twoway_find(&lower, b"</head>").is_some()
}

fn twoway_find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Gunzip only if the magic bytes match (ignore a declared encoding that doesn't
/// match the observed prefix); brotli similarly magic-gated.
fn decode_body(buf: &[u8], content_encoding: Option<&str>) -> Vec<u8> {
    match content_encoding {
        Some("gzip") if buf.starts_with(&GZIP_MAGIC) => {
            let mut decoder = flate2::read::GzDecoder::new(buf);
            let mut out = Vec::new();
            if decoder.read_to_end(&mut out).is_ok() {
                return out;
            }
            buf.to_vec()
        }
        Some("br") if buf.starts_with(&BROTLI_MAGIC) => {
            let mut out = Vec::new();
            if brotli::BrotliDecompress(&mut &buf[..], &mut out).is_ok() {
                return out;
            }
            buf.to_vec()
        }
        Some(other) if other == "gzip" || other == "br" => {
            log::debug!("declared Content-Encoding {other} doesn't match observed magic bytes, using raw body");
            buf.to_vec()
        }
        _ => buf.to_vec(),
    }
}

fn truncate_at_head_close(buf: &[u8]) -> Vec<u8> {
    let lower = buf.to_ascii_lowercase();
    if let Some(pos) = twoway_find(&lower, b"</head>") {
        buf[..(pos + "</head>".len())].to_vec()
    } else if buf.len() > FALLBACK_PREFIX_BYTES {
        buf[..FALLBACK_PREFIX_BYTES].to_vec()
    } else {
        buf.to_vec()
    }
}

fn decode_utf8_lossy_with_latin1_fallback(buf: &[u8]) -> String {
    match std::str::from_utf8(buf) {
        Ok(s) => s.to_string(),
        Err(_) => buf.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_at_close_head_tag_case_insensitive() {
        let buf = b"<head><title>x</title></HEAD><body>junk</body>".to_vec();
        let truncated = truncate_at_head_close(&buf);
        assert!(truncated.ends_with(b"</HEAD>"));
    }

    #[test]
    fn falls_back_to_10kb_prefix_when_no_close_tag() {
        let buf = vec![b'a'; 20_000];
        let truncated = truncate_at_head_close(&buf);
        assert_eq!(truncated.len(), FALLBACK_PREFIX_BYTES);
    }

    #[test]
    fn keeps_whole_buffer_when_smaller_than_fallback_prefix() {
        let buf = vec![b'a'; 100];
        let truncated = truncate_at_head_close(&buf);
        assert_eq!(truncated.len(), 100);
    }

    #[test]
    fn gzip_decoded_only_when_magic_matches() {
        let raw = b"not actually gzip".to_vec();
        let decoded = decode_body(&raw, Some("gzip"));
        assert_eq!(decoded, raw, "bogus encoding should be ignored, not error");
    }

    #[test]
    fn decodes_valid_utf8() {
        let s = decode_utf8_lossy_with_latin1_fallback("hello".as_bytes());
        assert_eq!(s, "hello");
    }

    #[tokio::test]
    async fn live_only_mode_reports_valid_on_2xx() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("HEAD", "/ok").with_status(200).create_async().await;
        let client = HttpClient::new().expect("client");
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let url = format!("{}/ok", server.url());

        let record = validate_live_only(&client, &cache, &url, false, false).await;
        assert_eq!(record.status, UrlStatus::Valid);
    }

    #[tokio::test]
    async fn live_only_mode_honors_redirect_without_verification() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("HEAD", "/redir")
            .with_status(302)
            .with_header("location", "https://dead.invalid/")
            .create_async()
            .await;
        let client = HttpClient::new().expect("client");
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let url = format!("{}/redir", server.url());

        let record = validate_live_only(&client, &cache, &url, false, false).await;
        assert_eq!(record.status, UrlStatus::Valid);
        assert_eq!(record.url, "https://dead.invalid/");
    }
}
