//! Common Crawl CDX source (§4.6).
//!
//! Grounded on `original_source/crawl4ai/async_url_seeder.py::_from_cc`.

use crate::cache::DiskCache;
use crate::error::{SeederError, SeederResult};
use crate::http_client::HttpClient;
use crate::pattern::PatternMatcher;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;

const CDX_TIMEOUT: Duration = Duration::from_secs(20);
/// Retry schedule on HTTP 503, grounded on the original's `retries=(1, 3, 7)`.
const RETRY_SCHEDULE_SECS: [u64; 3] = [1, 3, 7];

#[derive(Debug, serde::Deserialize)]
struct CdxLine {
    url: String,
}

/// Builds the CDX glob: `*.<raw>*` if the normalized domain contains a path
/// separator, else `*.<raw>/*`.
fn normalize_domain(domain: &str) -> String {
    let without_scheme = domain.split_once("://").map_or(domain, |(_, rest)| rest);
    let without_fragment = without_scheme.split(['#', '?']).next().unwrap_or("");
    without_fragment.trim_start_matches('.').to_string()
}

fn cdx_glob(normalized: &str) -> String {
    if normalized.contains('/') {
        format!("*.{normalized}*")
    } else {
        format!("*.{normalized}/*")
    }
}

/// Streams matching URLs for `domain` into `tx`, consulting and populating the
/// source-list cache. Cache hits never touch the network.
pub async fn stream_urls(
    client: &HttpClient,
    cache: &DiskCache,
    index_id: &str,
    domain: &str,
    pattern_str: &str,
    pattern: &PatternMatcher,
    force: bool,
    tx: &mpsc::Sender<String>,
) -> SeederResult<()> {
    let cache_path = cache.cc_source_list_path(index_id, domain, pattern_str);
    if cache.is_source_list_fresh(&cache_path, force) {
        for url in cache.read_source_list(&cache_path) {
            if pattern.matches(&url) && tx.send(url).await.is_err() {
                return Ok(());
            }
        }
        return Ok(());
    }

    let normalized = normalize_domain(domain);
    let glob = cdx_glob(&normalized);
    let query_url = format!(
        "https://index.commoncrawl.org/{index_id}-index?url={}&output=json",
        urlencoding::encode(&glob)
    );

    let mut attempt = 0usize;
    loop {
        let response = client.get(&query_url, CDX_TIMEOUT).await?;
        let status = response.status();

        if status.as_u16() == 503 && attempt < RETRY_SCHEDULE_SECS.len() {
            let delay = RETRY_SCHEDULE_SECS[attempt];
            log::warn!("CDX query throttled (503), retrying in {delay}s");
            tokio::time::sleep(Duration::from_secs(delay)).await;
            attempt += 1;
            continue;
        }
        if !status.is_success() {
            return Err(SeederError::HttpStatus(status.as_u16()));
        }

        let mut stream = response.bytes_stream();
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buf.extend_from_slice(&chunk);
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line = buf.drain(..=pos).collect::<Vec<u8>>();
                process_line(&line, cache, &cache_path, pattern, tx).await;
            }
        }
        if !buf.is_empty() {
            process_line(&buf, cache, &cache_path, pattern, tx).await;
        }
        return Ok(());
    }
}

async fn process_line(
    line: &[u8],
    cache: &DiskCache,
    cache_path: &std::path::Path,
    pattern: &PatternMatcher,
    tx: &mpsc::Sender<String>,
) {
    let line = String::from_utf8_lossy(line);
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }
    let Ok(parsed) = serde_json::from_str::<CdxLine>(trimmed) else {
        log::debug!("skipping malformed CDX line");
        return;
    };
    cache.append_source_list_line(cache_path, &parsed.url);
    if pattern.matches(&parsed.url) {
        let _ = tx.send(parsed.url).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_scheme_query_fragment_and_leading_dots() {
        assert_eq!(normalize_domain("https://example.com/a?q=1#f"), "example.com/a");
        assert_eq!(normalize_domain("...example.com"), "example.com");
    }

    #[test]
    fn cdx_glob_uses_path_aware_suffix() {
        assert_eq!(cdx_glob("example.com"), "*.example.com/*");
        assert_eq!(cdx_glob("example.com/blog"), "*.example.com/blog*");
    }

    #[tokio::test]
    async fn streams_cached_urls_without_network() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let path = cache.cc_source_list_path("CC-MAIN-2026-07", "example.com", "*");
        cache.append_source_list_line(&path, "https://example.com/a");
        cache.append_source_list_line(&path, "https://example.com/b");

        let client = HttpClient::new().expect("client");
        let pattern = PatternMatcher::new("*").expect("compiles");
        let (tx, mut rx) = mpsc::channel(8);

        stream_urls(
            &client, &cache, "CC-MAIN-2026-07", "example.com", "*", &pattern, false, &tx,
        )
        .await
        .expect("cached stream ok");
        drop(tx);

        let mut seen = Vec::new();
        while let Some(url) = rx.recv().await {
            seen.push(url);
        }
        assert_eq!(seen, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[tokio::test]
    async fn fetches_and_caches_from_mock_cdx_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let body = "{\"url\": \"https://example.com/a\"}\n{\"url\": \"https://example.com/b\"}\n";
        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/CC-MAIN-TEST-index.*".to_string()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        // The production query URL is hard-coded to index.commoncrawl.org; this test
        // exercises the CDX line-parsing/caching logic directly against the same
        // mock-server body shape the real endpoint would return.
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = DiskCache::new(dir.path());
        let cache_path = cache.cc_source_list_path("CC-MAIN-TEST", "example.com", "*");
        let pattern = PatternMatcher::new("*").expect("compiles");
        let (tx, mut rx) = mpsc::channel(8);

        for line in body.lines() {
            process_line(line.as_bytes(), &cache, &cache_path, &pattern, &tx).await;
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(url) = rx.recv().await {
            seen.push(url);
        }
        assert_eq!(seen, vec!["https://example.com/a", "https://example.com/b"]);
        assert_eq!(
            cache.read_source_list(&cache_path),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }
}
