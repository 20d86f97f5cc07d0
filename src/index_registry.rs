//! Resolves and caches the latest Common Crawl collection id (§4.3).
//!
//! Grounded on `original_source/crawl4ai/async_url_seeder.py::_latest_index`. Resolved
//! design decision (SPEC_FULL.md §9): the refresh request reuses the seeder's shared
//! `HttpClient` rather than constructing a fresh one.

use crate::cache::DiskCache;
use crate::error::{SeederError, SeederResult};
use crate::http_client::HttpClient;
use std::time::Duration;

const COLLINFO_URL: &str = "https://index.commoncrawl.org/collinfo.json";
const INDEX_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, serde::Deserialize)]
struct CollInfoEntry {
    id: String,
}

/// Returns the cached index id if fresh, otherwise refreshes it from `collinfo.json`.
pub async fn latest_index(
    client: &HttpClient,
    cache: &DiskCache,
    ttl: chrono::Duration,
) -> SeederResult<String> {
    if let Some(id) = cache.read_index_id(ttl) {
        log::debug!("using cached Common Crawl index id: {id}");
        return Ok(id);
    }

    log::info!("refreshing Common Crawl index id from {COLLINFO_URL}");
    let response = client.get(COLLINFO_URL, INDEX_TIMEOUT).await?;
    if !response.status().is_success() {
        return Err(SeederError::HttpStatus(response.status().as_u16()));
    }

    let entries: Vec<CollInfoEntry> = response.json().await?;
    let first = entries
        .into_iter()
        .next()
        .ok_or_else(|| SeederError::ParseError("collinfo.json returned no entries".to_string()))?;

    cache.write_index_id(&first.id);
    Ok(first.id)
}
