//! Public API (§4.12): `UrlSeeder::urls` and `UrlSeeder::many_urls`.
//!
//! Grounded on `original_source/crawl4ai/async_url_seeder.py::AsyncUrlSeeder`.

use crate::cache::DiskCache;
use crate::config::{SeedingConfig, Source};
use crate::error::SeederResult;
use crate::http_client::HttpClient;
use crate::index_registry;
use crate::orchestrator::Orchestrator;
use crate::types::URLRecord;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Seeds candidate URLs for one or many domains. One instance owns a shared HTTP
/// client and the resolved Common Crawl index id; both are reused across calls
/// (§3 Lifecycles). Cheap to clone (everything it holds is an `Arc`).
#[derive(Clone)]
pub struct UrlSeeder {
    client: HttpClient,
    cache: DiskCache,
    index_id: Arc<Mutex<Option<String>>>,
    index_id_ttl: chrono::Duration,
}

impl UrlSeeder {
    /// Creates a seeder with a fresh HTTP client and the default cache base directory
    /// (`CRAWL4_AI_BASE_DIRECTORY` or the user's home).
    pub fn new() -> SeederResult<Self> {
        Ok(Self {
            client: HttpClient::new()?,
            cache: DiskCache::new(DiskCache::default_base_dir()),
            index_id: Arc::new(Mutex::new(None)),
            index_id_ttl: crate::cache::DEFAULT_TTL,
        })
    }

    /// Creates a seeder with an injected HTTP client and base directory, for callers
    /// that want to share a connection pool or isolate the cache (e.g. tests).
    pub fn with_client_and_base_dir(client: HttpClient, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            cache: DiskCache::new(base_dir),
            index_id: Arc::new(Mutex::new(None)),
            index_id_ttl: crate::cache::DEFAULT_TTL,
        }
    }

    /// Single-domain pipeline: discover, validate, and optionally rank candidate URLs.
    pub async fn urls(&self, domain: &str, config: &SeedingConfig) -> SeederResult<Vec<URLRecord>> {
        config.validate()?;

        let index_id = if config.sources().contains(&Source::CommonCrawl) {
            Some(self.resolve_index_id().await?)
        } else {
            None
        };

        let orchestrator = Orchestrator::new(&self.client, &self.cache, index_id);
        orchestrator.run(domain, config).await
    }

    /// Runs `urls` for each domain concurrently, returning a mapping that preserves
    /// input order. No cross-domain dedup or rate-limit sharing: each domain call
    /// constructs its own limiter, matching §4.12.
    pub async fn many_urls(
        &self,
        domains: &[String],
        config: &SeedingConfig,
    ) -> SeederResult<HashMap<String, Vec<URLRecord>>> {
        let futures = domains.iter().map(|domain| async move {
            let result = self.urls(domain, config).await;
            (domain.clone(), result)
        });

        let results = futures::future::join_all(futures).await;

        let mut map = HashMap::with_capacity(results.len());
        for (domain, result) in results {
            map.insert(domain, result?);
        }
        Ok(map)
    }

    async fn resolve_index_id(&self) -> SeederResult<String> {
        let mut guard = self.index_id.lock().await;
        if let Some(id) = guard.as_ref() {
            return Ok(id.clone());
        }
        let id = index_registry::latest_index(&self.client, &self.cache, self.index_id_ttl).await?;
        *guard = Some(id.clone());
        Ok(id)
    }
}
