//! Producer/worker pipeline (§4.10, §5): one producer draining sitemap then Common
//! Crawl, a bounded queue, a fixed worker pool, order-preserving dedup, a global rate
//! limit, and early termination on `max_urls`.
//!
//! Simplified relative to `crawl_engine::orchestrator`'s browser-crawl pipeline: no
//! circuit breaker, no per-domain retry queue, no exponential backoff on worker
//! failure — the spec's sources already retry (CDX 503) or fail-closed (sitemap) on
//! their own, and there is no browser process to keep alive across retries.

use crate::cache::DiskCache;
use crate::config::{ScoringMethod, SeedingConfig, Source, ValidationMode};
use crate::error::{SeederError, SeederResult};
use crate::http_client::HttpClient;
use crate::pattern::PatternMatcher;
use crate::ranker;
use crate::types::URLRecord;
use crate::validator;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};

/// Queue capacity relative to `concurrency`, per the §5 suggestion ("bounded capacity
/// equal to `concurrency`, or larger if sources are bursty").
const QUEUE_CAPACITY_MULTIPLIER: usize = 4;

pub struct Orchestrator<'a> {
    client: &'a HttpClient,
    cache: &'a DiskCache,
    index_id: Option<String>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(client: &'a HttpClient, cache: &'a DiskCache, index_id: Option<String>) -> Self {
        Self { client, cache, index_id }
    }

    /// Runs the full pipeline for one domain and returns the final, possibly-ranked
    /// and possibly-truncated result list.
    pub async fn run(&self, domain: &str, config: &SeedingConfig) -> SeederResult<Vec<URLRecord>> {
        config.validate()?;

        if config.sources().contains(&Source::CommonCrawl) && self.index_id.is_none() {
            return Err(SeederError::BadInput(
                "Common Crawl source requested but no index id was resolved".to_string(),
            ));
        }

        let pattern = PatternMatcher::new(config.pattern())
            .map_err(|e| SeederError::BadInput(format!("invalid pattern: {e}")))?;

        let queue_capacity = config.concurrency.max(1) * QUEUE_CAPACITY_MULTIPLIER;
        let (tx, rx) = mpsc::channel::<String>(queue_capacity);
        let rx = Arc::new(Mutex::new(rx));

        let stop = Arc::new(AtomicBool::new(false));
        let results = Arc::new(Mutex::new(Vec::<URLRecord>::new()));
        let rate_limiter = config.hits_per_sec.filter(|n| *n > 0).map(|n| Arc::new(Semaphore::new(n as usize)));

        let producer = self.spawn_producer(domain, config, pattern, tx);

        let mut workers = Vec::with_capacity(config.concurrency);
        for _ in 0..config.concurrency {
            workers.push(self.spawn_worker(
                Arc::clone(&rx),
                Arc::clone(&stop),
                Arc::clone(&results),
                rate_limiter.clone(),
                config,
            ));
        }

        let _ = producer.await;
        for worker in workers {
            let _ = worker.await;
        }

        let mut final_results = std::mem::take(&mut *results.lock().await);

        if let (Some(query), Some(ScoringMethod::Bm25)) = (&config.query, config.scoring_method) {
            if config.extract_head {
                ranker::rank(&mut final_results, query, config.score_threshold);
            }
        }

        if config.max_urls > 0 {
            final_results.truncate(config.max_urls as usize);
        }

        Ok(final_results)
    }

    fn spawn_producer(
        &self,
        domain: &str,
        config: &SeedingConfig,
        pattern: PatternMatcher,
        tx: mpsc::Sender<String>,
    ) -> tokio::task::JoinHandle<()> {
        let client = self.client.clone();
        let cache = self.cache.clone();
        let domain = domain.to_string();
        let pattern_str = config.pattern().to_string();
        let force = config.force;
        let sources = config.sources().to_vec();
        let index_id = self.index_id.clone();
        let verbose = config.verbose;

        tokio::spawn(async move {
            let mut seen: HashSet<String> = HashSet::new();
            let (inner_tx, mut inner_rx) = mpsc::channel::<String>(tx.max_capacity().max(1));

            let fetch = async {
                for source in &sources {
                    match source {
                        Source::Sitemap => {
                            if let Err(err) = crate::sources::sitemap::stream_urls(
                                &client, &cache, &domain, &pattern_str, &pattern, force, &inner_tx,
                            )
                            .await
                            {
                                log::warn!("sitemap source terminated for {domain}: {err}");
                            }
                        }
                        Source::CommonCrawl => {
                            let Some(index_id) = index_id.as_deref() else {
                                continue;
                            };
                            if let Err(err) = crate::sources::common_crawl::stream_urls(
                                &client, &cache, index_id, &domain, &pattern_str, &pattern, force, &inner_tx,
                            )
                            .await
                            {
                                log::warn!("Common Crawl source terminated for {domain}: {err}");
                            }
                        }
                    }
                }
            };

            let drain = async {
                while let Some(url) = inner_rx.recv().await {
                    if seen.insert(url.clone()) {
                        if verbose {
                            log::info!("discovered {url}");
                        }
                        if tx.send(url).await.is_err() {
                            break;
                        }
                    }
                }
            };

            tokio::join!(fetch, drain);
        })
    }

    fn spawn_worker(
        &self,
        rx: Arc<Mutex<mpsc::Receiver<String>>>,
        stop: Arc<AtomicBool>,
        results: Arc<Mutex<Vec<URLRecord>>>,
        rate_limiter: Option<Arc<Semaphore>>,
        config: &SeedingConfig,
    ) -> tokio::task::JoinHandle<()> {
        let client = self.client.clone();
        let cache = self.cache.clone();
        let mode = config.effective_validation_mode();
        let verify_redirect_targets = config.verify_redirect_targets;
        let force = config.force;
        let max_urls = config.max_urls;
        let verbose = config.verbose;

        tokio::spawn(async move {
            loop {
                let url = {
                    let mut guard = rx.lock().await;
                    match tokio::time::timeout(std::time::Duration::from_millis(200), guard.recv()).await {
                        Ok(Some(url)) => url,
                        Ok(None) => return,
                        Err(_) => continue,
                    }
                };

                // Once the cap is hit, keep pulling items off the queue and discarding
                // them instead of returning outright: the producer's bounded send
                // depends on someone still draining, and returning here would starve
                // it forever (its remaining sends would never unblock).
                if stop.load(Ordering::Relaxed) {
                    continue;
                }

                if max_urls > 0 {
                    let current_len = results.lock().await.len();
                    if current_len >= max_urls as usize {
                        stop.store(true, Ordering::Relaxed);
                        continue;
                    }
                }

                let _permit = match &rate_limiter {
                    Some(sem) => sem.clone().acquire_owned().await.ok(),
                    None => None,
                };

                let record = validator::validate(&client, &cache, &url, mode, verify_redirect_targets, force).await;
                if verbose {
                    log::info!("validated {} -> {:?}", record.url, record.status);
                }

                let mut guard = results.lock().await;
                if max_urls <= 0 || guard.len() < max_urls as usize {
                    guard.push(record);
                }
                if max_urls > 0 && guard.len() >= max_urls as usize {
                    stop.store(true, Ordering::Relaxed);
                }
            }
        })
    }
}
