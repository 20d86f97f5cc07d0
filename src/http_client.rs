//! Shared HTTP client wrapper.
//!
//! One `reqwest::Client` is built per `UrlSeeder` instance and reused across calls, as
//! the teacher shares a single `reqwest::Client` across concurrent downloads in
//! `inline_css::css_downloader`. HTTP/2 and a desktop `User-Agent` are the client-level
//! defaults; redirect-following is disabled globally because every caller in this
//! crate needs to inspect intermediate `Location` headers itself (§4.8).

use crate::error::SeederResult;
use reqwest::{Client, Method, Response};
use std::time::Duration;

/// Desktop Chrome user agent, matching the UA the teacher's crawler sends.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

const DEFAULT_TOTAL_TIMEOUT_SECS: u64 = 20;

/// Thin wrapper around `reqwest::Client` providing the non-redirecting GET and HEAD
/// every source and the validator need; response bodies are read via `bytes_stream`
/// directly on the returned `Response` where a bounded prefix read is required.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> SeederResult<Self> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TOTAL_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(crate::error::SeederError::from)?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, timeout: Duration) -> reqwest::Result<Response> {
        self.client
            .request(Method::GET, url)
            .timeout(timeout)
            .send()
            .await
    }

    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: reqwest::header::HeaderMap,
        timeout: Duration,
    ) -> reqwest::Result<Response> {
        self.client
            .request(Method::GET, url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await
    }

    pub async fn head(&self, url: &str, timeout: Duration) -> reqwest::Result<Response> {
        self.client
            .request(Method::HEAD, url)
            .timeout(timeout)
            .send()
            .await
    }
}
