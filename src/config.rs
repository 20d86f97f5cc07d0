//! Configuration for a single seeding call.
//!
//! Unlike `CrawlConfig`'s typestate builder, `SeedingConfig` has no required-field
//! ordering (`domain` is supplied per call, not stored here), so a flat `Default` plus
//! chainable setters is the simpler, equally idiomatic shape.

use crate::error::{SeederError, SeederResult};
use serde::{Deserialize, Serialize};

/// Discovery sources the producer may draw from, combined with `+` in the wire form
/// (e.g. `"sitemap+cc"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    CommonCrawl,
    Sitemap,
}

impl Source {
    fn as_tag(self) -> &'static str {
        match self {
            Self::CommonCrawl => "cc",
            Self::Sitemap => "sitemap",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "cc" => Some(Self::CommonCrawl),
            "sitemap" => Some(Self::Sitemap),
            _ => None,
        }
    }
}

/// Scoring method applied after validation, when a `query` is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringMethod {
    Bm25,
}

/// Immutable-per-call configuration for `UrlSeeder::urls`/`many_urls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedingConfig {
    pub(crate) pattern: String,
    pub(crate) source: Vec<Source>,
    pub(crate) live_check: bool,
    pub(crate) extract_head: bool,
    pub(crate) concurrency: usize,
    pub(crate) hits_per_sec: Option<u32>,
    pub(crate) force: bool,
    pub(crate) max_urls: i64,
    pub(crate) query: Option<String>,
    pub(crate) score_threshold: Option<f64>,
    pub(crate) scoring_method: Option<ScoringMethod>,
    pub(crate) verify_redirect_targets: bool,
    pub(crate) verbose: bool,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            pattern: "*".to_string(),
            source: vec![Source::CommonCrawl, Source::Sitemap],
            live_check: false,
            extract_head: false,
            concurrency: 10,
            hits_per_sec: None,
            force: false,
            max_urls: -1,
            query: None,
            score_threshold: None,
            scoring_method: None,
            verify_redirect_targets: false,
            verbose: false,
        }
    }
}

impl SeedingConfig {
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Parses a `+`-joined source list (`"cc"`, `"sitemap"`, `"cc+sitemap"`).
    pub fn with_source_str(mut self, spec: &str) -> SeederResult<Self> {
        let mut sources = Vec::new();
        for tag in spec.split('+') {
            let tag = tag.trim();
            match Source::from_tag(tag) {
                Some(s) => sources.push(s),
                None => {
                    return Err(SeederError::BadInput(format!(
                        "unknown source tag '{tag}', expected one of 'cc', 'sitemap'"
                    )));
                }
            }
        }
        self.source = sources;
        Ok(self)
    }

    #[must_use]
    pub fn with_live_check(mut self, live_check: bool) -> Self {
        self.live_check = live_check;
        self
    }

    #[must_use]
    pub fn with_extract_head(mut self, extract_head: bool) -> Self {
        self.extract_head = extract_head;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_hits_per_sec(mut self, hits_per_sec: Option<u32>) -> Self {
        self.hits_per_sec = hits_per_sec;
        self
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_max_urls(mut self, max_urls: i64) -> Self {
        self.max_urls = max_urls;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_scoring_method(mut self, method: ScoringMethod) -> Self {
        self.scoring_method = Some(method);
        self
    }

    #[must_use]
    pub fn with_verify_redirect_targets(mut self, verify: bool) -> Self {
        self.verify_redirect_targets = verify;
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn sources(&self) -> &[Source] {
        &self.source
    }

    /// Validates the config, raising `BadInput` for the cases the orchestrator must
    /// reject up front rather than discover mid-pipeline.
    pub(crate) fn validate(&self) -> SeederResult<()> {
        if self.source.is_empty() {
            return Err(SeederError::BadInput("source list is empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(SeederError::BadInput(
                "concurrency must be positive".to_string(),
            ));
        }
        if self.max_urls < -1 {
            return Err(SeederError::BadInput(format!(
                "max_urls must be -1 (unlimited) or non-negative, got {}",
                self.max_urls
            )));
        }
        Ok(())
    }

    /// `extract_head` is the superset of `live_check`: when both are set only the
    /// GET-prefix path runs. See `SPEC_FULL.md` §4.9 / §9.
    pub(crate) fn effective_validation_mode(&self) -> ValidationMode {
        if self.extract_head {
            ValidationMode::ExtractHead
        } else if self.live_check {
            ValidationMode::LiveOnly
        } else {
            ValidationMode::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationMode {
    None,
    LiveOnly,
    ExtractHead,
}

impl Source {
    pub(crate) fn tag(self) -> &'static str {
        self.as_tag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_unbounded_and_unlimited_sources() {
        let cfg = SeedingConfig::default();
        assert_eq!(cfg.pattern, "*");
        assert_eq!(cfg.max_urls, -1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_source_tag() {
        let err = SeedingConfig::default().with_source_str("cc+carrier-pigeon");
        assert!(matches!(err, Err(SeederError::BadInput(_))));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let cfg = SeedingConfig::default().with_concurrency(0);
        assert!(matches!(cfg.validate(), Err(SeederError::BadInput(_))));
    }

    #[test]
    fn rejects_sub_unlimited_max_urls() {
        let cfg = SeedingConfig::default().with_max_urls(-2);
        assert!(matches!(cfg.validate(), Err(SeederError::BadInput(_))));
    }

    #[test]
    fn extract_head_is_superset_of_live_check() {
        let cfg = SeedingConfig::default()
            .with_live_check(true)
            .with_extract_head(true);
        assert_eq!(cfg.effective_validation_mode(), ValidationMode::ExtractHead);
    }
}
