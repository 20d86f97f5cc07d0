//! Two-tier disk cache: per-source URL lists and per-URL liveness/head records.
//!
//! Writes follow the teacher's atomic-write idiom from
//! `content_saver::compression::save_compressed_file`: content lands in a
//! `NamedTempFile::new_in` sibling of the target and is `.persist()`-ed into place, so a
//! concurrent reader never observes a half-written file. Cache errors are swallowed per
//! `SPEC_FULL.md` §7 (CacheError): a read failure is a miss, a write failure is a no-op.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::Source;
use crate::types::{HeadData, URLRecord, UrlStatus};

/// Default time-to-live for every cache kind: 7 days.
pub const DEFAULT_TTL: chrono::Duration = chrono::Duration::days(7);

/// Per-URL cache kind: liveness-only records or head-extraction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Live,
    Head,
}

impl CacheKind {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Head => "head",
        }
    }
}

/// Schema stored for a single URL in the per-URL cache: `URLRecord` minus the
/// transient `relevance_score`/`error` fields (§3 URLCacheEntry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlCacheEntry {
    pub url: String,
    pub status: UrlStatus,
    pub head_data: HeadData,
}

impl From<&URLRecord> for UrlCacheEntry {
    fn from(record: &URLRecord) -> Self {
        Self {
            url: record.url.clone(),
            status: record.status,
            head_data: record.head_data.clone(),
        }
    }
}

/// Root of the cache tree: `<base>/.crawl4ai/seeder_cache/`.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    ttl: chrono::Duration,
}

impl DiskCache {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: base_dir.into().join(".crawl4ai").join("seeder_cache"),
            ttl: DEFAULT_TTL,
        }
    }

    /// Resolves the base directory the original implementation uses: the
    /// `CRAWL4_AI_BASE_DIRECTORY` environment variable if set, otherwise the user's home.
    pub fn default_base_dir() -> PathBuf {
        std::env::var_os("CRAWL4_AI_BASE_DIRECTORY")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn with_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn is_fresh(path: &Path, ttl: chrono::Duration) -> bool {
        let Ok(meta) = std::fs::metadata(path) else {
            return false;
        };
        let Ok(modified) = meta.modified() else {
            return false;
        };
        let age = std::time::SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        age < ttl
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(u64::MAX))
    }

    // -- Source-list cache ------------------------------------------------------

    /// Builds `{index_id|"sitemap"}_{domain_safe}_{pattern_hash8}.jsonl`.
    ///
    /// Resolved (SPEC_FULL.md §9): `domain_safe` is the raw `domain` argument with
    /// `/?#` replaced by `_`, not a separately scheme-stripped host.
    pub fn source_list_path(&self, source: Source, domain: &str, pattern: &str) -> PathBuf {
        let tag = source.tag();
        let domain_safe = sanitize_domain(domain);
        let pattern_hash8 = pattern_hash8(pattern);
        self.root
            .join(format!("{tag}_{domain_safe}_{pattern_hash8}.jsonl"))
    }

    /// Same as `source_list_path` but for the Common Crawl source, which keys by
    /// index id rather than the literal `"cc"` tag.
    pub fn cc_source_list_path(&self, index_id: &str, domain: &str, pattern: &str) -> PathBuf {
        let domain_safe = sanitize_domain(domain);
        let pattern_hash8 = pattern_hash8(pattern);
        self.root
            .join(format!("{index_id}_{domain_safe}_{pattern_hash8}.jsonl"))
    }

    pub fn is_source_list_fresh(&self, path: &Path, force: bool) -> bool {
        !force && Self::is_fresh(path, self.ttl)
    }

    /// Reads every line of a cached source list, ignoring I/O errors (treated as a miss
    /// by the caller checking `is_source_list_fresh` first).
    pub fn read_source_list(&self, path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .map(|contents| {
                contents
                    .lines()
                    .map(str::to_string)
                    .filter(|l| !l.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Appends a single URL line to the source-list cache file, creating it (and its
    /// parent directory) if necessary. Best-effort: errors are logged and swallowed.
    pub fn append_source_list_line(&self, path: &Path, url: &str) {
        if let Err(err) = self.append_line_inner(path, url) {
            log::debug!("cache write skipped for {}: {err}", path.display());
        }
    }

    fn append_line_inner(&self, path: &Path, url: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        use std::io::Write as _;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{url}")
    }

    // -- Per-URL cache ------------------------------------------------------

    pub fn url_cache_path(&self, kind: CacheKind, url: &str) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{}.json", sha1_hex(url)))
    }

    /// Reads a cached per-URL record if present and fresh.
    pub fn read_url_entry(&self, kind: CacheKind, url: &str, force: bool) -> Option<UrlCacheEntry> {
        let path = self.url_cache_path(kind, url);
        if force || !Self::is_fresh(&path, self.ttl) {
            return None;
        }
        let contents = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// Writes a per-URL record atomically (temp file + rename), swallowing errors.
    pub fn write_url_entry(&self, kind: CacheKind, entry: &UrlCacheEntry) {
        let path = self.url_cache_path(kind, &entry.url);
        if let Err(err) = self.write_url_entry_inner(&path, entry) {
            log::debug!("cache write skipped for {}: {err}", path.display());
        }
    }

    fn write_url_entry_inner(&self, path: &Path, entry: &UrlCacheEntry) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("cache path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let json = serde_json::to_vec(entry)?;
        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(&json)?;
        temp_file.persist(path)?;
        Ok(())
    }

    // -- Index id cache ------------------------------------------------------

    pub fn index_id_path(&self) -> PathBuf {
        self.root.join("latest_cc_index.txt")
    }

    pub fn read_index_id(&self, ttl: chrono::Duration) -> Option<String> {
        let path = self.index_id_path();
        if !Self::is_fresh(&path, ttl) {
            return None;
        }
        std::fs::read_to_string(&path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn write_index_id(&self, id: &str) {
        let path = self.index_id_path();
        if let Err(err) = self.write_index_id_inner(&path, id) {
            log::debug!("failed to cache index id: {err}");
        }
    }

    fn write_index_id_inner(&self, path: &Path, id: &str) -> anyhow::Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("cache path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(id.as_bytes())?;
        temp_file.persist(path)?;
        Ok(())
    }
}

/// Replaces `/`, `?`, `#` with `_`, matching the original implementation's cache-key
/// sanitizer for both the Common Crawl and sitemap cache filenames.
pub fn sanitize_domain(domain: &str) -> String {
    domain
        .chars()
        .map(|c| if matches!(c, '/' | '?' | '#') { '_' } else { c })
        .collect()
}

/// First 8 hex characters of the MD5 digest of the raw pattern.
pub fn pattern_hash8(pattern: &str) -> String {
    let digest = md5::compute(pattern.as_bytes());
    format!("{digest:x}")[..8].to_string()
}

/// Hex-encoded SHA-1 digest of a URL, used as the per-URL cache filename stem.
pub fn sha1_hex(url: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
