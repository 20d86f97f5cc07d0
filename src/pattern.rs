//! Shell-style glob pattern matching over URLs, with scheme- and `www.`-stripped
//! fallbacks (§4.4).

use globset::{Glob, GlobMatcher};

/// A compiled pattern matcher. Compiling once (the glob is typically reused across an
/// entire `urls()` call) avoids re-parsing the glob for every candidate URL.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    matcher: GlobMatcher,
}

impl PatternMatcher {
    pub fn new(pattern: &str) -> Result<Self, globset::Error> {
        Ok(Self {
            matcher: Glob::new(pattern)?.compile_matcher(),
        })
    }

    /// True if `url` matches the glob directly, or with its scheme stripped, or
    /// (if it starts with `www.` after scheme-stripping) with that additionally
    /// stripped.
    pub fn matches(&self, url: &str) -> bool {
        if self.matcher.is_match(url) {
            return true;
        }

        let Some(scheme_stripped) = strip_scheme(url) else {
            return false;
        };
        if self.matcher.is_match(scheme_stripped) {
            return true;
        }

        if let Some(www_stripped) = scheme_stripped.strip_prefix("www.") {
            if self.matcher.is_match(www_stripped) {
                return true;
            }
        }

        false
    }
}

fn strip_scheme(url: &str) -> Option<&str> {
    url.split_once("://").map(|(_, rest)| rest).or(Some(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything() {
        let m = PatternMatcher::new("*").expect("compiles");
        assert!(m.matches("https://example.com/a/b?c=1"));
    }

    #[test]
    fn blog_path_pattern() {
        let m = PatternMatcher::new("*/blog/*").expect("compiles");
        assert!(m.matches("https://ex.com/blog/1"));
        assert!(!m.matches("https://ex.com/a"));
    }

    #[test]
    fn scheme_stripped_fallback() {
        let m = PatternMatcher::new("example.com/*").expect("compiles");
        assert!(m.matches("https://example.com/page"));
    }

    #[test]
    fn www_stripped_fallback() {
        let m = PatternMatcher::new("example.com/*").expect("compiles");
        assert!(m.matches("https://www.example.com/page"));
    }

    #[test]
    fn no_match_yields_false_not_error() {
        let m = PatternMatcher::new("*.pdf").expect("compiles");
        assert!(!m.matches("https://example.com/page.html"));
    }

    proptest::proptest! {
        #[test]
        fn wildcard_star_never_rejects_http_urls(path in "[a-z0-9/]{0,40}") {
            let m = PatternMatcher::new("*").expect("compiles");
            let url = format!("https://example.com/{path}");
            proptest::prop_assert!(m.matches(&url));
        }
    }
}
