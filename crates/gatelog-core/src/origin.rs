//! Glob matching for referer whitelists.
//!
//! A pattern such as `https://*.example.com` is compiled once into an anchored
//! regular expression. Every `*` matches any run of characters (including the
//! empty run); every other character is literal. The whole header value must be
//! produced by the pattern, so `https://*.example.com` accepts
//! `https://app.example.com` but rejects `https://example.com` and
//! `https://app.example.com.evil.io`.

use moka::sync::Cache;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Compiled-size ceiling for a single origin pattern.
pub const DEFAULT_PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// A compiled, fully anchored origin glob.
#[derive(Debug, Clone)]
pub struct OriginMatcher {
    pattern: String,
    regex: Regex,
}

impl OriginMatcher {
    /// Compile a glob pattern with the default size limit.
    pub fn compile(pattern: &str) -> CoreResult<Self> {
        Self::compile_with_limit(pattern, DEFAULT_PATTERN_SIZE_LIMIT)
    }

    /// Compile a glob pattern, failing if the compiled program exceeds `size_limit` bytes.
    pub fn compile_with_limit(pattern: &str, size_limit: usize) -> CoreResult<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        let regex = RegexBuilder::new(&format!("^{body}$"))
            .size_limit(size_limit)
            .build()
            .map_err(|e| CoreError::invalid_pattern(pattern, e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The glob this matcher was compiled from.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether the entire `origin` is produced by the glob.
    #[must_use]
    pub fn matches(&self, origin: &str) -> bool {
        self.regex.is_match(origin)
    }
}

/// Shared cache of compiled matchers keyed by pattern text.
///
/// Permission records are resolved per request, but their patterns repeat, so
/// compilation happens once per distinct pattern rather than once per request.
#[derive(Clone)]
pub struct MatcherCache {
    cache: Cache<String, OriginMatcher>,
    size_limit: usize,
}

impl MatcherCache {
    /// Create a cache holding at most `max_capacity` compiled patterns.
    pub fn new(max_capacity: u64) -> Self {
        Self::with_size_limit(max_capacity, DEFAULT_PATTERN_SIZE_LIMIT)
    }

    /// Create a cache whose patterns are compiled with a custom size limit.
    pub fn with_size_limit(max_capacity: u64, size_limit: usize) -> Self {
        Self {
            cache: Cache::new(max_capacity),
            size_limit,
        }
    }

    /// Fetch the compiled matcher for `pattern`, compiling it on a miss.
    pub fn get_or_compile(&self, pattern: &str) -> CoreResult<OriginMatcher> {
        if let Some(matcher) = self.cache.get(pattern) {
            return Ok(matcher);
        }

        let matcher = OriginMatcher::compile_with_limit(pattern, self.size_limit)?;
        debug!(pattern = %pattern, "compiled origin pattern");
        self.cache.insert(pattern.to_string(), matcher.clone());
        Ok(matcher)
    }

    /// Return the position of the first pattern accepting `origin`.
    ///
    /// Patterns are evaluated in order and evaluation stops at the first match.
    /// A pattern that fails to compile aborts the scan; later patterns are not tried.
    pub fn find_match(&self, patterns: &[String], origin: &str) -> CoreResult<Option<usize>> {
        for (position, pattern) in patterns.iter().enumerate() {
            if self.get_or_compile(pattern)?.matches(origin) {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }
}

impl Default for MatcherCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wildcard_subdomain() {
        let matcher = OriginMatcher::compile("https://*.example.com").unwrap();
        assert!(matcher.matches("https://app.example.com"));
        assert!(matcher.matches("https://a.b.example.com"));
        // The literal dot after the wildcard is still required.
        assert!(!matcher.matches("https://example.com"));
    }

    #[test]
    fn test_match_is_anchored_at_both_ends() {
        let matcher = OriginMatcher::compile("https://*.example.com").unwrap();
        assert!(!matcher.matches("https://app.example.com.evil.io"));
        assert!(!matcher.matches("evil://https://app.example.com"));
    }

    #[test]
    fn test_bare_wildcard_accepts_everything() {
        let matcher = OriginMatcher::compile("*").unwrap();
        assert!(matcher.matches("https://anything.io/page"));
        assert!(matcher.matches(""));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let matcher = OriginMatcher::compile("https://example.com/?q=(a|b)").unwrap();
        assert!(matcher.matches("https://example.com/?q=(a|b)"));
        assert!(!matcher.matches("https://example.com/q=a"));

        let dotted = OriginMatcher::compile("https://example.com").unwrap();
        assert!(!dotted.matches("https://exampleXcom"));
    }

    #[test]
    fn test_wildcard_matches_path_suffix() {
        let matcher = OriginMatcher::compile("http://localhost:3000/*").unwrap();
        assert!(matcher.matches("http://localhost:3000/"));
        assert!(matcher.matches("http://localhost:3000/dashboard/logs"));
        assert!(!matcher.matches("http://localhost:3001/"));
    }

    #[test]
    fn test_compile_fails_over_size_limit() {
        let err = OriginMatcher::compile_with_limit("https://*.example.com", 10).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPattern { .. }));
    }

    #[test]
    fn test_find_match_first_wins() {
        let cache = MatcherCache::default();
        let list = patterns(&["https://other.io", "https://*.example.com", "*"]);
        assert_eq!(
            cache.find_match(&list, "https://app.example.com").unwrap(),
            Some(1)
        );
    }

    #[test]
    fn test_find_match_empty_list_never_matches() {
        let cache = MatcherCache::default();
        assert_eq!(cache.find_match(&[], "https://app.example.com").unwrap(), None);
    }

    #[test]
    fn test_find_match_aborts_on_compile_error() {
        // A tiny size limit makes every pattern fail to compile.
        let strict = MatcherCache::with_size_limit(16, 10);
        let list = patterns(&["https://*.example.com", "*"]);
        let err = strict.find_match(&list, "https://app.example.com").unwrap_err();
        match err {
            CoreError::InvalidPattern { pattern, .. } => {
                assert_eq!(pattern, "https://*.example.com")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cache_reuses_compiled_matcher() {
        let cache = MatcherCache::new(8);
        let first = cache.get_or_compile("https://*.example.com").unwrap();
        let second = cache.get_or_compile("https://*.example.com").unwrap();
        assert_eq!(first.pattern(), second.pattern());
        assert!(second.matches("https://www.example.com"));
    }
}
