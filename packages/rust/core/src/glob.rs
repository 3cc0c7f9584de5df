//! Glob-style path patterns for document identifiers.
//!
//! Patterns are matched against normalized identifiers (no leading or
//! trailing `/`) and are case-sensitive:
//!
//! - `*` matches any run of characters inside one segment
//! - `?` matches one character inside one segment
//! - `**` as a whole segment matches zero or more segments, so
//!   `languages/**` matches `languages`, `languages/node` and
//!   `languages/node/bun`, but never `languages-other`
//! - a pattern without wildcards matches only the identical identifier
//!
//! An empty pattern matches nothing, and so does an empty [`PatternSet`].

use regex::Regex;

use docsets_shared::{DocsetsError, Result, normalize_id};

/// A single compiled pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Option<Regex>,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let normalized = normalize_id(pattern.trim());
        let regex = if normalized.is_empty() {
            None
        } else {
            let compiled = Regex::new(&glob_to_regex(normalized)).map_err(|e| {
                DocsetsError::validation(format!("invalid path pattern '{pattern}': {e}"))
            })?;
            Some(compiled)
        };

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, identifier: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|re| re.is_match(normalize_id(identifier)))
    }
}

/// Match a single identifier against a single pattern.
///
/// Convenience for one-off checks; compile a [`GlobPattern`] or
/// [`PatternSet`] when matching many identifiers.
pub fn matches(identifier: &str, pattern: &str) -> bool {
    GlobPattern::new(pattern).is_ok_and(|p| p.matches(identifier))
}

/// An ordered list of patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<GlobPattern>,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| GlobPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlobPattern> {
        self.patterns.iter()
    }

    /// True when any pattern matches. Always false for an empty set.
    pub fn matches(&self, identifier: &str) -> bool {
        self.first_match(identifier).is_some()
    }

    /// Index of the first pattern that matches.
    pub fn first_match(&self, identifier: &str) -> Option<usize> {
        self.patterns.iter().position(|p| p.matches(identifier))
    }

    /// Append another set's patterns after this one's.
    pub fn chain(&self, other: &PatternSet) -> PatternSet {
        let mut patterns = self.patterns.clone();
        patterns.extend(other.patterns.iter().cloned());
        PatternSet { patterns }
    }
}

/// Convert a normalized glob pattern to an anchored regex.
fn glob_to_regex(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').collect();
    let last = segments.len() - 1;
    let mut out = String::from("^");

    for (i, segment) in segments.iter().enumerate() {
        if *segment == "**" {
            if last == 0 {
                out.push_str(".*");
            } else if i == 0 {
                // Leading `**/`: any number of whole segments, including none.
                out.push_str("(?:.*/)?");
            } else {
                // Middle or trailing: zero or more segments after the prefix.
                out.push_str("(?:/.*)?");
            }
            continue;
        }

        let follows_leading_globstar = i == 1 && segments[0] == "**";
        if i > 0 && !follows_leading_globstar {
            out.push('/');
        }
        out.push_str(&segment_to_regex(segment));
    }

    out.push('$');
    out
}

fn segment_to_regex(segment: &str) -> String {
    let mut out = String::new();
    for c in segment.chars() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trailing_globstar_matches_prefix_and_nested() {
        assert!(matches("languages/node", "languages/**"));
        assert!(matches("languages/anything/deeper", "languages/**"));
        assert!(matches("languages", "languages/**"));
        assert!(!matches("languages-other", "languages/**"));
        assert!(!matches("languagesx/node", "languages/**"));
    }

    #[test]
    fn literal_pattern_matches_exact_identifier_only() {
        assert!(matches("reference/cli", "reference/cli"));
        assert!(!matches("reference/cli-extra", "reference/cli"));
        assert!(!matches("reference", "reference/cli"));
    }

    #[test]
    fn single_star_stays_within_segment() {
        assert!(matches("a1", "a*"));
        assert!(matches("index", "index*"));
        assert!(!matches("b1", "a*"));
        assert!(!matches("a/b", "a*"));
        assert!(matches("guides/adding-steps", "guides/*"));
        assert!(!matches("guides/deep/page", "guides/*"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(matches("v1", "v?"));
        assert!(!matches("v10", "v?"));
        assert!(!matches("v/", "v?"));
    }

    #[test]
    fn leading_and_middle_globstar() {
        assert!(matches("index", "**/index"));
        assert!(matches("a/b/index", "**/index"));
        assert!(!matches("reindex", "**/index"));

        assert!(matches("a/b", "a/**/b"));
        assert!(matches("a/x/y/b", "a/**/b"));
        assert!(!matches("a/xb", "a/**/b"));
    }

    #[test]
    fn bare_globstar_matches_everything() {
        assert!(matches("anything/at/all", "**"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!matches("Guides/x", "guides/**"));
    }

    #[test]
    fn separators_are_normalized() {
        assert!(matches("/guides/x/", "guides/**"));
        assert!(matches("guides/x", "/guides/**/"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(matches("api/v1.0", "api/v1.0"));
        assert!(!matches("api/v1x0", "api/v1.0"));
        assert!(matches("c++/intro", "c++/*"));
    }

    #[test]
    fn empty_pattern_matches_nothing() {
        assert!(!matches("index", ""));
        assert!(!matches("", ""));
        assert!(!matches("index", "/"));
    }

    #[test]
    fn empty_pattern_set_matches_nothing() {
        let set = PatternSet::new(Vec::<String>::new()).unwrap();
        assert!(set.is_empty());
        assert!(!set.matches("index"));
        assert_eq!(set.first_match("index"), None);
    }

    #[test]
    fn pattern_set_reports_first_match_index() {
        let set = PatternSet::new(["guides/**", "guides/adding-*", "config/**"]).unwrap();
        assert_eq!(set.first_match("guides/adding-steps"), Some(0));
        assert_eq!(set.first_match("config/file"), Some(2));
        assert_eq!(set.first_match("reference/cli"), None);
    }

    #[test]
    fn chain_keeps_order() {
        let a = PatternSet::new(["languages/node"]).unwrap();
        let b = PatternSet::new(["index*"]).unwrap();
        let chained = a.chain(&b);
        assert_eq!(chained.len(), 2);
        assert_eq!(chained.first_match("index"), Some(1));
        assert_eq!(chained.iter().next().map(GlobPattern::as_str), Some("languages/node"));
    }

    proptest! {
        #[test]
        fn trailing_globstar_covers_prefix_and_descendants(
            prefix in "[a-z0-9-]{1,8}(/[a-z0-9-]{1,8}){0,2}",
            rest in "[a-z0-9-]{1,8}(/[a-z0-9-]{1,8}){0,3}",
        ) {
            let pattern = format!("{prefix}/**");
            prop_assert!(matches(&prefix, &pattern));
            let descendant = format!("{prefix}/{rest}");
            prop_assert!(matches(&descendant, &pattern));
        }

        #[test]
        fn trailing_globstar_rejects_sibling_with_shared_prefix(
            prefix in "[a-z0-9-]{1,8}(/[a-z0-9-]{1,8}){0,2}",
            suffix in "[a-z0-9-][a-z0-9/-]{0,10}",
        ) {
            let pattern = format!("{prefix}/**");
            let sibling = format!("{prefix}{suffix}");
            prop_assert!(!matches(&sibling, &pattern));
        }
    }
}
