use regex::Regex;

use crate::{BenchmarkFullName, Error, Result};

/// A glob pattern in which `*` matches any sequence of characters, including none.
///
/// All other characters match only themselves.
///
/// # Examples
///
/// ```
/// use stat_harness::GlobPattern;
///
/// let pattern = GlobPattern::new("Group1*");
///
/// assert!(pattern.matches("Group1/Case"));
/// assert!(pattern.matches("Group10/Case"));
/// assert!(!pattern.matches("Group2/Case"));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GlobPattern {
    pattern: Vec<char>,
}

impl GlobPattern {
    /// Creates a pattern.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.chars().collect(),
        }
    }

    /// Whether `text` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = text.chars().collect::<Vec<_>>();

        let mut pattern_index = 0;
        let mut text_index = 0;

        // Position of the last `*` and the text position it was tried with, for backtracking.
        let mut backtrack: Option<(usize, usize)> = None;

        while text_index < text.len() {
            match self.pattern.get(pattern_index) {
                Some('*') => {
                    backtrack = Some((pattern_index, text_index));
                    pattern_index = pattern_index.saturating_add(1);
                }
                Some(expected) if Some(expected) == text.get(text_index) => {
                    pattern_index = pattern_index.saturating_add(1);
                    text_index = text_index.saturating_add(1);
                }
                _ => match backtrack {
                    Some((star_index, star_text_index)) => {
                        // Let the last `*` swallow one more character.
                        let next_text_index = star_text_index.saturating_add(1);

                        backtrack = Some((star_index, next_text_index));
                        pattern_index = star_index.saturating_add(1);
                        text_index = next_text_index;
                    }
                    None => return false,
                },
            }
        }

        self.pattern
            .get(pattern_index..)
            .is_some_and(|rest| rest.iter().all(|c| *c == '*'))
    }
}

/// Selects benchmark cases by their full name, `group/case`.
///
/// Patterns are either globs ([`GlobPattern`]) or regular expressions. A regular expression
/// must match the whole name. A name passes if it matches at least one include pattern (or
/// there are none) and no exclude pattern.
///
/// # Examples
///
/// ```
/// use stat_harness::{BenchmarkFullName, NameFilter};
///
/// let filter = NameFilter::new()
///     .include("parse/*")
///     .exclude("*slow*");
///
/// assert!(filter.matches(&BenchmarkFullName::new("parse", "json")));
/// assert!(!filter.matches(&BenchmarkFullName::new("parse", "json_slow")));
/// assert!(!filter.matches(&BenchmarkFullName::new("render", "html")));
///
/// let filter = NameFilter::new().include_regex(r"parse/(json|xml)").unwrap();
///
/// assert!(filter.matches(&BenchmarkFullName::new("parse", "xml")));
/// assert!(!filter.matches(&BenchmarkFullName::new("parse", "xml_fast")));
/// ```
#[derive(Clone, Debug, Default)]
pub struct NameFilter {
    include: Vec<NamePattern>,
    exclude: Vec<NamePattern>,
}

#[derive(Clone, Debug)]
enum NamePattern {
    Glob(GlobPattern),

    // Anchored at both ends.
    Regex(Regex),
}

impl NamePattern {
    fn regex(pattern: &str) -> Result<Self> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(Self::Regex)
            .map_err(|source| Error::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches(name),
            Self::Regex(regex) => regex.is_match(name),
        }
    }
}

impl NameFilter {
    /// Creates a filter that lets every name pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an include glob pattern.
    #[must_use]
    pub fn include(mut self, pattern: &str) -> Self {
        self.include
            .push(NamePattern::Glob(GlobPattern::new(pattern)));
        self
    }

    /// Adds an exclude glob pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: &str) -> Self {
        self.exclude
            .push(NamePattern::Glob(GlobPattern::new(pattern)));
        self
    }

    /// Adds an include regular expression, which must match the whole name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRegex`] if `pattern` is not a valid regular expression.
    pub fn include_regex(mut self, pattern: &str) -> Result<Self> {
        self.include.push(NamePattern::regex(pattern)?);
        Ok(self)
    }

    /// Adds an exclude regular expression, which must match the whole name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRegex`] if `pattern` is not a valid regular expression.
    pub fn exclude_regex(mut self, pattern: &str) -> Result<Self> {
        self.exclude.push(NamePattern::regex(pattern)?);
        Ok(self)
    }

    /// Whether the case with this name should run.
    #[must_use]
    pub fn matches(&self, name: &BenchmarkFullName) -> bool {
        let name = name.to_string();

        (self.include.is_empty() || self.include.iter().any(|pattern| pattern.matches(&name)))
            && !self.exclude.iter().any(|pattern| pattern.matches(&name))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_matches_exactly() {
        let pattern = GlobPattern::new("abc");

        assert!(pattern.matches("abc"));
        assert!(!pattern.matches("ab"));
        assert!(!pattern.matches("abcd"));
        assert!(!pattern.matches(""));
    }

    #[test]
    fn star_matches_any_sequence() {
        assert!(GlobPattern::new("*").matches(""));
        assert!(GlobPattern::new("*").matches("anything"));
        assert!(GlobPattern::new("a*c").matches("ac"));
        assert!(GlobPattern::new("a*c").matches("abbbc"));
        assert!(!GlobPattern::new("a*c").matches("abcd"));
        assert!(GlobPattern::new("*b*").matches("abc"));
        assert!(GlobPattern::new("a**").matches("a"));
    }

    #[test]
    fn star_backtracks() {
        assert!(GlobPattern::new("*ab").matches("aab"));
        assert!(GlobPattern::new("a*b*c").matches("aXbYbZc"));
        assert!(!GlobPattern::new("a*b*c").matches("aXbYbZ"));
    }

    #[test]
    fn prefix_pattern_over_group_names() {
        let pattern = GlobPattern::new("Group1*");

        assert!(pattern.matches("Group1/X"));
        assert!(pattern.matches("Group10/X"));
        assert!(!pattern.matches("Group2/X"));
    }

    #[test]
    fn unicode_is_matched_by_character() {
        assert!(GlobPattern::new("gr*ß").matches("grüß"));
        assert!(GlobPattern::new("*é").matches("café"));
    }

    #[test]
    fn empty_filter_accepts_everything() {
        assert!(NameFilter::new().matches(&BenchmarkFullName::new("a", "b")));
    }

    #[test]
    fn include_and_exclude_compose() {
        let filter = NameFilter::new()
            .include("Group1*")
            .include("Other/keep")
            .exclude("*/skip");

        assert!(filter.matches(&BenchmarkFullName::new("Group10", "X")));
        assert!(filter.matches(&BenchmarkFullName::new("Other", "keep")));
        assert!(!filter.matches(&BenchmarkFullName::new("Group2", "X")));
        assert!(!filter.matches(&BenchmarkFullName::new("Group1", "skip")));
    }

    #[test]
    fn regex_must_match_whole_name() {
        let filter = NameFilter::new().include_regex(r"Group\d/X").unwrap();

        assert!(filter.matches(&BenchmarkFullName::new("Group1", "X")));
        assert!(!filter.matches(&BenchmarkFullName::new("Group10", "X")));
        assert!(!filter.matches(&BenchmarkFullName::new("Group1", "XY")));
    }

    #[test]
    fn regex_alternation_is_anchored_as_a_whole() {
        let filter = NameFilter::new().include_regex("a/x|b/y").unwrap();

        assert!(filter.matches(&BenchmarkFullName::new("a", "x")));
        assert!(filter.matches(&BenchmarkFullName::new("b", "y")));
        assert!(!filter.matches(&BenchmarkFullName::new("a", "x2")));
        assert!(!filter.matches(&BenchmarkFullName::new("za", "x")));
    }

    #[test]
    fn regex_and_glob_patterns_compose() {
        let filter = NameFilter::new()
            .include("parse/*")
            .include_regex("render/(html|svg)")
            .unwrap()
            .exclude_regex(".*_slow")
            .unwrap();

        assert!(filter.matches(&BenchmarkFullName::new("parse", "json")));
        assert!(filter.matches(&BenchmarkFullName::new("render", "svg")));
        assert!(!filter.matches(&BenchmarkFullName::new("render", "png")));
        assert!(!filter.matches(&BenchmarkFullName::new("parse", "json_slow")));
    }

    #[test]
    fn invalid_regex_is_rejected() {
        match NameFilter::new().exclude_regex("(unclosed") {
            Err(Error::InvalidRegex { pattern, .. }) => assert_eq!(pattern, "(unclosed"),
            other => panic!("expected an invalid regex error, got {other:?}"),
        }
    }
}
