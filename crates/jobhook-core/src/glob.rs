//! Shell-style branch patterns.
//!
//! A [`GlobMatcher`] compiles a list of patterns supporting `*` (any run of
//! characters, possibly empty) and `?` (exactly one character, newlines
//! included) into a single
//! anchored regular expression. Matching is whole-string and case-sensitive.

use regex::Regex;

/// A compiled set of glob patterns, matched as one alternation.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    /// `None` for an empty pattern list, which matches nothing.
    regex: Option<Regex>,
}

impl GlobMatcher {
    /// Compile `patterns` into a single anchored alternation.
    ///
    /// Fails only when the resulting expression exceeds the regex engine's
    /// size limits.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        if patterns.is_empty() {
            return Ok(Self { regex: None });
        }

        let alternation = patterns
            .iter()
            .map(|p| translate(p.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&format!("^(?s:(?:{alternation}))$"))?;

        Ok(Self { regex: Some(regex) })
    }

    /// Whether `value` matches any of the patterns in full.
    pub fn matches(&self, value: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(value))
    }
}

/// Translate one glob pattern into regex syntax.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out
}
