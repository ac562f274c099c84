use std::fmt;

use serde::{Deserialize, Serialize};

/// A search term. Matching is case-insensitive; the lower-cased needle is
/// computed once so a sweep does not redo it per thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Term {
    text: String,
    needle: String,
}

impl Term {
    pub fn new<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        let needle = text.to_lowercase();
        Self { text, needle }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.needle == other.needle
    }
}

impl Eq for Term {}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Term::new(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::new(value)
    }
}

impl From<Term> for String {
    fn from(value: Term) -> Self {
        value.text
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Non-overlapping occurrences of `needle` in `haystack`, scanning left to
/// right. Both sides are expected to be lower-cased already.
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Case-insensitive hit count for every term, aligned with `terms`.
pub fn scan(body: &str, terms: &[Term]) -> Vec<usize> {
    let lowered = body.to_lowercase();
    terms
        .iter()
        .map(|term| count_occurrences(&lowered, term.needle()))
        .collect()
}
