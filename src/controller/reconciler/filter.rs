//! # Key Filtering
//!
//! Include/exclude regular expressions applied to full object keys.
//!
//! Patterns are unanchored. A pattern that fails to compile never matches,
//! so a malformed include pattern selects nothing and a malformed exclude
//! pattern excludes nothing.

use regex::Regex;
use tracing::warn;

#[derive(Debug, Clone)]
enum Pattern {
    Valid(Regex),
    Malformed,
}

impl Pattern {
    fn compile(kind: &str, source: &str) -> Self {
        match Regex::new(source) {
            Ok(regex) => Pattern::Valid(regex),
            Err(e) => {
                warn!(
                    "Invalid {} pattern {:?}, treating it as never matching: {}",
                    kind, source, e
                );
                Pattern::Malformed
            }
        }
    }

    fn is_match(&self, key: &str) -> bool {
        match self {
            Pattern::Valid(regex) => regex.is_match(key),
            Pattern::Malformed => false,
        }
    }
}

/// Why an object was filtered out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Keep,
    NotIncluded,
    Excluded,
}

/// Compiled include/exclude patterns
#[derive(Debug, Clone, Default)]
pub struct KeyFilter {
    include: Option<Pattern>,
    exclude: Option<Pattern>,
}

impl KeyFilter {
    /// Compile the configured patterns; empty strings count as unset
    #[must_use]
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: include
                .filter(|p| !p.is_empty())
                .map(|p| Pattern::compile("include", p)),
            exclude: exclude
                .filter(|p| !p.is_empty())
                .map(|p| Pattern::compile("exclude", p)),
        }
    }

    /// Decide whether `key` takes part in the run; exclusion wins over inclusion
    #[must_use]
    pub fn verdict(&self, key: &str) -> FilterVerdict {
        if let Some(include) = &self.include {
            if !include.is_match(key) {
                return FilterVerdict::NotIncluded;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(key) {
                return FilterVerdict::Excluded;
            }
        }
        FilterVerdict::Keep
    }

    #[must_use]
    pub fn keeps(&self, key: &str) -> bool {
        self.verdict(key) == FilterVerdict::Keep
    }
}
