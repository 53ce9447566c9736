//! Ordered pattern extraction for scraped pages
//!
//! Each resolver describes what it looks for as a list of rules. Rules are tried
//! in order and the first capture wins, so markup drift upstream is handled by
//! adding a rule rather than touching resolver control flow.

use crate::error::GateKeyError;
use regex::Regex;

/// A single named pattern with the capture group holding the value
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    name: &'static str,
    pattern: Regex,
    group: usize,
}

impl ExtractionRule {
    /// Create a rule capturing group 1
    pub fn new(name: &'static str, pattern: &str) -> Result<Self, GateKeyError> {
        Self::with_group(name, pattern, 1)
    }

    /// Create a rule capturing a specific group
    pub fn with_group(
        name: &'static str,
        pattern: &str,
        group: usize,
    ) -> Result<Self, GateKeyError> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            group,
        })
    }

    /// Rule name, used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply the rule to some text
    pub fn capture(&self, text: &str) -> Option<String> {
        self.pattern
            .captures(text)
            .and_then(|captures| captures.get(self.group))
            .map(|value| value.as_str().to_string())
    }
}

/// A successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Name of the rule that matched
    pub rule: &'static str,
    /// Captured value
    pub value: String,
}

/// Ordered list of extraction rules
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    rules: Vec<ExtractionRule>,
}

impl Extractor {
    /// Create an empty extractor
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }

    /// Return the first capture produced by any rule
    pub fn first_match(&self, text: &str) -> Option<Extracted> {
        self.rules.iter().find_map(|rule| {
            rule.capture(text).map(|value| Extracted {
                rule: rule.name(),
                value,
            })
        })
    }
}
