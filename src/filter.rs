//! Body filtering for secrets that must never reach a cassette file
//!
//! Rules are applied in the order they were first set. A replacement that
//! happens to contain a later rule's plaintext will be rewritten again by
//! that later rule; callers relying on chained rules should order them
//! accordingly.

use bytes::Bytes;
use regex::bytes::{NoExpand, Regex};

use crate::config::FilterRule;
use crate::{ReelError, Result};

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: FilterRule,
    pattern: Regex,
}

/// Ordered set of plaintext to replacement substitutions
#[derive(Debug, Clone, Default)]
pub struct Filters {
    rules: Vec<CompiledRule>,
}

impl Filters {
    /// Create an empty filter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter set from configured rules, in order
    ///
    /// # Errors
    ///
    /// Returns error if a rule cannot be compiled
    pub fn from_rules(rules: &[FilterRule]) -> Result<Self> {
        let mut filters = Self::new();
        for rule in rules {
            filters.set(&rule.plain, &rule.replacement)?;
        }
        Ok(filters)
    }

    /// Add a substitution, or update the replacement of an existing one
    ///
    /// An existing rule keeps its position. Empty plaintext is ignored.
    ///
    /// # Errors
    ///
    /// Returns error if the plaintext cannot be compiled into a matcher
    pub fn set(&mut self, plain: &str, replacement: &str) -> Result<()> {
        if plain.is_empty() {
            return Ok(());
        }

        if let Some(existing) = self.rules.iter_mut().find(|r| r.rule.plain == plain) {
            existing.rule.replacement = replacement.to_string();
            return Ok(());
        }

        let pattern = Regex::new(&regex::escape(plain))
            .map_err(|e| ReelError::Config(format!("invalid filter '{plain}': {e}")))?;

        self.rules.push(CompiledRule {
            rule: FilterRule {
                plain: plain.to_string(),
                replacement: replacement.to_string(),
            },
            pattern,
        });
        Ok(())
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rule is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in application order
    pub fn rules(&self) -> impl Iterator<Item = &FilterRule> {
        self.rules.iter().map(|r| &r.rule)
    }

    /// Replace every non-overlapping occurrence of each plaintext, left to right
    #[must_use]
    pub fn apply(&self, body: &[u8]) -> Bytes {
        let mut out = body.to_vec();
        for compiled in &self.rules {
            out = compiled
                .pattern
                .replace_all(&out, NoExpand(compiled.rule.replacement.as_bytes()))
                .into_owned();
        }
        Bytes::from(out)
    }
}
