//! Pure keyword matching over an already-loaded rule set.

use regex::{Regex, RegexBuilder};
use std::cmp::Reverse;

use crate::domain::foundation::Timestamp;

use super::rule::{KeywordRule, MatchType};

impl MatchType {
    /// Tests one keyword against inbound text.
    ///
    /// A keyword that is not a valid pattern never matches. Regex keywords
    /// are compiled on every call here; [`RuleSet`] compiles them once.
    pub fn matches(&self, keyword: &str, input: &str, case_sensitive: bool) -> bool {
        let input = input.trim();
        if let MatchType::Regex = self {
            return compile_pattern(keyword, case_sensitive)
                .is_some_and(|pattern| pattern.is_match(input));
        }

        let (keyword, input) = if case_sensitive {
            (keyword.trim().to_string(), input.to_string())
        } else {
            (keyword.trim().to_lowercase(), input.to_lowercase())
        };
        if keyword.is_empty() {
            return false;
        }

        match self {
            MatchType::Exact => input == keyword,
            MatchType::Contains => input.contains(&keyword),
            MatchType::StartsWith => input.starts_with(&keyword),
            MatchType::Regex => false,
        }
    }
}

fn compile_pattern(keyword: &str, case_sensitive: bool) -> Option<Regex> {
    match RegexBuilder::new(keyword)
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            tracing::debug!(keyword, error = %e, "Ignoring invalid keyword pattern");
            None
        }
    }
}

impl KeywordRule {
    /// Returns true if any keyword matches `input` under this rule's strategy.
    pub fn matches(&self, input: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| self.match_type.matches(keyword, input, self.case_sensitive))
    }
}

/// A rule with its regex keywords compiled.
#[derive(Debug, Clone)]
struct PreparedRule {
    rule: KeywordRule,
    patterns: Vec<Regex>,
}

impl PreparedRule {
    fn new(rule: KeywordRule) -> Self {
        let patterns = match rule.match_type {
            MatchType::Regex => rule
                .keywords
                .iter()
                .filter_map(|keyword| compile_pattern(keyword, rule.case_sensitive))
                .collect(),
            _ => Vec::new(),
        };
        Self { rule, patterns }
    }

    fn matches(&self, input: &str) -> bool {
        match self.rule.match_type {
            MatchType::Regex => {
                let input = input.trim();
                self.patterns.iter().any(|pattern| pattern.is_match(input))
            }
            _ => self.rule.matches(input),
        }
    }
}

/// The keyword rules of one account, ready for repeated matching.
///
/// Rules are ordered by priority, highest first, with equal priorities in
/// their incoming order. Regex keywords are compiled once here; invalid
/// patterns are dropped and never match.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    entries: Vec<PreparedRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        let mut entries: Vec<PreparedRule> = rules.into_iter().map(PreparedRule::new).collect();
        entries.sort_by_key(|entry| Reverse(entry.rule.priority));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rules in match order.
    pub fn rules(&self) -> impl Iterator<Item = &KeywordRule> {
        self.entries.iter().map(|entry| &entry.rule)
    }

    /// Selects the winning rule for `input` at `now`, if any.
    ///
    /// Disabled and out-of-window rules are skipped.
    pub fn select(&self, input: &str, now: &Timestamp) -> Option<&KeywordRule> {
        self.entries
            .iter()
            .filter(|entry| entry.rule.is_live(now))
            .find(|entry| entry.matches(input))
            .map(|entry| &entry.rule)
    }
}
