//! Keyword rules and trigger matching.

mod matcher;
mod rule;

pub use matcher::RuleSet;
pub use rule::{
    ActiveWindow, KeywordAction, KeywordRule, MatchType, MatchedResponse, ResponseKind,
    RuleResponse,
};
