//! Keyword rule entity and its response content.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{FlowId, RuleId, TenantId, Timestamp, ValidationError};

/// How a rule's keywords are compared against inbound text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Exact,
    Contains,
    StartsWith,
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Contains => "contains",
            MatchType::StartsWith => "starts_with",
            MatchType::Regex => "regex",
        }
    }
}

impl FromStr for MatchType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(MatchType::Exact),
            "contains" => Ok(MatchType::Contains),
            "starts_with" => Ok(MatchType::StartsWith),
            "regex" => Ok(MatchType::Regex),
            other => Err(ValidationError::invalid_format(
                "match_type",
                format!("unknown match type '{}'", other),
            )),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matched rule responds with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    #[default]
    Text,
    Template,
    Media,
    Flow,
    Script,
    Transfer,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Text => "text",
            ResponseKind::Template => "template",
            ResponseKind::Media => "media",
            ResponseKind::Flow => "flow",
            ResponseKind::Script => "script",
            ResponseKind::Transfer => "transfer",
        }
    }
}

impl FromStr for ResponseKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ResponseKind::Text),
            "template" => Ok(ResponseKind::Template),
            "media" => Ok(ResponseKind::Media),
            "flow" => Ok(ResponseKind::Flow),
            "script" => Ok(ResponseKind::Script),
            "transfer" => Ok(ResponseKind::Transfer),
            other => Err(ValidationError::invalid_format(
                "response_kind",
                format!("unknown response kind '{}'", other),
            )),
        }
    }
}

/// Optional validity period of a rule. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
}

impl ActiveWindow {
    /// Window with no bounds; always active.
    pub fn always() -> Self {
        Self::default()
    }

    /// Returns true if `now` falls inside the window (bounds inclusive).
    pub fn contains(&self, now: &Timestamp) -> bool {
        let after_start = self.starts_at.map_or(true, |start| !now.is_before(&start));
        let before_end = self.ends_at.map_or(true, |end| !now.is_after(&end));
        after_start && before_end
    }
}

/// Response content attached to a rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleResponse {
    pub kind: ResponseKind,
    /// Text body, rendered as a template before sending.
    pub body: String,
    #[serde(default)]
    pub buttons: Vec<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    /// Flow to start when `kind` is `Flow`.
    #[serde(default)]
    pub flow_id: Option<FlowId>,
}

impl RuleResponse {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Text,
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Automated reply rule scoped to one tenant and channel account.
///
/// # Invariants
///
/// - `keywords` is non-empty
/// - Among enabled, in-window rules matching the same input, the one with
///   the highest `priority` wins; ties keep their stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub id: RuleId,
    pub tenant_id: TenantId,
    /// Channel account name the rule listens on.
    pub account: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub match_type: MatchType,
    pub case_sensitive: bool,
    pub priority: i32,
    pub enabled: bool,
    #[serde(default)]
    pub active_window: ActiveWindow,
    pub response: RuleResponse,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl KeywordRule {
    /// Creates an enabled, always-active rule.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if no non-blank keyword is given
    pub fn new(
        tenant_id: TenantId,
        account: impl Into<String>,
        name: impl Into<String>,
        keywords: Vec<String>,
        match_type: MatchType,
        response: RuleResponse,
    ) -> Result<Self, ValidationError> {
        let keywords: Vec<String> = keywords
            .into_iter()
            .filter(|k| !k.trim().is_empty())
            .collect();
        if keywords.is_empty() {
            return Err(ValidationError::empty_field("keywords"));
        }

        let now = Timestamp::now();
        Ok(Self {
            id: RuleId::new(),
            tenant_id,
            account: account.into(),
            name: name.into(),
            keywords,
            match_type,
            case_sensitive: false,
            priority: 0,
            enabled: true,
            active_window: ActiveWindow::always(),
            response,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_active_window(mut self, window: ActiveWindow) -> Self {
        self.active_window = window;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Enabled and inside its active window at `now`.
    pub fn is_live(&self, now: &Timestamp) -> bool {
        self.enabled && self.active_window.contains(now)
    }
}

/// The rendered response of the rule selected for an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedResponse {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub kind: ResponseKind,
    pub body: String,
    pub buttons: Vec<String>,
    pub media_url: Option<String>,
    pub flow_id: Option<FlowId>,
}

/// What the ingestion handler should do with a matched response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordAction {
    Reply { body: String, buttons: Vec<String> },
    SendMedia { url: String, caption: String },
    StartFlow(FlowId),
    TransferToAgent { note: String },
}

impl MatchedResponse {
    /// Dispatches on the response kind.
    ///
    /// Kinds missing their payload (media without URL, flow without id)
    /// fall back to a plain reply with the rendered body.
    pub fn action(&self) -> KeywordAction {
        let reply = || KeywordAction::Reply {
            body: self.body.clone(),
            buttons: self.buttons.clone(),
        };
        match self.kind {
            ResponseKind::Text | ResponseKind::Template | ResponseKind::Script => reply(),
            ResponseKind::Media => match &self.media_url {
                Some(url) => KeywordAction::SendMedia {
                    url: url.clone(),
                    caption: self.body.clone(),
                },
                None => reply(),
            },
            ResponseKind::Flow => match self.flow_id {
                Some(flow_id) => KeywordAction::StartFlow(flow_id),
                None => reply(),
            },
            ResponseKind::Transfer => KeywordAction::TransferToAgent {
                note: self.body.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rule_rejects_blank_keywords() {
        let result = KeywordRule::new(
            TenantId::new(),
            "main",
            "greeting",
            vec!["  ".to_string()],
            MatchType::Exact,
            RuleResponse::text("hi"),
        );
        assert_eq!(result, Err(ValidationError::empty_field("keywords")));
    }

    #[test]
    fn active_window_bounds_are_inclusive() {
        let start = Timestamp::now();
        let end = start.plus_minutes(60);
        let window = ActiveWindow {
            starts_at: Some(start),
            ends_at: Some(end),
        };

        assert!(window.contains(&start));
        assert!(window.contains(&end));
        assert!(!window.contains(&start.minus_minutes(1)));
        assert!(!window.contains(&end.plus_minutes(1)));
        assert!(ActiveWindow::always().contains(&start));
    }

    #[test]
    fn match_type_parses_from_storage_strings() {
        for kind in [
            MatchType::Exact,
            MatchType::Contains,
            MatchType::StartsWith,
            MatchType::Regex,
        ] {
            assert_eq!(kind.as_str().parse::<MatchType>(), Ok(kind));
        }
        assert!("fuzzy".parse::<MatchType>().is_err());
    }

    fn matched(kind: ResponseKind) -> MatchedResponse {
        MatchedResponse {
            rule_id: RuleId::new(),
            rule_name: "r".to_string(),
            kind,
            body: "body".to_string(),
            buttons: vec!["Yes".to_string()],
            media_url: None,
            flow_id: None,
        }
    }

    #[test]
    fn action_dispatches_by_kind() {
        assert_eq!(
            matched(ResponseKind::Text).action(),
            KeywordAction::Reply {
                body: "body".to_string(),
                buttons: vec!["Yes".to_string()]
            }
        );

        let flow_id = FlowId::new();
        let mut flow = matched(ResponseKind::Flow);
        flow.flow_id = Some(flow_id);
        assert_eq!(flow.action(), KeywordAction::StartFlow(flow_id));

        let mut media = matched(ResponseKind::Media);
        media.media_url = Some("https://cdn.example.com/a.png".to_string());
        assert!(matches!(media.action(), KeywordAction::SendMedia { .. }));

        assert!(matches!(
            matched(ResponseKind::Transfer).action(),
            KeywordAction::TransferToAgent { .. }
        ));
    }

    #[test]
    fn flow_kind_without_flow_id_falls_back_to_reply() {
        assert!(matches!(
            matched(ResponseKind::Flow).action(),
            KeywordAction::Reply { .. }
        ));
    }
}
