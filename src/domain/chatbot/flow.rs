//! Chatbot flow definitions: ordered steps with capture and branching.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{FlowId, TenantId, Timestamp, ValidationError};
use crate::domain::template::{render, Vars};

use super::errors::FlowError;

/// Default number of invalid answers tolerated per step.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Key in a conditional-next mapping used when no captured value matches.
pub const DEFAULT_BRANCH: &str = "default";

/// Kind of answer a step expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    #[default]
    Text,
    Number,
    Email,
    Phone,
    Date,
    Select,
    Button,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Number => "number",
            InputType::Email => "email",
            InputType::Phone => "phone",
            InputType::Date => "date",
            InputType::Select => "select",
            InputType::Button => "button",
        }
    }

    /// Whether answers are chosen from the step's option list.
    pub fn has_options(&self) -> bool {
        matches!(self, InputType::Select | InputType::Button)
    }
}

impl FromStr for InputType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(InputType::Text),
            "number" => Ok(InputType::Number),
            "email" => Ok(InputType::Email),
            "phone" => Ok(InputType::Phone),
            "date" => Ok(InputType::Date),
            "select" => Ok(InputType::Select),
            "button" => Ok(InputType::Button),
            other => Err(ValidationError::invalid_format(
                "input_type",
                format!("unknown input type '{}'", other),
            )),
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One question in a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    /// Unique within the flow.
    pub name: String,
    pub order: i32,
    /// Message template sent when the step becomes active.
    pub message: String,
    pub input_type: InputType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub validation_pattern: Option<String>,
    #[serde(default)]
    pub validation_error: Option<String>,
    /// Session data key the captured answer is stored under.
    #[serde(default)]
    pub store_as: Option<String>,
    #[serde(default)]
    pub next_step: Option<String>,
    /// Captured value -> step name, with an optional `default` entry.
    #[serde(default)]
    pub conditional_next: BTreeMap<String, String>,
    /// When this evaluates true against session data the step is skipped.
    #[serde(default)]
    pub skip_condition: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_on_invalid")]
    pub retry_on_invalid: bool,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_on_invalid() -> bool {
    true
}

impl FlowStep {
    pub fn new(name: impl Into<String>, order: i32, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order,
            message: message.into(),
            input_type: InputType::Text,
            options: Vec::new(),
            validation_pattern: None,
            validation_error: None,
            store_as: None,
            next_step: None,
            conditional_next: BTreeMap::new(),
            skip_condition: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_on_invalid: true,
        }
    }

    pub fn with_input(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn storing_as(mut self, key: impl Into<String>) -> Self {
        self.store_as = Some(key.into());
        self
    }

    pub fn then(mut self, next_step: impl Into<String>) -> Self {
        self.next_step = Some(next_step.into());
        self
    }

    pub fn branch(mut self, value: impl Into<String>, step: impl Into<String>) -> Self {
        self.conditional_next.insert(value.into(), step.into());
        self
    }

    pub fn skip_when(mut self, condition: impl Into<String>) -> Self {
        self.skip_condition = Some(condition.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.validation_pattern = Some(pattern.into());
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_on_invalid: bool) -> Self {
        self.max_retries = max_retries;
        self.retry_on_invalid = retry_on_invalid;
        self
    }

    /// Step reached after capturing `value`.
    ///
    /// Conditional mapping first (exact key, then case-insensitive key, then
    /// `default`), falling back to the static `next_step`. `None` ends the flow.
    pub fn next_for(&self, value: &str) -> Option<&str> {
        let value = value.trim();
        self.conditional_next
            .get(value)
            .or_else(|| {
                self.conditional_next
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(value))
                    .map(|(_, step)| step)
            })
            .or_else(|| self.conditional_next.get(DEFAULT_BRANCH))
            .or(self.next_step.as_ref())
            .map(String::as_str)
    }

    /// Step reached when this step is skipped.
    pub fn next_when_skipped(&self) -> Option<&str> {
        self.next_step
            .as_deref()
            .or_else(|| self.conditional_next.get(DEFAULT_BRANCH).map(String::as_str))
    }

    /// Renders the prompt, listing options for select/button steps.
    pub fn prompt(&self, data: &Vars) -> String {
        let mut text = render(&self.message, data);
        if self.input_type.has_options() && !self.options.is_empty() {
            for (i, option) in self.options.iter().enumerate() {
                text.push_str(&format!("\n{}. {}", i + 1, option));
            }
        }
        text
    }

    /// Message re-sent after an invalid answer.
    pub fn retry_prompt(&self, data: &Vars) -> String {
        match &self.validation_error {
            Some(template) => render(template, data),
            None => format!("Sorry, that doesn't look right. {}", self.prompt(data)),
        }
    }
}

/// A tenant-defined guided conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatbotFlow {
    pub id: FlowId,
    pub tenant_id: TenantId,
    pub account: String,
    pub name: String,
    pub trigger_keywords: Vec<String>,
    /// Kept sorted by `order`.
    pub steps: Vec<FlowStep>,
    pub completion_message: Option<String>,
    pub cancel_keywords: Vec<String>,
    pub cancel_message: Option<String>,
    /// Sent when a step's retries are exhausted.
    pub timeout_message: Option<String>,
    pub enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ChatbotFlow {
    pub fn new(tenant_id: TenantId, account: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: FlowId::new(),
            tenant_id,
            account: account.into(),
            name: name.into(),
            trigger_keywords: Vec::new(),
            steps: Vec::new(),
            completion_message: None,
            cancel_keywords: Vec::new(),
            cancel_message: None,
            timeout_message: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn triggered_by<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn cancelled_by<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cancel_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_step(mut self, step: FlowStep) -> Self {
        self.steps.push(step);
        self.steps.sort_by_key(|s| s.order);
        self
    }

    pub fn completing_with(mut self, message: impl Into<String>) -> Self {
        self.completion_message = Some(message.into());
        self
    }

    pub fn timing_out_with(mut self, message: impl Into<String>) -> Self {
        self.timeout_message = Some(message.into());
        self
    }

    /// Lowest-order step.
    pub fn first_step(&self) -> Option<&FlowStep> {
        self.steps.iter().min_by_key(|s| s.order)
    }

    pub fn step(&self, name: &str) -> Option<&FlowStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Case-insensitive membership of `text` in the trigger keywords.
    pub fn is_triggered_by(&self, text: &str) -> bool {
        contains_ignore_case(&self.trigger_keywords, text)
    }

    /// Case-insensitive membership of `text` in the cancel keywords.
    pub fn is_cancel_keyword(&self, text: &str) -> bool {
        contains_ignore_case(&self.cancel_keywords, text)
    }

    /// Checks step-name uniqueness and that every step reference resolves.
    pub fn validate(&self) -> Result<(), FlowError> {
        let mut names = HashSet::new();
        for step in &self.steps {
            if !names.insert(step.name.as_str()) {
                return Err(FlowError::DuplicateStep(step.name.clone()));
            }
        }

        for step in &self.steps {
            let targets = step
                .next_step
                .iter()
                .chain(step.conditional_next.values());
            for target in targets {
                if !names.contains(target.as_str()) {
                    return Err(FlowError::UnknownNextStep {
                        step: step.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn contains_ignore_case(keywords: &[String], text: &str) -> bool {
    let text = text.trim().to_lowercase();
    !text.is_empty() && keywords.iter().any(|k| k.trim().to_lowercase() == text)
}

/// First enabled flow whose triggers contain `text`.
pub fn find_triggered_flow<'a>(flows: &'a [ChatbotFlow], text: &str) -> Option<&'a ChatbotFlow> {
    flows.iter().find(|f| f.enabled && f.is_triggered_by(text))
}
