//! Chatbot-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Structural problems in a flow definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Step name '{0}' is used more than once")]
    DuplicateStep(String),

    #[error("Step '{step}' points to unknown step '{target}'")]
    UnknownNextStep { step: String, target: String },

    #[error("Step '{0}' does not exist in this flow")]
    NoSuchStep(String),
}

impl From<FlowError> for DomainError {
    fn from(err: FlowError) -> Self {
        let code = match err {
            FlowError::NoSuchStep(_) => ErrorCode::StepNotFound,
            _ => ErrorCode::ValidationFailed,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Why an answer was rejected by a step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputRejection {
    #[error("empty answer")]
    Empty,
    #[error("not a number")]
    NotANumber,
    #[error("not an email address")]
    NotAnEmail,
    #[error("not a phone number")]
    NotAPhone,
    #[error("not a date")]
    NotADate,
    #[error("not one of the offered options")]
    UnknownOption,
    #[error("does not match the required pattern")]
    PatternMismatch,
}
