//! Append-only session message log entries.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{MessageId, SessionId, Timestamp, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
    /// Engine annotations, e.g. why a flow ended.
    System,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
            Direction::System => "system",
        }
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(Direction::Inbound),
            "outbound" => Ok(Direction::Outbound),
            "system" => Ok(Direction::System),
            other => Err(ValidationError::invalid_format(
                "direction",
                format!("unknown direction '{}'", other),
            )),
        }
    }
}

/// One exchange within a session, tagged with the step active at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub id: MessageId,
    pub session_id: SessionId,
    pub direction: Direction,
    pub body: String,
    pub step_name: Option<String>,
    pub created_at: Timestamp,
}

impl SessionMessage {
    pub fn new(
        session_id: SessionId,
        direction: Direction,
        body: impl Into<String>,
        step_name: Option<&str>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: MessageId::new(),
            session_id,
            direction,
            body: body.into(),
            step_name: step_name.map(str::to_string),
            created_at: now,
        }
    }
}
