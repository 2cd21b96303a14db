//! Chatbot flows, sessions and the session message log.

mod errors;
mod flow;
mod message;
mod session;
mod validation;

pub use errors::{FlowError, InputRejection};
pub use flow::{
    find_triggered_flow, ChatbotFlow, FlowStep, InputType, DEFAULT_BRANCH, DEFAULT_MAX_RETRIES,
};
pub use message::{Direction, SessionMessage};
pub use session::{ChatbotSession, SessionStatus};
pub use validation::validate_input;
