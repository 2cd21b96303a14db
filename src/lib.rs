//! Chatflow - Conversational Automation Engine
//!
//! Answers inbound chat messages with keyword rules, walks contacts through
//! guided chatbot flows, and watches SLA deadlines on conversations handed
//! to human agents.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
