//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the engine to external systems:
//! - `memory` - In-memory implementations of every port
//! - `postgres` - PostgreSQL repositories
//! - `redis` - Redis pub/sub broadcaster
//! - `transport` - HTTP messaging gateway sender

pub mod memory;
pub mod postgres;
pub mod redis;
pub mod transport;
