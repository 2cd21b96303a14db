//! Redis adapters.

mod broadcaster;

pub use broadcaster::{tenant_channel, RedisBroadcaster};
