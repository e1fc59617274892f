//! Pub/sub abstraction used to fan room messages out across server processes.

mod backend;
mod bridge;
mod error;
mod memory;
mod redis;

pub use backend::{PubSubBackend, PubSubSubscription};
pub use error::PubSubError;
pub use memory::MemoryPubSub;
pub use redis::RedisPubSub;
