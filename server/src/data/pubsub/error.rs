//! Pub/sub error types

use std::fmt;

#[derive(Debug)]
pub enum PubSubError {
    /// Channel or connection closed
    ChannelClosed,
    /// Receiver lagged behind and dropped messages
    Lagged(u64),
    /// Connection error (Redis)
    Connection(String),
    /// Configuration error
    Config(String),
}

impl std::error::Error for PubSubError {}

impl fmt::Display for PubSubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PubSubError::ChannelClosed => write!(f, "channel closed"),
            PubSubError::Lagged(n) => write!(f, "receiver lagged by {} messages", n),
            PubSubError::Connection(msg) => write!(f, "connection error: {}", msg),
            PubSubError::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl From<tokio::sync::broadcast::error::RecvError> for PubSubError {
    fn from(err: tokio::sync::broadcast::error::RecvError) -> Self {
        match err {
            tokio::sync::broadcast::error::RecvError::Closed => PubSubError::ChannelClosed,
            tokio::sync::broadcast::error::RecvError::Lagged(n) => PubSubError::Lagged(n),
        }
    }
}

impl From<deadpool_redis::PoolError> for PubSubError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        PubSubError::Connection(err.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for PubSubError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        PubSubError::Connection(err.to_string())
    }
}
