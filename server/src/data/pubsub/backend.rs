//! Pub/sub backend trait.
//!
//! Chat rooms only need broadcast (fire-and-forget, at-most-once) semantics:
//! a room's own pump already holds the durable roster and history, so the
//! backend's only job is to fan a published message out to every server
//! process that currently has subscribers for that room. Unlike a general
//! event bus, there is no consumer-group/ack concept here.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::error::PubSubError;

/// Subscription to a room channel.
pub struct PubSubSubscription {
    pub receiver: Pin<Box<dyn Stream<Item = Result<Vec<u8>, PubSubError>> + Send>>,
}

/// Backend interface implemented by the in-memory and Redis pub/sub backends.
#[async_trait]
pub trait PubSubBackend: Send + Sync {
    /// Publish a message to a channel. Delivered to every current subscriber;
    /// if there are none, the message is dropped.
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), PubSubError>;

    /// Subscribe to a channel, returning a stream of incoming messages.
    async fn subscribe(&self, channel: &str) -> Result<PubSubSubscription, PubSubError>;

    /// Health check (validates connectivity).
    async fn health_check(&self) -> Result<(), PubSubError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Release any held resources (bridge tasks, pooled connections).
    async fn shutdown(&self) {}
}
