//! In-memory pub/sub backend using `tokio::broadcast` channels keyed by room.
//!
//! Suitable for local development and single-process deployments: a process
//! restart drops every subscriber and channel. Use the Redis backend to fan
//! messages out across multiple server processes.

use std::collections::HashMap;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::backend::{PubSubBackend, PubSubSubscription};
use super::error::PubSubError;

const DEFAULT_CAPACITY: usize = 1_024;

struct SharedState {
    channels: RwLock<HashMap<String, broadcast::Sender<Vec<u8>>>>,
    capacity: usize,
}

pub struct MemoryPubSub {
    state: Arc<SharedState>,
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPubSub {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SharedState {
                channels: RwLock::new(HashMap::new()),
                capacity: DEFAULT_CAPACITY,
            }),
        }
    }

    fn get_or_create(&self, channel: &str) -> broadcast::Sender<Vec<u8>> {
        {
            let channels = self.state.channels.read();
            if let Some(sender) = channels.get(channel) {
                return sender.clone();
            }
        }

        let mut channels = self.state.channels.write();
        if let Some(sender) = channels.get(channel) {
            return sender.clone();
        }
        let (sender, _) = broadcast::channel(self.state.capacity);
        channels.insert(channel.to_string(), sender.clone());
        sender
    }
}

#[async_trait]
impl PubSubBackend for MemoryPubSub {
    async fn publish(&self, channel: &str, payload: &[u8]) -> Result<(), PubSubError> {
        let sender = self.get_or_create(channel);
        let _ = sender.send(payload.to_vec());
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<PubSubSubscription, PubSubError> {
        let sender = self.get_or_create(channel);
        let mut receiver = sender.subscribe();

        let stream = stream! {
            loop {
                match receiver.recv().await {
                    Ok(payload) => yield Ok(payload),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => yield Err(PubSubError::Lagged(n)),
                }
            }
        };

        Ok(PubSubSubscription {
            receiver: Box::pin(stream),
        })
    }

    async fn health_check(&self) -> Result<(), PubSubError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn publish_reaches_active_subscriber() {
        let backend = MemoryPubSub::new();
        let sub = backend.subscribe("room-1").await.unwrap();
        let mut receiver = sub.receiver;

        backend.publish("room-1", b"hello").await.unwrap();

        let msg = tokio::time::timeout(tokio::time::Duration::from_millis(100), receiver.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(msg, b"hello");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_dropped_silently() {
        let backend = MemoryPubSub::new();
        assert!(backend.publish("empty-room", b"hello").await.is_ok());
    }
}
