//! Queue bridge: forwards a room's pub/sub subject into the Room pump's
//! inbound stream, decoupling remote-process fan-out from local delivery.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use super::error::ChatError;
use super::message::Message;
use super::room::{RoomEvent, RoomHandle};
use crate::core::constants::DEFAULT_READY_TIMEOUT_MS;
use crate::data::pubsub::PubSubBackend;

pub struct QueueBridgeHandle {
    stop_tx: watch::Sender<bool>,
}

impl QueueBridgeHandle {
    /// Signal the bridge task to stop consuming and return. Guarantees no
    /// further writes to the room's inbound once this returns, since the
    /// forwarder checks the stop signal before every send.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Subscribe to `room_id`'s pub/sub subject and spawn the forwarder task.
/// Performs the two-phase ready handshake (subscription established, then
/// forwarder task running) before returning, so `CreateRoom`/`ServeRoom`
/// never proceeds while messages could be silently missed.
pub async fn start_queue_bridge(
    pubsub: Arc<dyn PubSubBackend>,
    room: Arc<RoomHandle>,
    ready_timeout: Duration,
) -> Result<QueueBridgeHandle, ChatError> {
    let subject = room.room_id.to_string();

    let subscription = tokio::time::timeout(ready_timeout, pubsub.subscribe(&subject))
        .await
        .map_err(|_| ChatError::RoomNotReady)?
        .map_err(ChatError::PubSub)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let (ready_tx, ready_rx) = oneshot::channel();

    tokio::spawn(run_forwarder(room, subscription.receiver, stop_rx, ready_tx));

    tokio::time::timeout(ready_timeout, ready_rx)
        .await
        .map_err(|_| ChatError::RoomNotReady)?
        .map_err(|_| ChatError::RoomNotReady)?;

    Ok(QueueBridgeHandle { stop_tx })
}

/// Default ready-handshake deadline, used where a caller doesn't have an
/// `AppConfig` at hand (tests, defaults).
pub fn default_ready_timeout() -> Duration {
    Duration::from_millis(DEFAULT_READY_TIMEOUT_MS)
}

async fn run_forwarder(
    room: Arc<RoomHandle>,
    mut stream: std::pin::Pin<Box<dyn futures::Stream<Item = Result<Vec<u8>, crate::data::pubsub::PubSubError>> + Send>>,
    mut stop_rx: watch::Receiver<bool>,
    ready_tx: oneshot::Sender<()>,
) {
    let _ = ready_tx.send(());

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    return;
                }
            }
            item = stream.next() => {
                match item {
                    Some(Ok(payload)) => {
                        match serde_json::from_slice::<Message>(&payload) {
                            Ok(msg) => {
                                if room.inbound.send(RoomEvent::Deliver(msg)).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, room_id = %room.room_id, "dropped malformed pub/sub payload");
                            }
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, room_id = %room.room_id, "pub/sub subscription error");
                    }
                    None => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pubsub::MemoryPubSub;
    use crate::domain::chat::message::MessageType;
    use crate::domain::chat::room::spawn_room;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn published_message_arrives_at_room_inbound() {
        let pubsub: Arc<dyn PubSubBackend> = Arc::new(MemoryPubSub::new());
        let room_id = Uuid::new_v4();
        let (room, ready_rx) = spawn_room(room_id, StdDuration::from_millis(200));
        ready_rx.await.unwrap();

        let bridge = start_queue_bridge(Arc::clone(&pubsub), Arc::clone(&room), default_ready_timeout())
            .await
            .unwrap();

        let msg = Message {
            id: Uuid::new_v4(),
            room_id,
            member_id: Uuid::new_v4(),
            member_name: "Witty Pebble".into(),
            message_type: MessageType::Chat,
            body: "hello".into(),
            sent: chrono::Utc::now(),
        };
        let payload = serde_json::to_vec(&msg).unwrap();
        pubsub.publish(&room_id.to_string(), &payload).await.unwrap();

        // Give the forwarder a moment to deliver; room shutdown then proves
        // the message didn't get stuck in the bridge.
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        bridge.stop();
        room.shutdown(StdDuration::from_millis(500)).await.unwrap();
    }
}
