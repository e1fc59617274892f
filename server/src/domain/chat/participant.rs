//! Participant identity, control rendezvous, and the Reader/Writer task pair.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use super::error::ChatError;
use super::message::{Message, MessageType};
use crate::core::constants::PARTICIPANT_CHANNEL_CAPACITY;

/// Anything the Reader/Writer tasks read frames from and write frames to.
/// Implemented over `axum::extract::ws::WebSocket` in the API layer.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Read one text frame. `Ok(None)` signals an expected close (going-away,
    /// normal closure); `Err` signals an unexpected transport error.
    async fn recv_text(&mut self) -> Result<Option<String>, ChatError>;

    /// Write one message as a JSON frame.
    async fn send_json(&mut self, msg: &Message) -> Result<(), ChatError>;
}

/// Handle to a connected participant, held in the Room roster and by the
/// Controller. Cloneable and cheap; the actual Reader/Writer tasks hold the
/// channel endpoints directly.
#[derive(Clone)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub room_id: Uuid,
    inbound_tx: Arc<Mutex<Option<mpsc::Sender<Message>>>>,
    stop_broadcast: watch::Sender<bool>,
    stop_listen: watch::Sender<bool>,
}

/// Channel endpoints consumed by the Reader/Writer/Publish tasks, produced
/// alongside a [`Participant`] handle by [`new_participant`].
pub struct ParticipantChannels {
    pub inbound_rx: mpsc::Receiver<Message>,
    pub outbound_tx: mpsc::Sender<Message>,
    pub outbound_rx: mpsc::Receiver<Message>,
    pub ready_listen_tx: oneshot::Sender<()>,
    pub ready_listen_rx: oneshot::Receiver<()>,
    pub ready_broadcast_tx: oneshot::Sender<()>,
    pub ready_broadcast_rx: oneshot::Receiver<()>,
    pub start_broadcast_tx: oneshot::Sender<()>,
    pub start_broadcast_rx: oneshot::Receiver<()>,
    pub stop_broadcast_rx: watch::Receiver<bool>,
    pub stop_listen_rx: watch::Receiver<bool>,
}

/// Construct a new participant handle plus the channel set its Reader/Writer
/// tasks are spawned with.
pub fn new_participant(id: Uuid, name: String, room_id: Uuid) -> (Participant, ParticipantChannels) {
    let (inbound_tx, inbound_rx) = mpsc::channel(PARTICIPANT_CHANNEL_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel(PARTICIPANT_CHANNEL_CAPACITY);
    let (ready_listen_tx, ready_listen_rx) = oneshot::channel();
    let (ready_broadcast_tx, ready_broadcast_rx) = oneshot::channel();
    let (start_broadcast_tx, start_broadcast_rx) = oneshot::channel();
    let (stop_broadcast_tx, stop_broadcast_rx) = watch::channel(false);
    let (stop_listen_tx, stop_listen_rx) = watch::channel(false);

    let participant = Participant {
        id,
        name,
        room_id,
        inbound_tx: Arc::new(Mutex::new(Some(inbound_tx))),
        stop_broadcast: stop_broadcast_tx,
        stop_listen: stop_listen_tx,
    };

    let channels = ParticipantChannels {
        inbound_rx,
        outbound_tx,
        outbound_rx,
        ready_listen_tx,
        ready_listen_rx,
        ready_broadcast_tx,
        ready_broadcast_rx,
        start_broadcast_tx,
        start_broadcast_rx,
        stop_broadcast_rx,
        stop_listen_rx,
    };

    (participant, channels)
}

impl Participant {
    /// Bounded send to this participant's inbound stream (Room pump fan-out
    /// and Controller-originated SendFailed notices). Drops the message for
    /// this participant if the deadline elapses or inbound is closed.
    pub async fn deliver(&self, msg: Message, deadline: Duration) -> Result<(), ChatError> {
        let tx = {
            let guard = self.inbound_tx.lock();
            guard.clone()
        };
        let Some(tx) = tx else {
            return Ok(());
        };
        match tokio::time::timeout(deadline, tx.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Ok(()), // receiver already gone, treat as a dropped delivery
            Err(_) => Err(ChatError::SendTimedOut),
        }
    }

    /// Idempotently close the inbound stream; the Writer's loop observes
    /// this as a channel close and exits.
    pub fn close_inbound(&self) {
        self.inbound_tx.lock().take();
    }

    /// Idempotently signal the Reader task to stop.
    pub fn send_stop_broadcast(&self) {
        let _ = self.stop_broadcast.send(true);
    }

    /// Idempotently signal the Writer task to stop.
    pub fn send_stop_listen(&self) {
        let _ = self.stop_listen.send(true);
    }

    /// Force this participant's pipelines down: closes inbound (stopping the
    /// Writer) and signals both stop channels.
    pub fn terminate(&self) {
        self.close_inbound();
        self.send_stop_broadcast();
        self.send_stop_listen();
    }
}

/// The Reader task: transport → `outbound`. Emits `readyListen`, then blocks
/// on `startBroadcast` before reading any frames (the Controller holds that
/// gate until the participant's Joined record is durable).
pub async fn run_reader<T: Transport>(
    mut transport_read_half: T,
    member_id: Uuid,
    member_name: String,
    room_id: Uuid,
    outbound_tx: mpsc::Sender<Message>,
    ready_listen_tx: oneshot::Sender<()>,
    start_broadcast_rx: oneshot::Receiver<()>,
    mut stop_broadcast_rx: watch::Receiver<bool>,
) {
    if ready_listen_tx.send(()).is_err() {
        return;
    }

    if start_broadcast_rx.await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            biased;
            _ = stop_broadcast_rx.changed() => {
                if *stop_broadcast_rx.borrow() {
                    return;
                }
            }
            frame = transport_read_half.recv_text() => {
                match frame {
                    Ok(Some(body)) => {
                        let msg = Message {
                            id: Uuid::new_v4(),
                            room_id,
                            member_id,
                            member_name: member_name.clone(),
                            message_type: MessageType::Chat,
                            body,
                            sent: chrono::Utc::now(),
                        };
                        if outbound_tx.send(msg).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => {
                        let left = Message {
                            id: Uuid::new_v4(),
                            room_id,
                            member_id,
                            member_name: member_name.clone(),
                            message_type: MessageType::MemberLeft,
                            body: String::new(),
                            sent: chrono::Utc::now(),
                        };
                        let _ = outbound_tx.send(left).await;
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, %member_id, %room_id, "reader transport error");
                        let left = Message {
                            id: Uuid::new_v4(),
                            room_id,
                            member_id,
                            member_name: member_name.clone(),
                            message_type: MessageType::MemberLeft,
                            body: String::new(),
                            sent: chrono::Utc::now(),
                        };
                        let _ = outbound_tx.send(left).await;
                        return;
                    }
                }
            }
        }
    }
}

/// The Writer task: `inbound` → transport. Emits `readyBroadcast`, then loops
/// writing every inbound message until `inbound` closes or `stopListen`
/// fires.
pub async fn run_writer<T: Transport>(
    mut transport_write_half: T,
    member_id: Uuid,
    room_id: Uuid,
    mut inbound_rx: mpsc::Receiver<Message>,
    ready_broadcast_tx: oneshot::Sender<()>,
    mut stop_listen_rx: watch::Receiver<bool>,
) {
    if ready_broadcast_tx.send(()).is_err() {
        return;
    }

    loop {
        tokio::select! {
            biased;
            _ = stop_listen_rx.changed() => {
                if *stop_listen_rx.borrow() {
                    return;
                }
            }
            msg = inbound_rx.recv() => {
                match msg {
                    Some(msg) => {
                        if let Err(e) = transport_write_half.send_json(&msg).await {
                            tracing::warn!(error = %e, %member_id, %room_id, "writer transport error");
                        }
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
    use std::collections::VecDeque;
    use tokio::sync::mpsc::error::TryRecvError;

    struct MockTransport {
        incoming: VecDeque<Result<Option<String>, ChatError>>,
        sent: Vec<Message>,
    }

    #[async_trait::async_trait]
    impl Transport for MockTransport {
        async fn recv_text(&mut self) -> Result<Option<String>, ChatError> {
            self.incoming
                .pop_front()
                .unwrap_or(Ok(None))
        }

        async fn send_json(&mut self, msg: &Message) -> Result<(), ChatError> {
            self.sent.push(msg.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn reader_blocks_on_start_broadcast_before_reading() {
        let (participant, channels) = new_participant(Uuid::new_v4(), "Teal River".into(), Uuid::new_v4());
        let transport = MockTransport {
            incoming: VecDeque::from([Ok(Some("hello".into())), Ok(None)]),
            sent: Vec::new(),
        };

        let reader = tokio::spawn(run_reader(
            transport,
            participant.id,
            participant.name.clone(),
            participant.room_id,
            channels.outbound_tx.clone(),
            channels.ready_listen_tx,
            channels.start_broadcast_rx,
            channels.stop_broadcast_rx,
        ));

        channels.ready_listen_rx.await.expect("reader signals readyListen");

        // The reader must not have read any frames yet: outbound is still empty.
        let mut outbound_rx = channels.outbound_rx;
        assert!(matches!(outbound_rx.try_recv(), Err(TryRecvError::Empty)));

        channels.start_broadcast_tx.send(()).expect("gate is still open");

        let chat = outbound_rx.recv().await.expect("chat frame forwarded");
        assert!(matches!(chat.message_type, MessageType::Chat));
        let left = outbound_rx.recv().await.expect("left frame forwarded on close");
        assert!(matches!(left.message_type, MessageType::MemberLeft));

        reader.await.unwrap();
    }

    #[tokio::test]
    async fn writer_exits_when_inbound_closes() {
        let (participant, channels) = new_participant(Uuid::new_v4(), "Coral Ember".into(), Uuid::new_v4());
        let transport = MockTransport { incoming: VecDeque::new(), sent: Vec::new() };

        let writer = tokio::spawn(run_writer(
            transport,
            participant.id,
            participant.room_id,
            channels.inbound_rx,
            channels.ready_broadcast_tx,
            channels.stop_listen_rx,
        ));

        channels.ready_broadcast_rx.await.expect("writer signals readyBroadcast");
        participant.close_inbound();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn deliver_drops_silently_after_inbound_closed() {
        let (participant, _channels) = new_participant(Uuid::new_v4(), "Jade Tide".into(), Uuid::new_v4());
        participant.close_inbound();

        let msg = Message {
            id: Uuid::new_v4(),
            room_id: participant.room_id,
            member_id: participant.id,
            member_name: participant.name.clone(),
            message_type: MessageType::Chat,
            body: "hi".into(),
            sent: chrono::Utc::now(),
        };

        let result = participant.deliver(msg, Duration::from_millis(50)).await;
        assert!(result.is_ok());
    }
}
