//! Room pump: one task per locally-hosted room, the only place the roster
//! of locally-connected participants is mutated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::message::{Message, MessageType};
use super::participant::Participant;
use crate::core::constants::ROOM_CHANNEL_CAPACITY;

/// Events fed into a room's pump. The pump is the sole writer of the local
/// roster; every other task only ever sends on this channel.
pub enum RoomEvent {
    /// A participant joined locally and should receive future fan-out.
    Joined(Arc<Participant>),
    /// A message to fan out to every currently-registered local participant
    /// (or, for `MemberLeft`, to remove the named participant from the
    /// roster before fanning out).
    Deliver(Message),
    /// Shut the room down: terminate every local participant and stop.
    Shutdown,
}

pub struct RoomHandle {
    pub room_id: Uuid,
    pub inbound: mpsc::Sender<RoomEvent>,
    stopped_rx: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
}

impl RoomHandle {
    /// Send a shutdown event and await the pump's `stopped` signal, bounded
    /// by `deadline`.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), super::error::ChatError> {
        if self.inbound.send(RoomEvent::Shutdown).await.is_err() {
            // Pump already gone; nothing further to await.
            return Ok(());
        }
        let mut guard = self.stopped_rx.lock().await;
        if let Some(rx) = guard.take() {
            match tokio::time::timeout(deadline, rx).await {
                Ok(_) => Ok(()),
                Err(_) => Err(super::error::ChatError::RoomNotShutdown),
            }
        } else {
            Ok(())
        }
    }
}

/// Spawn a room pump task. Returns the handle immediately; callers should
/// await `ready_rx` before publishing any events, mirroring the Reader/Writer
/// ready rendezvous.
pub fn spawn_room(room_id: Uuid, fanout_deadline: Duration) -> (Arc<RoomHandle>, oneshot::Receiver<()>) {
    let (inbound_tx, inbound_rx) = mpsc::channel(ROOM_CHANNEL_CAPACITY);
    let (ready_tx, ready_rx) = oneshot::channel();
    let (stopped_tx, stopped_rx) = oneshot::channel();

    let handle = Arc::new(RoomHandle {
        room_id,
        inbound: inbound_tx,
        stopped_rx: tokio::sync::Mutex::new(Some(stopped_rx)),
    });

    tokio::spawn(run_room_pump(room_id, inbound_rx, fanout_deadline, ready_tx, stopped_tx));

    (handle, ready_rx)
}

async fn run_room_pump(
    room_id: Uuid,
    mut inbound_rx: mpsc::Receiver<RoomEvent>,
    fanout_deadline: Duration,
    ready_tx: oneshot::Sender<()>,
    stopped_tx: oneshot::Sender<()>,
) {
    let mut roster: HashMap<Uuid, Arc<Participant>> = HashMap::new();

    let _ = ready_tx.send(());

    loop {
        let event = match inbound_rx.recv().await {
            Some(event) => event,
            None => {
                terminate_all(&roster);
                break;
            }
        };

        match event {
            RoomEvent::Joined(participant) => {
                roster.insert(participant.id, participant);
            }
            RoomEvent::Deliver(msg) => {
                if matches!(msg.message_type, MessageType::MemberLeft) {
                    roster.remove(&msg.member_id);
                }
                fan_out(room_id, &roster, msg, fanout_deadline).await;
            }
            RoomEvent::Shutdown => {
                terminate_all(&roster);
                break;
            }
        }
    }

    let _ = stopped_tx.send(());
}

fn terminate_all(roster: &HashMap<Uuid, Arc<Participant>>) {
    for participant in roster.values() {
        participant.terminate();
    }
}

/// Deadline-bounded fan-out to every current roster member. A participant
/// whose deadline elapses is dropped for this message only; the room never
/// blocks on one slow consumer. Deliveries are awaited here, before the pump
/// moves on to its next event, so the per-participant delivery order matches
/// the order the pump observed them in — a detached `tokio::spawn` per
/// delivery would let two fan-outs race and land out of order.
async fn fan_out(room_id: Uuid, roster: &HashMap<Uuid, Arc<Participant>>, msg: Message, deadline: Duration) {
    let deliveries = roster.values().map(|participant| {
        let participant = Arc::clone(participant);
        let msg = msg.clone();
        async move {
            if let Err(e) = participant.deliver(msg, deadline).await {
                tracing::warn!(error = %e, member_id = %participant.id, %room_id, "dropped slow fan-out consumer");
            }
        }
    });
    futures::future::join_all(deliveries).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::participant::new_participant;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn joined_participant_receives_subsequent_fanout() {
        let room_id = Uuid::new_v4();
        let (handle, ready_rx) = spawn_room(room_id, StdDuration::from_millis(200));
        ready_rx.await.unwrap();

        let (participant, channels) = new_participant(Uuid::new_v4(), "Bold Comet".into(), room_id);
        let participant = Arc::new(participant);
        handle.inbound.send(RoomEvent::Joined(Arc::clone(&participant))).await.unwrap();

        let msg = Message {
            id: Uuid::new_v4(),
            room_id,
            member_id: Uuid::new_v4(),
            member_name: "Someone Else".into(),
            message_type: MessageType::Chat,
            body: "hi".into(),
            sent: chrono::Utc::now(),
        };
        handle.inbound.send(RoomEvent::Deliver(msg.clone())).await.unwrap();

        let mut inbound_rx = channels.inbound_rx;
        let received = tokio::time::timeout(StdDuration::from_millis(500), inbound_rx.recv())
            .await
            .expect("fan-out arrives before timeout")
            .expect("channel still open");
        assert_eq!(received.body, "hi");
    }

    #[tokio::test]
    async fn member_left_removes_from_roster_before_fanout() {
        let room_id = Uuid::new_v4();
        let (handle, ready_rx) = spawn_room(room_id, StdDuration::from_millis(200));
        ready_rx.await.unwrap();

        let (participant, channels) = new_participant(Uuid::new_v4(), "Sunny Orchard".into(), room_id);
        let participant_id = participant.id;
        let participant = Arc::new(participant);
        handle.inbound.send(RoomEvent::Joined(Arc::clone(&participant))).await.unwrap();

        let left = Message {
            id: Uuid::new_v4(),
            room_id,
            member_id: participant_id,
            member_name: "Sunny Orchard".into(),
            message_type: MessageType::MemberLeft,
            body: String::new(),
            sent: chrono::Utc::now(),
        };
        handle.inbound.send(RoomEvent::Deliver(left)).await.unwrap();

        // The departing participant's own inbound must not receive the
        // MemberLeft fan-out (it was removed from the roster first).
        let mut inbound_rx = channels.inbound_rx;
        let result = tokio::time::timeout(StdDuration::from_millis(150), inbound_rx.recv()).await;
        assert!(result.is_err(), "departing participant should not be fanned out to");
    }

    #[tokio::test]
    async fn shutdown_terminates_all_participants_and_stops() {
        let room_id = Uuid::new_v4();
        let (handle, ready_rx) = spawn_room(room_id, StdDuration::from_millis(200));
        ready_rx.await.unwrap();

        let (participant, channels) = new_participant(Uuid::new_v4(), "Nimble Glacier".into(), room_id);
        handle.inbound.send(RoomEvent::Joined(Arc::new(participant))).await.unwrap();

        handle.shutdown(StdDuration::from_millis(500)).await.unwrap();

        // inbound_rx should now observe closure since terminate() closes it.
        let mut inbound_rx = channels.inbound_rx;
        assert_eq!(inbound_rx.recv().await, None);
    }
}
