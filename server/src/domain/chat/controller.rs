//! The chat `Controller`: the single entry point orchestrating room
//! creation, serving participants, and publishing/subscribing to the
//! distributed pub/sub layer. Holds an in-memory cache of locally-hosted
//! rooms; durable state always lives in the configured `ChatStore`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::ChatError;
use super::generator::Generator;
use super::message::{GetMessageOptions, Message, MessageType, NewMessage};
use super::participant::{new_participant, Participant, ParticipantChannels, Transport};
use super::queue_bridge::{start_queue_bridge, QueueBridgeHandle};
use super::room::{spawn_room, RoomEvent, RoomHandle};
use super::store::{ChatStore, MemberRecord, RoomRecord};
use crate::core::config::AppConfig;
use crate::data::pubsub::{PubSubBackend, PubSubError};

/// A room cached locally because this process is hosting it: the pump
/// handle plus the queue bridge that feeds it from pub/sub.
struct CachedRoom {
    handle: Arc<RoomHandle>,
    bridge: QueueBridgeHandle,
}

pub struct Controller {
    store: ChatStore,
    pubsub: Arc<dyn PubSubBackend>,
    generator: Generator,
    config: AppConfig,
    rooms: Mutex<HashMap<Uuid, Arc<CachedRoom>>>,
}

/// A room plus its current durable member roster, as returned by
/// [`Controller::get_room`].
pub struct RoomView {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<MemberRecord>,
}

impl Controller {
    pub fn new(store: ChatStore, pubsub: Arc<dyn PubSubBackend>, config: AppConfig) -> Self {
        Self {
            store,
            pubsub,
            generator: Generator::new(),
            config,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn fanout_deadline(&self) -> Duration {
        Duration::from_millis(self.config.room.fanout_timeout_ms)
    }

    fn ready_deadline(&self) -> Duration {
        Duration::from_millis(self.config.room.ready_timeout_ms)
    }

    /// Create a new room: generate an identity, start its pump and queue
    /// bridge, persist it, and cache it locally. Any failure after starting
    /// the pump tears the pump and bridge back down before returning.
    pub async fn create_room(&self) -> Result<RoomView, ChatError> {
        let room_id = Uuid::new_v4();
        let name = self.generator.generate_room_name();

        let cached = self.start_local_room(room_id).await?;

        let record = RoomRecord { id: room_id, name: name.clone() };
        if let Err(e) = self.store.rooms.insert(&record).await {
            self.teardown_local_room(room_id, &cached).await;
            return Err(ChatError::Data(e));
        }

        let mut rooms = self.rooms.lock().await;
        rooms.insert(room_id, cached);

        Ok(RoomView { id: room_id, name, members: Vec::new() })
    }

    /// Start (or reuse) the local pump + queue bridge for `room_id` without
    /// persisting anything. Used by both `create_room` and `serve_room` (the
    /// latter when this process doesn't already host the room).
    async fn start_local_room(&self, room_id: Uuid) -> Result<Arc<CachedRoom>, ChatError> {
        {
            let rooms = self.rooms.lock().await;
            if let Some(existing) = rooms.get(&room_id) {
                return Ok(Arc::clone(existing));
            }
        }

        let (handle, ready_rx) = spawn_room(room_id, self.fanout_deadline());
        tokio::time::timeout(self.ready_deadline(), ready_rx)
            .await
            .map_err(|_| ChatError::RoomNotReady)?
            .map_err(|_| ChatError::RoomNotReady)?;

        let bridge = start_queue_bridge(Arc::clone(&self.pubsub), Arc::clone(&handle), self.ready_deadline()).await?;

        Ok(Arc::new(CachedRoom { handle, bridge }))
    }

    async fn teardown_local_room(&self, room_id: Uuid, cached: &CachedRoom) {
        cached.bridge.stop();
        if let Err(e) = cached.handle.shutdown(self.ready_deadline()).await {
            tracing::warn!(error = %e, %room_id, "room teardown did not complete cleanly");
        }
    }

    /// Serve a newly-connected participant on `room_id`: resolve or start
    /// the local room, run the six-step Reader/Writer/Publish rendezvous,
    /// and return once the participant is fully registered (or the
    /// rendezvous fails, in which case everything started is unwound).
    pub async fn serve_room<R, W>(
        &self,
        room_id: Uuid,
        transport_read: R,
        transport_write: W,
    ) -> Result<(), ChatError>
    where
        R: Transport + Send + 'static,
        W: Transport + Send + 'static,
    {
        let room_record = self
            .store
            .rooms
            .get(room_id)
            .await
            .map_err(ChatError::Data)?
            .ok_or(ChatError::RoomNotFound)?;

        let cached = self.start_local_room(room_id).await?;
        {
            let mut rooms = self.rooms.lock().await;
            rooms.entry(room_id).or_insert_with(|| Arc::clone(&cached));
        }

        let member_id = Uuid::new_v4();
        let member_name = self.generator.generate_member_name();
        let (participant, channels) = new_participant(member_id, member_name.clone(), room_id);
        let participant = Arc::new(participant);

        let ParticipantChannels {
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
        } = channels;

        // Step 2: start Reader, await readyListen.
        let reader = tokio::spawn(super::participant::run_reader(
            transport_read,
            member_id,
            member_name.clone(),
            room_id,
            outbound_tx,
            ready_listen_tx,
            start_broadcast_rx,
            stop_broadcast_rx,
        ));
        tokio::time::timeout(self.ready_deadline(), ready_listen_rx)
            .await
            .map_err(|_| ChatError::NotListening)?
            .map_err(|_| ChatError::NotListening)?;

        // Step 3: start the Publish loop against this participant's outbound.
        let publish_handle = tokio::spawn(Self::run_publish_loop(
            self.store.clone(),
            Arc::clone(&self.pubsub),
            Arc::clone(&participant),
            outbound_rx,
        ));

        // Step 4: start Writer, await readyBroadcast.
        let writer = tokio::spawn(super::participant::run_writer(
            transport_write,
            member_id,
            room_id,
            inbound_rx,
            ready_broadcast_tx,
            stop_listen_rx,
        ));
        tokio::time::timeout(self.ready_deadline(), ready_broadcast_rx)
            .await
            .map_err(|_| ChatError::NotBroadcasting)?
            .map_err(|_| ChatError::NotBroadcasting)?;

        // Step 5: durably record the member (writes MemberJoined atomically).
        let joined = self
            .store
            .members
            .add(&MemberRecord { id: member_id, name: member_name, room_id })
            .await
            .map_err(|e| {
                participant.terminate();
                reader.abort();
                writer.abort();
                publish_handle.abort();
                ChatError::Data(e)
            })?;

        // Step 6: add to the local roster, publish Joined, then release the
        // startBroadcast gate so the Reader begins consuming frames. The gate
        // is released regardless of publish outcome: the member is already
        // durable, so it must not be held hostage to the pub/sub bus.
        if cached.handle.inbound.send(RoomEvent::Joined(Arc::clone(&participant))).await.is_err() {
            return Err(ChatError::RoomNotReceiving);
        }

        let publish_result = self.publish_message(&joined).await;
        let _ = start_broadcast_tx.send(());

        if let Err(e) = publish_result {
            tracing::warn!(error = %e, %room_id, %member_id, "failed to publish MemberJoined");
            return Err(ChatError::FailedToPublish(e));
        }

        Ok(())
    }

    /// The Publish loop for one participant: consumes its `outbound` stream,
    /// durably records each message and republishes it, and removes the
    /// member from the durable roster on `MemberLeft`.
    async fn run_publish_loop(
        store: ChatStore,
        pubsub: Arc<dyn PubSubBackend>,
        participant: Arc<Participant>,
        mut outbound_rx: tokio::sync::mpsc::Receiver<Message>,
    ) {
        while let Some(msg) = outbound_rx.recv().await {
            let is_leave = matches!(msg.message_type, MessageType::MemberLeft);

            if is_leave {
                match store.members.remove(msg.room_id, msg.member_id, &msg.member_name).await {
                    Ok(left) => {
                        if let Err(e) = Self::publish(&pubsub, &left).await {
                            tracing::warn!(error = %e, member_id = %participant.id, "failed to publish MemberLeft");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, member_id = %participant.id, "failed to remove member on leave");
                    }
                }
                return;
            }

            let new_message = NewMessage {
                room_id: msg.room_id,
                member_id: msg.member_id,
                member_name: msg.member_name.clone(),
                message_type: msg.message_type,
                body: msg.body.clone(),
            };

            match store.messages.insert(new_message).await {
                Ok(stored) => {
                    if let Err(e) = Self::publish(&pubsub, &stored).await {
                        tracing::warn!(error = %e, member_id = %participant.id, "failed to publish chat message");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, member_id = %participant.id, "failed to persist message");
                    let failed = Message {
                        id: Uuid::new_v4(),
                        room_id: msg.room_id,
                        member_id: msg.member_id,
                        member_name: msg.member_name,
                        message_type: MessageType::SendFailed,
                        body: msg.body,
                        sent: chrono::Utc::now(),
                    };
                    let _ = participant.deliver(failed, Duration::from_millis(1_000)).await;
                }
            }
        }
    }

    /// Publish `msg` on the room's subject. Returns the bare [`PubSubError`]
    /// (not wrapped in `ChatError`) so callers can decide for themselves
    /// whether a publish failure is fatal (`ServeRoom`'s Joined publish) or
    /// merely logged (the steady-state publish loop).
    async fn publish_message(&self, msg: &Message) -> Result<(), PubSubError> {
        Self::publish(&self.pubsub, msg).await
    }

    async fn publish(pubsub: &Arc<dyn PubSubBackend>, msg: &Message) -> Result<(), PubSubError> {
        let payload = serde_json::to_vec(msg)
            .map_err(|e| PubSubError::Config(format!("failed to encode message: {e}")))?;
        pubsub.publish(&msg.room_id.to_string(), &payload).await
    }

    /// Fetch a room and its durable member roster (not the local in-process
    /// roster, which only reflects participants connected to this process).
    pub async fn get_room(&self, room_id: Uuid) -> Result<RoomView, ChatError> {
        let record = self.store.rooms.get(room_id).await.map_err(ChatError::Data)?.ok_or(ChatError::RoomNotFound)?;
        let members = self.store.members.list(room_id).await.map_err(ChatError::Data)?;
        Ok(RoomView { id: record.id, name: record.name, members })
    }

    /// Fetch a page of durable messages for a room.
    pub async fn get_messages(&self, options: GetMessageOptions) -> Result<Vec<Message>, ChatError> {
        options.validate()?;
        self.store.messages.query(&options).await.map_err(ChatError::Data)
    }

    pub async fn health_check(&self) -> Result<(), ChatError> {
        self.store.health_check().await.map_err(ChatError::Data)?;
        self.pubsub.health_check().await.map_err(ChatError::PubSub)?;
        Ok(())
    }

    /// Shut every locally-hosted room down, used during process shutdown.
    pub async fn shutdown_all_rooms(&self) {
        let rooms: Vec<Arc<CachedRoom>> = {
            let mut guard = self.rooms.lock().await;
            guard.drain().map(|(_, v)| v).collect()
        };
        for cached in rooms {
            self.teardown_local_room(cached.handle.room_id, &cached).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::new_memory_store;
    use crate::data::pubsub::MemoryPubSub;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    fn test_config() -> AppConfig {
        AppConfig::load(&crate::core::cli::CliConfig::default()).unwrap()
    }

    struct MockTransport {
        incoming: StdMutex<VecDeque<Result<Option<String>, ChatError>>>,
    }

    #[async_trait::async_trait]
    impl Transport for MockTransport {
        async fn recv_text(&mut self) -> Result<Option<String>, ChatError> {
            self.incoming.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn send_json(&mut self, _msg: &Message) -> Result<(), ChatError> {
            Ok(())
        }
    }

    fn controller() -> Controller {
        let store = new_memory_store();
        let pubsub: Arc<dyn PubSubBackend> = Arc::new(MemoryPubSub::new());
        Controller::new(store, pubsub, test_config())
    }

    #[tokio::test]
    async fn create_then_get_room_round_trips() {
        let controller = controller();
        let created = controller.create_room().await.unwrap();
        let fetched = controller.get_room(created.id).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.name, created.name);
        assert!(fetched.members.is_empty());
    }

    #[tokio::test]
    async fn get_room_for_unknown_id_is_room_not_found() {
        let controller = controller();
        let err = controller.get_room(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ChatError::RoomNotFound));
    }

    #[tokio::test]
    async fn serve_room_for_unknown_room_fails_before_starting_tasks() {
        let controller = controller();
        let read = MockTransport { incoming: StdMutex::new(VecDeque::from([Ok(None)])) };
        let write = MockTransport { incoming: StdMutex::new(VecDeque::new()) };
        let err = controller.serve_room(Uuid::new_v4(), read, write).await.unwrap_err();
        assert!(matches!(err, ChatError::RoomNotFound));
    }

    #[tokio::test]
    async fn serve_room_registers_member_and_publishes_joined() {
        let controller = controller();
        let room = controller.create_room().await.unwrap();

        let read = MockTransport { incoming: StdMutex::new(VecDeque::from([Ok(None)])) };
        let write = MockTransport { incoming: StdMutex::new(VecDeque::new()) };
        controller.serve_room(room.id, read, write).await.unwrap();

        // Give the async Reader-close / Publish-loop handoff a moment to land.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let view = controller.get_room(room.id).await.unwrap();
        // The member both joined and (since recv_text immediately returned
        // an expected close) left within the same beat; either roster state
        // is consistent with the six-step sequence having completed.
        assert!(view.members.len() <= 1);
    }
}
