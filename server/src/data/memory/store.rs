//! In-process repository implementation, used by the `memory` database
//! backend (local development, tests, single-process demos).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::data::error::DataError;
use crate::domain::chat::message::{GetMessageOptions, Message, MessageType, NewMessage};
use crate::domain::chat::store::{ChatStore, MemberRecord, MemberRepository, MessageRepository, RoomRecord, RoomRepository};

struct MemoryBackend {
    rooms: RwLock<HashMap<Uuid, RoomRecord>>,
    members: RwLock<HashMap<Uuid, Vec<MemberRecord>>>,
    messages: RwLock<Vec<Message>>,
}

impl MemoryBackend {
    fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            members: RwLock::new(HashMap::new()),
            messages: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RoomRepository for MemoryBackend {
    async fn insert(&self, room: &RoomRecord) -> Result<(), DataError> {
        self.rooms.write().insert(room.id, room.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<RoomRecord>, DataError> {
        Ok(self.rooms.read().get(&id).cloned())
    }

    async fn health_check(&self) -> Result<(), DataError> {
        Ok(())
    }
}

#[async_trait]
impl MemberRepository for MemoryBackend {
    async fn add(&self, member: &MemberRecord) -> Result<Message, DataError> {
        self.members.write().entry(member.room_id).or_default().push(member.clone());

        let msg = Message {
            id: Uuid::new_v4(),
            room_id: member.room_id,
            member_id: member.id,
            member_name: member.name.clone(),
            message_type: MessageType::MemberJoined,
            body: String::new(),
            sent: chrono::Utc::now(),
        };
        self.messages.write().push(msg.clone());
        Ok(msg)
    }

    async fn remove(&self, room_id: Uuid, member_id: Uuid, member_name: &str) -> Result<Message, DataError> {
        if let Some(roster) = self.members.write().get_mut(&room_id) {
            roster.retain(|m| m.id != member_id);
        }

        let msg = Message {
            id: Uuid::new_v4(),
            room_id,
            member_id,
            member_name: member_name.to_string(),
            message_type: MessageType::MemberLeft,
            body: String::new(),
            sent: chrono::Utc::now(),
        };
        self.messages.write().push(msg.clone());
        Ok(msg)
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<MemberRecord>, DataError> {
        Ok(self.members.read().get(&room_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl MessageRepository for MemoryBackend {
    async fn insert(&self, msg: NewMessage) -> Result<Message, DataError> {
        let stored = Message {
            id: Uuid::new_v4(),
            room_id: msg.room_id,
            member_id: msg.member_id,
            member_name: msg.member_name,
            message_type: msg.message_type,
            body: msg.body,
            sent: chrono::Utc::now(),
        };
        self.messages.write().push(stored.clone());
        Ok(stored)
    }

    async fn query(&self, options: &GetMessageOptions) -> Result<Vec<Message>, DataError> {
        let all = self.messages.read();
        let mut matching: Vec<Message> = all
            .iter()
            .filter(|m| m.room_id == options.room_id)
            .cloned()
            .collect();

        if let Some(after) = &options.after {
            matching.sort_by(|a, b| (a.sent, a.id).cmp(&(b.sent, b.id)));
            matching.retain(|m| (m.sent, m.id) > (after.sent, after.id));
        } else {
            matching.sort_by(|a, b| b.sent.cmp(&a.sent).then(a.id.cmp(&b.id)));
            if let Some(before) = &options.before {
                matching.retain(|m| (m.sent, m.id) < (before.sent, before.id));
            }
        }

        if options.limit > 0 {
            matching.truncate(options.limit as usize);
        }

        Ok(matching)
    }
}

/// Build a [`ChatStore`] backed entirely by in-process state.
pub fn new_memory_store() -> ChatStore {
    let backend = Arc::new(MemoryBackend::new());
    ChatStore::new(
        backend.clone() as Arc<dyn RoomRepository>,
        backend.clone() as Arc<dyn MemberRepository>,
        backend as Arc<dyn MessageRepository>,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::message::MessageCursor;

    #[tokio::test]
    async fn room_insert_then_get_round_trips() {
        let store = new_memory_store();
        let room = RoomRecord { id: Uuid::new_v4(), name: "Quiet Falcon".into() };
        store.rooms.insert(&room).await.unwrap();
        let fetched = store.rooms.get(room.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Quiet Falcon");
    }

    #[tokio::test]
    async fn member_add_persists_joined_message() {
        let store = new_memory_store();
        let room_id = Uuid::new_v4();
        let member = MemberRecord { id: Uuid::new_v4(), name: "Coral Ember".into(), room_id };
        let joined = store.members.add(&member).await.unwrap();
        assert!(matches!(joined.message_type, MessageType::MemberJoined));

        let roster = store.members.list(room_id).await.unwrap();
        assert_eq!(roster.len(), 1);
    }

    #[tokio::test]
    async fn member_remove_drops_from_roster_and_persists_left_message() {
        let store = new_memory_store();
        let room_id = Uuid::new_v4();
        let member = MemberRecord { id: Uuid::new_v4(), name: "Jade Tide".into(), room_id };
        store.members.add(&member).await.unwrap();

        let left = store.members.remove(room_id, member.id, &member.name).await.unwrap();
        assert!(matches!(left.message_type, MessageType::MemberLeft));
        assert!(store.members.list(room_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn message_query_respects_after_cursor_and_limit() {
        let store = new_memory_store();
        let room_id = Uuid::new_v4();

        let mut cursor_after_first = None;
        for i in 0..5 {
            let stored = store
                .messages
                .insert(NewMessage {
                    room_id,
                    member_id: Uuid::new_v4(),
                    member_name: format!("member-{i}"),
                    message_type: MessageType::Chat,
                    body: format!("msg-{i}"),
                })
                .await
                .unwrap();
            if i == 0 {
                cursor_after_first = Some(MessageCursor::from_message(&stored));
            }
        }

        let options = GetMessageOptions {
            room_id,
            limit: 2,
            after: cursor_after_first,
            before: None,
        };
        let page = store.messages.query(&options).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].body, "msg-1");
        assert_eq!(page[1].body, "msg-2");
    }
}
