//! Durable storage contracts for rooms, members, and messages.
//!
//! Two backends implement this trio: `data::postgres` and `data::memory`.
//! `MemberRepository::add`/`remove` also persist the corresponding
//! `MemberJoined`/`MemberLeft` message as part of the same operation, so the
//! two writes can never be observed independently by a reader.

use async_trait::async_trait;
use uuid::Uuid;

use super::message::{GetMessageOptions, Message, NewMessage};
use crate::data::error::DataError;

#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub id: Uuid,
    pub name: String,
    pub room_id: Uuid,
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn insert(&self, room: &RoomRecord) -> Result<(), DataError>;
    async fn get(&self, id: Uuid) -> Result<Option<RoomRecord>, DataError>;
    async fn health_check(&self) -> Result<(), DataError>;
}

#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Insert the member and the `MemberJoined` message atomically; returns
    /// the created message.
    async fn add(&self, member: &MemberRecord) -> Result<Message, DataError>;

    /// Remove the member and insert the `MemberLeft` message atomically;
    /// returns the created message. The roster is a cache of current
    /// occupancy, not the durable log — the `MemberLeft` message is the
    /// permanent record that the member was present and left.
    async fn remove(&self, room_id: Uuid, member_id: Uuid, member_name: &str) -> Result<Message, DataError>;

    async fn list(&self, room_id: Uuid) -> Result<Vec<MemberRecord>, DataError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, msg: NewMessage) -> Result<Message, DataError>;
    async fn query(&self, options: &GetMessageOptions) -> Result<Vec<Message>, DataError>;
}

/// The three repositories bundled together, plus a single health check. Each
/// backend module exposes a constructor returning this struct.
#[derive(Clone)]
pub struct ChatStore {
    pub rooms: std::sync::Arc<dyn RoomRepository>,
    pub members: std::sync::Arc<dyn MemberRepository>,
    pub messages: std::sync::Arc<dyn MessageRepository>,
}

impl ChatStore {
    pub fn new(
        rooms: std::sync::Arc<dyn RoomRepository>,
        members: std::sync::Arc<dyn MemberRepository>,
        messages: std::sync::Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            rooms,
            members,
            messages,
        }
    }

    pub async fn health_check(&self) -> Result<(), DataError> {
        self.rooms.health_check().await
    }
}
