//! PostgreSQL-backed `MemberRepository`.
//!
//! `add`/`remove` write the roster change and the corresponding message in
//! the same transaction, so a reader can never observe one without the
//! other.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::error::DataError;
use crate::domain::chat::message::{Message, MessageType};
use crate::domain::chat::store::{MemberRecord, MemberRepository};

pub struct PostgresMemberRepository {
    pool: PgPool,
}

impl PostgresMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepository for PostgresMemberRepository {
    async fn add(&self, member: &MemberRecord) -> Result<Message, DataError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO members (id, room_id, name) VALUES ($1, $2, $3)")
            .bind(member.id)
            .bind(member.room_id)
            .bind(&member.name)
            .execute(&mut *tx)
            .await?;

        let message_id = Uuid::new_v4();
        let sent: chrono::DateTime<chrono::Utc> = sqlx::query_scalar(
            "INSERT INTO messages (id, room_id, member_id, member_name, message_type, body)
             VALUES ($1, $2, $3, $4, $5, '')
             RETURNING sent",
        )
        .bind(message_id)
        .bind(member.room_id)
        .bind(member.id)
        .bind(&member.name)
        .bind(MessageType::MemberJoined.wire_tag())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Message {
            id: message_id,
            room_id: member.room_id,
            member_id: member.id,
            member_name: member.name.clone(),
            message_type: MessageType::MemberJoined,
            body: String::new(),
            sent,
        })
    }

    async fn remove(&self, room_id: Uuid, member_id: Uuid, member_name: &str) -> Result<Message, DataError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM members WHERE room_id = $1 AND id = $2")
            .bind(room_id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;

        let message_id = Uuid::new_v4();
        let sent: chrono::DateTime<chrono::Utc> = sqlx::query_scalar(
            "INSERT INTO messages (id, room_id, member_id, member_name, message_type, body)
             VALUES ($1, $2, $3, $4, $5, '')
             RETURNING sent",
        )
        .bind(message_id)
        .bind(room_id)
        .bind(member_id)
        .bind(member_name)
        .bind(MessageType::MemberLeft.wire_tag())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Message {
            id: message_id,
            room_id,
            member_id,
            member_name: member_name.to_string(),
            message_type: MessageType::MemberLeft,
            body: String::new(),
            sent,
        })
    }

    async fn list(&self, room_id: Uuid) -> Result<Vec<MemberRecord>, DataError> {
        let rows: Vec<(Uuid, String, Uuid)> =
            sqlx::query_as("SELECT id, name, room_id FROM members WHERE room_id = $1")
                .bind(room_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, room_id)| MemberRecord { id, name, room_id })
            .collect())
    }
}
