//! PostgreSQL-backed `MessageRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::error::DataError;
use crate::domain::chat::message::{GetMessageOptions, Message, MessageType, NewMessage};
use crate::domain::chat::store::MessageRepository;

pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type MessageRow = (Uuid, Uuid, Uuid, String, String, String, DateTime<Utc>);

fn row_to_message(row: MessageRow) -> Result<Message, DataError> {
    let (id, room_id, member_id, member_name, message_type, body, sent) = row;
    let message_type = MessageType::from_wire_tag(&message_type)
        .map_err(|e| DataError::Config(e.to_string()))?;
    Ok(Message { id, room_id, member_id, member_name, message_type, body, sent })
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn insert(&self, msg: NewMessage) -> Result<Message, DataError> {
        let id = Uuid::new_v4();
        let row: MessageRow = sqlx::query_as(
            "INSERT INTO messages (id, room_id, member_id, member_name, message_type, body)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, room_id, member_id, member_name, message_type, body, sent",
        )
        .bind(id)
        .bind(msg.room_id)
        .bind(msg.member_id)
        .bind(&msg.member_name)
        .bind(msg.message_type.wire_tag())
        .bind(&msg.body)
        .fetch_one(&self.pool)
        .await?;
        row_to_message(row)
    }

    async fn query(&self, options: &GetMessageOptions) -> Result<Vec<Message>, DataError> {
        // limit = 0 means unbounded; NULL in a Postgres LIMIT clause means the same.
        let limit: Option<i64> = if options.limit > 0 { Some(options.limit) } else { None };

        let rows: Vec<MessageRow> = match (&options.after, &options.before) {
            (Some(after), None) => {
                sqlx::query_as(
                    "SELECT id, room_id, member_id, member_name, message_type, body, sent
                     FROM messages
                     WHERE room_id = $1 AND (sent, id) > ($2, $3)
                     ORDER BY sent ASC, id ASC
                     LIMIT $4",
                )
                .bind(options.room_id)
                .bind(after.sent)
                .bind(after.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some(before)) => {
                sqlx::query_as(
                    "SELECT id, room_id, member_id, member_name, message_type, body, sent
                     FROM messages
                     WHERE room_id = $1 AND (sent, id) < ($2, $3)
                     ORDER BY sent DESC, id ASC
                     LIMIT $4",
                )
                .bind(options.room_id)
                .bind(before.sent)
                .bind(before.id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                sqlx::query_as(
                    "SELECT id, room_id, member_id, member_name, message_type, body, sent
                     FROM messages
                     WHERE room_id = $1
                     ORDER BY sent DESC, id ASC
                     LIMIT $2",
                )
                .bind(options.room_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(row_to_message).collect()
    }
}
