//! PostgreSQL-backed `RoomRepository`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::data::error::DataError;
use crate::domain::chat::store::{RoomRecord, RoomRepository};

pub struct PostgresRoomRepository {
    pool: PgPool,
}

impl PostgresRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    async fn insert(&self, room: &RoomRecord) -> Result<(), DataError> {
        sqlx::query("INSERT INTO rooms (id, name) VALUES ($1, $2)")
            .bind(room.id)
            .bind(&room.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<RoomRecord>, DataError> {
        let row = sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM rooms WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| RoomRecord { id, name }))
    }

    async fn health_check(&self) -> Result<(), DataError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
