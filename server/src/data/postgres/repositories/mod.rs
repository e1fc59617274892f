//! Repository implementations for the `postgres` database backend.

mod member;
mod message;
mod room;

use std::sync::Arc;

pub use member::PostgresMemberRepository;
pub use message::PostgresMessageRepository;
pub use room::PostgresRoomRepository;

use super::PgPool;
use crate::domain::chat::store::{ChatStore, MemberRepository, MessageRepository, RoomRepository};

/// Build a [`ChatStore`] backed entirely by PostgreSQL.
pub fn new_postgres_store(pool: PgPool) -> ChatStore {
    ChatStore::new(
        Arc::new(PostgresRoomRepository::new(pool.clone())) as Arc<dyn RoomRepository>,
        Arc::new(PostgresMemberRepository::new(pool.clone())) as Arc<dyn MemberRepository>,
        Arc::new(PostgresMessageRepository::new(pool)) as Arc<dyn MessageRepository>,
    )
}
