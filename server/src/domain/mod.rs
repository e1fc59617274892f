//! Domain logic.
//!
//! - `chat` - rooms, participants, messages, and the orchestrating controller

pub mod chat;
