//! The chat domain: rooms, participants, messages, and the controller that
//! orchestrates them.

pub mod controller;
pub mod error;
pub mod generator;
pub mod message;
pub mod participant;
pub mod queue_bridge;
pub mod room;
pub mod store;

pub use controller::{Controller, RoomView};
pub use error::ChatError;
pub use generator::Generator;
pub use message::{GetMessageOptions, Message, MessageCursor, MessageType, NewMessage};
pub use participant::{Participant, Transport};
pub use store::{ChatStore, MemberRecord, MemberRepository, MessageRepository, RoomRecord, RoomRepository};
