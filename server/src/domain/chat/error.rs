//! Typed error taxonomy for the chat domain.

use thiserror::Error;

use crate::data::error::DataError;
use crate::data::pubsub::PubSubError;

#[derive(Error, Debug)]
pub enum ChatError {
    /// A context-bounded rendezvous send did not complete (slow fan-out,
    /// bounded inbound handoff).
    #[error("send timed out")]
    SendTimedOut,

    /// A room lifecycle rendezvous (create/resolve) timed out.
    #[error("room not ready")]
    RoomNotReady,

    /// A room failed to signal `stopped` within its shutdown deadline.
    #[error("room not shut down")]
    RoomNotShutdown,

    /// A room's inbound pump is not accepting new events.
    #[error("room not receiving")]
    RoomNotReceiving,

    /// The Reader task did not signal ready before the deadline.
    #[error("participant not listening")]
    NotListening,

    /// The Writer task did not signal ready before the deadline.
    #[error("participant not broadcasting")]
    NotBroadcasting,

    /// The transport closed normally (not an error condition).
    #[error("connection closed")]
    ExpectedClose,

    /// Pub/sub publish failed after durable state was already written. The
    /// participant is a legitimate member; this is reported, not unwound.
    #[error("failed to publish to pub/sub: {0}")]
    FailedToPublish(PubSubError),

    /// Query parameters violated a documented constraint.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("room not found")]
    RoomNotFound,

    /// The underlying transport (WebSocket) misbehaved.
    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    PubSub(#[from] PubSubError),
}

impl ChatError {
    /// Whether this error represents a normal disconnect rather than a fault.
    pub fn is_expected_close(&self) -> bool {
        matches!(self, ChatError::ExpectedClose)
    }
}
