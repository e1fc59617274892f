//! Chat message types and the opaque pagination cursor.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Chat,
    MemberJoined,
    MemberLeft,
    SendFailed,
}

impl MessageType {
    /// Wire tag used in the WebSocket JSON frame and in durable storage.
    pub fn wire_tag(self) -> &'static str {
        match self {
            MessageType::Chat => "chat",
            MessageType::MemberJoined => "joined",
            MessageType::MemberLeft => "left",
            MessageType::SendFailed => "failed",
        }
    }

    pub fn from_wire_tag(tag: &str) -> Result<Self, ChatError> {
        match tag {
            "chat" => Ok(MessageType::Chat),
            "joined" => Ok(MessageType::MemberJoined),
            "left" => Ok(MessageType::MemberLeft),
            "failed" => Ok(MessageType::SendFailed),
            other => Err(ChatError::InvalidOptions(format!("unknown message type: {other}"))),
        }
    }
}

/// A single immutable room event. `sent` is always assigned by the store on
/// insert, never by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub room_id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub body: String,
    pub sent: DateTime<Utc>,
}

/// Fields needed to persist a new message; `sent` is filled in by the store.
pub struct NewMessage {
    pub room_id: Uuid,
    pub member_id: Uuid,
    pub member_name: String,
    pub message_type: MessageType,
    pub body: String,
}

/// Opaque, compound `(sent, id)` pagination cursor.
///
/// Wire format: base64 of `"<id>,<sent-rfc3339nano>"`. `is_empty()` holds iff
/// both fields are their zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCursor {
    pub id: Uuid,
    pub sent: DateTime<Utc>,
}

impl MessageCursor {
    pub fn empty() -> Self {
        Self {
            id: Uuid::nil(),
            sent: DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is a valid timestamp"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_nil() && self.sent.timestamp() == 0 && self.sent.timestamp_subsec_nanos() == 0
    }

    pub fn from_message(msg: &Message) -> Self {
        Self {
            id: msg.id,
            sent: msg.sent,
        }
    }

    pub fn encode(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let raw = format!("{},{}", self.id, self.sent.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true));
        BASE64.encode(raw)
    }

    pub fn decode_from_string(s: &str) -> Result<Self, ChatError> {
        if s.is_empty() {
            return Ok(Self::empty());
        }
        let raw = BASE64
            .decode(s)
            .map_err(|_| ChatError::InvalidOptions("cursor is not valid base64".into()))?;
        let raw = String::from_utf8(raw)
            .map_err(|_| ChatError::InvalidOptions("cursor is not valid utf-8".into()))?;
        let (id_part, sent_part) = raw
            .split_once(',')
            .ok_or_else(|| ChatError::InvalidOptions("cursor is malformed".into()))?;
        let id = Uuid::parse_str(id_part)
            .map_err(|_| ChatError::InvalidOptions("cursor id is not a valid uuid".into()))?;
        let sent = DateTime::parse_from_rfc3339(sent_part)
            .map_err(|_| ChatError::InvalidOptions("cursor timestamp is malformed".into()))?
            .with_timezone(&Utc);
        Ok(Self { id, sent })
    }
}

/// Options for `MessageRepository::query`. `after` and `before` are mutually
/// exclusive.
#[derive(Debug, Clone, Default)]
pub struct GetMessageOptions {
    pub room_id: Uuid,
    pub limit: i64,
    pub after: Option<MessageCursor>,
    pub before: Option<MessageCursor>,
}

impl GetMessageOptions {
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.after.is_some() && self.before.is_some() {
            return Err(ChatError::InvalidOptions(
                "after and before are mutually exclusive".into(),
            ));
        }
        if self.limit < 0 {
            return Err(ChatError::InvalidOptions("limit must be >= 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cursor_round_trips_to_empty_string() {
        let cursor = MessageCursor::empty();
        assert_eq!(cursor.encode(), "");
        assert_eq!(MessageCursor::decode_from_string("").unwrap(), cursor);
    }

    #[test]
    fn nonempty_cursor_round_trips() {
        let cursor = MessageCursor {
            id: Uuid::new_v4(),
            sent: Utc::now(),
        };
        let encoded = cursor.encode();
        let decoded = MessageCursor::decode_from_string(&encoded).unwrap();
        assert_eq!(cursor, decoded);
    }

    #[test]
    fn malformed_cursor_is_invalid_options() {
        let err = MessageCursor::decode_from_string("not-valid-base64!!!").unwrap_err();
        assert!(matches!(err, ChatError::InvalidOptions(_)));
    }

    #[test]
    fn message_type_wire_tag_round_trips() {
        for variant in [
            MessageType::Chat,
            MessageType::MemberJoined,
            MessageType::MemberLeft,
            MessageType::SendFailed,
        ] {
            let tag = variant.wire_tag();
            assert_eq!(MessageType::from_wire_tag(tag).unwrap(), variant);
        }
    }

    #[test]
    fn after_and_before_together_is_invalid() {
        let opts = GetMessageOptions {
            room_id: Uuid::new_v4(),
            limit: 10,
            after: Some(MessageCursor::empty()),
            before: Some(MessageCursor::empty()),
        };
        assert!(matches!(opts.validate(), Err(ChatError::InvalidOptions(_))));
    }
}
