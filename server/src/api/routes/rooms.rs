//! Room, message-history, and WebSocket-serve endpoints.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::types::ApiError;
use crate::api::ws;
use crate::core::constants::{DEFAULT_MESSAGE_PAGE_LIMIT, MAX_MESSAGE_PAGE_LIMIT};
use crate::domain::chat::message::{GetMessageOptions, Message, MessageCursor};
use crate::domain::chat::store::MemberRecord;
use crate::domain::chat::{Controller, RoomView};

pub fn routes(controller: Arc<Controller>) -> Router<()> {
    Router::new()
        .route("/api/room", post(create_room))
        .route("/api/room/{room}", get(get_room))
        .route("/api/room/{room}/messages", get(get_messages))
        .route("/api/serve/{room}", get(serve_room))
        .with_state(controller)
}

#[derive(Serialize)]
struct RoomResponse {
    #[serde(rename = "roomId")]
    room_id: Uuid,
    #[serde(rename = "roomName")]
    room_name: String,
}

#[derive(Serialize)]
struct MemberDto {
    id: Uuid,
    name: String,
}

impl From<&MemberRecord> for MemberDto {
    fn from(m: &MemberRecord) -> Self {
        Self { id: m.id, name: m.name.clone() }
    }
}

#[derive(Serialize)]
struct RoomWithMembersResponse {
    #[serde(rename = "roomId")]
    room_id: Uuid,
    #[serde(rename = "roomName")]
    room_name: String,
    members: Vec<MemberDto>,
}

impl From<RoomView> for RoomWithMembersResponse {
    fn from(view: RoomView) -> Self {
        Self {
            room_id: view.id,
            room_name: view.name,
            members: view.members.iter().map(MemberDto::from).collect(),
        }
    }
}

async fn create_room(State(controller): State<Arc<Controller>>) -> Result<Json<RoomResponse>, ApiError> {
    let room = controller.create_room().await?;
    Ok(Json(RoomResponse { room_id: room.id, room_name: room.name }))
}

async fn get_room(
    State(controller): State<Arc<Controller>>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomWithMembersResponse>, ApiError> {
    let view = controller.get_room(room_id).await?;
    Ok(Json(view.into()))
}

#[derive(Deserialize)]
struct MessagesQuery {
    limit: Option<i64>,
    after: Option<String>,
    before: Option<String>,
}

/// Decode a query-string cursor, treating both an absent key and a
/// present-but-empty value (`?before=`) as "no cursor" rather than the
/// empty cursor sentinel — an empty cursor is a wire-encoding detail, not a
/// request for "strictly before the beginning of time".
fn decode_cursor(raw: Option<String>) -> Result<Option<MessageCursor>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => Ok(Some(MessageCursor::decode_from_string(&s)?)),
    }
}

#[derive(Serialize)]
struct MessageDto {
    id: Uuid,
    #[serde(rename = "roomId")]
    room_id: Uuid,
    #[serde(rename = "memberId")]
    member_id: Uuid,
    #[serde(rename = "memberName")]
    member_name: String,
    #[serde(rename = "type")]
    message_type: &'static str,
    body: String,
    sent: chrono::DateTime<chrono::Utc>,
}

impl From<&Message> for MessageDto {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            room_id: m.room_id,
            member_id: m.member_id,
            member_name: m.member_name.clone(),
            message_type: m.message_type.wire_tag(),
            body: m.body.clone(),
            sent: m.sent,
        }
    }
}

#[derive(Serialize)]
struct MessagesResponse {
    messages: Vec<MessageDto>,
    #[serde(rename = "numResults")]
    num_results: usize,
    next: String,
}

async fn get_messages(
    State(controller): State<Arc<Controller>>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    // after/before mutual exclusivity and limit < 0 are also checked by
    // `GetMessageOptions::validate` inside the controller; the clamp below is
    // route-layer policy (cap page size), not a correctness invariant.
    let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_PAGE_LIMIT).min(MAX_MESSAGE_PAGE_LIMIT);

    let after = decode_cursor(query.after)?;
    let before = decode_cursor(query.before)?;

    let options = GetMessageOptions { room_id, limit, after, before };
    let messages = controller.get_messages(options).await?;

    let next = messages
        .last()
        .map(|m| MessageCursor::from_message(m).encode())
        .unwrap_or_default();

    Ok(Json(MessagesResponse {
        num_results: messages.len(),
        messages: messages.iter().map(MessageDto::from).collect(),
        next,
    }))
}

async fn serve_room(
    State(controller): State<Arc<Controller>>,
    Path(room_id): Path<Uuid>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| async move {
        let (read_half, write_half) = ws::split(socket);
        if let Err(e) = controller.serve_room(room_id, read_half, write_half).await
            && !e.is_expected_close()
        {
            tracing::warn!(error = %e, %room_id, "serve_room ended with error");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_cursor_decodes_to_none() {
        assert!(decode_cursor(None).unwrap().is_none());
    }

    #[test]
    fn empty_cursor_decodes_to_none_not_empty_sentinel() {
        // `?before=` (key present, value empty) must mean "no filter", not
        // MessageCursor::empty() (which would paginate as strictly-before
        // the epoch and always yield zero rows).
        assert!(decode_cursor(Some(String::new())).unwrap().is_none());
    }

    #[test]
    fn valid_cursor_decodes() {
        let cursor = MessageCursor::from_message(&Message {
            id: Uuid::new_v4(),
            room_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            member_name: "Quiet Brook".into(),
            message_type: crate::domain::chat::message::MessageType::Chat,
            body: "hi".into(),
            sent: chrono::Utc::now(),
        });
        let decoded = decode_cursor(Some(cursor.encode())).unwrap();
        assert_eq!(decoded, Some(cursor));
    }

    #[test]
    fn malformed_cursor_is_bad_request() {
        let err = decode_cursor(Some("not-valid-base64!!!".into())).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest { .. }));
    }
}
