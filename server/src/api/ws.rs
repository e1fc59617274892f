//! `Transport` implementation over `axum::extract::ws::WebSocket`.
//!
//! The socket is split into independent read/write halves so the Reader and
//! Writer tasks can each own one without sharing a lock.

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

use crate::domain::chat::error::ChatError;
use crate::domain::chat::message::Message as ChatMessage;
use crate::domain::chat::participant::Transport;

/// Split a raw WebSocket into the two halves `run_reader`/`run_writer`
/// expect.
pub fn split(socket: WebSocket) -> (WsReadHalf, WsWriteHalf) {
    let (sink, stream) = socket.split();
    (WsReadHalf { stream }, WsWriteHalf { sink })
}

pub struct WsReadHalf {
    stream: SplitStream<WebSocket>,
}

pub struct WsWriteHalf {
    sink: SplitSink<WebSocket, WsMessage>,
}

#[async_trait::async_trait]
impl Transport for WsReadHalf {
    async fn recv_text(&mut self) -> Result<Option<String>, ChatError> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Ok(WsMessage::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(WsMessage::Close(_))) => return Ok(None),
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => continue,
                Some(Ok(WsMessage::Binary(_))) => continue,
                Some(Err(e)) => return Err(ChatError::Transport(e.to_string())),
            }
        }
    }

    async fn send_json(&mut self, _msg: &ChatMessage) -> Result<(), ChatError> {
        unreachable!("read half never sends")
    }
}

#[async_trait::async_trait]
impl Transport for WsWriteHalf {
    async fn recv_text(&mut self) -> Result<Option<String>, ChatError> {
        unreachable!("write half never receives")
    }

    async fn send_json(&mut self, msg: &ChatMessage) -> Result<(), ChatError> {
        let text = serde_json::to_string(msg).map_err(|e| ChatError::Transport(e.to_string()))?;
        self.sink
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))
    }
}
