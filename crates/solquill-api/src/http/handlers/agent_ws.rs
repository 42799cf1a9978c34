//! WebSocket handler for the contract agent.
//!
//! `GET /ws/agent?wallet_address=<owner>&chat_id=<optional>` validates the
//! query, then upgrades. Each connection claims its owner's slot in the
//! [`ConnectionRegistry`](solquill_core::session::ConnectionRegistry); a newer
//! connection for the same owner cancels this one.
//!
//! The loop is a single `tokio::select!` over cancellation, a heartbeat tick
//! and the next inbound message. A text frame is handled to completion
//! before the next one is read. Cancellation is always polled first, so a
//! replaced connection stops at its next await point.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::stream::SplitStream;
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use solquill_core::chat::ChatRepository;
use solquill_core::session::{ConnectionSession, EventSink, SinkClosed};
use solquill_types::event::ServerEvent;
use solquill_types::identity::{ChatId, OwnerId};

use crate::http::error::AppError;
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Handshake query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AgentQuery {
    pub wallet_address: Option<String>,
    #[serde(alias = "chatId")]
    pub chat_id: Option<String>,
}

impl AgentQuery {
    fn validate(&self) -> Result<(OwnerId, Option<ChatId>), AppError> {
        let owner = OwnerId::parse(self.wallet_address.as_deref().unwrap_or_default())?;
        let chat_id = self
            .chat_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(ChatId::parse)
            .transpose()?;
        Ok((owner, chat_id))
    }
}

/// GET /ws/agent -- Upgrade to WebSocket for an agent conversation.
///
/// The upgrade extractor comes last so a bad query is reported as a 400
/// before upgrade headers are looked at.
pub async fn agent_ws_handler(
    Query(query): Query<AgentQuery>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let (owner, chat_id) = query.validate()?;
    Ok(ws.on_upgrade(move |socket| handle_agent_ws(socket, owner, chat_id, state)))
}

/// Serializes events onto the write half of the socket.
struct WsEventSink<S> {
    sender: S,
}

impl<S> WsEventSink<S>
where
    S: Sink<Message, Error = axum::Error> + Unpin + Send,
{
    fn new(sender: S) -> Self {
        Self { sender }
    }

    async fn ping(&mut self) -> Result<(), SinkClosed> {
        self.sender
            .send(Message::Ping(Default::default()))
            .await
            .map_err(|_| SinkClosed)
    }

    async fn close(&mut self) {
        let _ = self.sender.close().await;
    }
}

impl<S> EventSink for WsEventSink<S>
where
    S: Sink<Message, Error = axum::Error> + Unpin + Send,
{
    async fn send(&mut self, event: ServerEvent) -> Result<(), SinkClosed> {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, kind = event.kind(), "dropping unserializable event");
                return Ok(());
            }
        };
        self.sender
            .send(Message::Text(text.into()))
            .await
            .map_err(|_| SinkClosed)
    }
}

/// Core WebSocket connection loop.
async fn handle_agent_ws(socket: WebSocket, owner: OwnerId, chat_id: Option<ChatId>, state: AppState) {
    let ticket = state.connections.register(&owner);
    info!(owner = %owner, connection = %ticket.id, "agent connected");

    let (sender, mut receiver) = socket.split();
    let mut sink = WsEventSink::new(sender);
    let mut session = ConnectionSession::new(
        owner.clone(),
        chat_id,
        state.agent_settings(),
        state.chat_service.clone(),
        state.llm.clone(),
        state.compiler.clone(),
    );

    let opened = tokio::select! {
        biased;
        _ = ticket.cancel.cancelled() => false,
        result = session.open(&mut sink) => result.is_ok(),
    };

    if opened {
        run_loop(&owner, &ticket.cancel, &mut session, &mut sink, &mut receiver).await;
    }

    if state
        .connections
        .finish(&owner, ticket.id, &*state.chat_service)
        .await
    {
        info!(owner = %owner, connection = %ticket.id, "agent disconnected");
    } else {
        info!(owner = %owner, connection = %ticket.id, "agent connection replaced");
    }
    sink.close().await;
}

/// Read frames until the peer leaves, the sink fails or `cancel` fires.
async fn run_loop<R, S>(
    owner: &OwnerId,
    cancel: &CancellationToken,
    session: &mut ConnectionSession<R>,
    sink: &mut WsEventSink<S>,
    receiver: &mut SplitStream<WebSocket>,
) where
    R: ChatRepository,
    S: Sink<Message, Error = axum::Error> + Unpin + Send,
{
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(owner = %owner, "connection cancelled");
                break;
            }
            _ = heartbeat.tick() => {
                if sink.ping().await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let delivered = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => false,
                            result = session.handle_text(text.as_str(), &mut *sink) => result.is_ok(),
                        };
                        if !delivered {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let reply = ServerEvent::error("binary frames are not supported");
                        if sink.send(reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(owner = %owner, error = %e, "receive failed");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::mpsc;
    use tokio_util::sync::PollSender;

    #[test]
    fn test_query_validation() {
        let query = AgentQuery {
            wallet_address: Some("0xABCDEFabcdef0123456789abcdef0123456789AB".to_string()),
            chat_id: Some(String::new()),
        };
        let (owner, chat_id) = query.validate().unwrap();
        assert_eq!(owner.as_str(), "0xabcdefabcdef0123456789abcdef0123456789ab");
        assert!(chat_id.is_none());

        assert!(AgentQuery::default().validate().is_err());
    }

    #[tokio::test]
    async fn test_sink_writes_json_text() {
        let (tx, mut rx) = mpsc::channel::<Message>(4);
        let mut sink = WsEventSink::new(PollSender::new(tx).sink_map_err(axum::Error::new));

        sink.send(ServerEvent::message("hello")).await.unwrap();

        match rx.recv().await {
            Some(Message::Text(text)) => {
                let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(json["type"], "message");
                assert_eq!(json["content"], "hello");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sink_reports_closed_peer() {
        let (tx, rx) = mpsc::channel::<Message>(4);
        drop(rx);
        let mut sink = WsEventSink::new(PollSender::new(tx).sink_map_err(axum::Error::new));
        assert_eq!(sink.send(ServerEvent::message("x")).await, Err(SinkClosed));
    }

    #[tokio::test]
    async fn test_ping_writes_ping_frame() {
        let (tx, mut rx) = mpsc::channel::<Message>(4);
        let mut sink = WsEventSink::new(PollSender::new(tx).sink_map_err(axum::Error::new));

        sink.ping().await.unwrap();
        assert!(matches!(rx.recv().await, Some(Message::Ping(_))));
    }
}
