//! Per-connection WebSocket handler.
//!
//! Keeps WebSocket framing and heartbeats at the edge while forwarding
//! notification events addressed to the signed-in user. The public contract
//! pings every 5s and considers a connection idle after 10s without client
//! traffic. Tests shorten these intervals to speed up feedback.

use std::time::{Duration, Instant};

use actix_ws::{CloseCode, CloseReason, Closed, Message, MessageStream, ProtocolError, Session};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time;
use tracing::{debug, warn};

use crate::domain::{CurrentUser, NotificationEvent};
use crate::inbound::ws::messages::{ClientMessage, ServerMessage};

/// Time between heartbeats to the client (5s in production, shorter in tests).
#[cfg(not(test))]
pub(super) const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
#[cfg(test)]
pub(super) const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(100);

/// Max idle time before disconnecting the client (10s in production, shorter in tests).
#[cfg(not(test))]
pub(super) const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);
#[cfg(test)]
pub(super) const CLIENT_TIMEOUT: Duration = Duration::from_millis(300);

pub(super) async fn handle_ws_session(
    user: CurrentUser,
    events: broadcast::Receiver<NotificationEvent>,
    session: Session,
    stream: MessageStream,
) {
    WsSession { user }.run(events, session, stream).await;
}

enum SessionError {
    ClientClosed(Option<CloseReason>),
    StreamClosed,
    FeedClosed,
    HeartbeatTimeout,
    Protocol(ProtocolError),
    InvalidPayload,
    Network(Closed),
}

enum CloseAction {
    None,
    Close(Option<CloseReason>),
}

struct WsSession {
    user: CurrentUser,
}

impl WsSession {
    async fn run(
        &self,
        mut events: broadcast::Receiver<NotificationEvent>,
        mut session: Session,
        mut stream: MessageStream,
    ) {
        let mut last_heartbeat = Instant::now();
        let mut heartbeat = time::interval(HEARTBEAT_INTERVAL);

        let greeting = ServerMessage::Connected {
            user_id: self.user.id.to_string(),
        };
        if let Err(error) = send_json(&mut session, &greeting).await {
            warn!(error = %error, "WebSocket greeting failed");
            return;
        }

        loop {
            let result = tokio::select! {
                _ = heartbeat.tick() => {
                    handle_heartbeat_tick(&mut session, &last_heartbeat).await
                }
                message = stream.recv() => {
                    handle_stream_message(&mut session, &mut last_heartbeat, message).await
                }
                event = events.recv() => {
                    self.handle_event(&mut session, event).await
                }
            };

            if let Err(error) = result {
                self.log_shutdown_reason(&error);
                close_session_if_needed(session, close_action_for(&error)).await;
                return;
            }
        }
    }

    async fn handle_event(
        &self,
        session: &mut Session,
        event: Result<NotificationEvent, RecvError>,
    ) -> Result<(), SessionError> {
        match event {
            Ok(event) if event.is_addressed_to(&self.user) => {
                let frame = ServerMessage::Notification {
                    notification: &event,
                };
                send_json(session, &frame)
                    .await
                    .map_err(SessionError::Network)
            }
            Ok(_) => Ok(()),
            Err(RecvError::Lagged(skipped)) => {
                warn!(user_id = %self.user.id, skipped, "notification socket lagged");
                Ok(())
            }
            Err(RecvError::Closed) => Err(SessionError::FeedClosed),
        }
    }

    fn log_shutdown_reason(&self, error: &SessionError) {
        match error {
            SessionError::HeartbeatTimeout => {
                warn!(user_id = %self.user.id, "WebSocket heartbeat timeout; closing connection");
            }
            SessionError::Protocol(error) => {
                warn!(error = %error, "WebSocket protocol error");
            }
            SessionError::Network(error) => {
                warn!(error = %error, "WebSocket send failed; closing connection");
            }
            SessionError::FeedClosed => {
                warn!("notification feed closed; closing connection");
            }
            SessionError::InvalidPayload
            | SessionError::ClientClosed(_)
            | SessionError::StreamClosed => {
                debug!(user_id = %self.user.id, "notification socket closed");
            }
        }
    }
}

async fn handle_heartbeat_tick(
    session: &mut Session,
    last_heartbeat: &Instant,
) -> Result<(), SessionError> {
    if Instant::now().duration_since(*last_heartbeat) > CLIENT_TIMEOUT {
        return Err(SessionError::HeartbeatTimeout);
    }

    session.ping(b"").await.map_err(SessionError::Network)
}

async fn handle_stream_message(
    session: &mut Session,
    last_heartbeat: &mut Instant,
    message: Option<Result<Message, ProtocolError>>,
) -> Result<(), SessionError> {
    let Some(message) = message else {
        return Err(SessionError::StreamClosed);
    };

    match message {
        Ok(message) => handle_message(session, last_heartbeat, message).await,
        Err(error) => Err(SessionError::Protocol(error)),
    }
}

async fn handle_message(
    session: &mut Session,
    last_heartbeat: &mut Instant,
    message: Message,
) -> Result<(), SessionError> {
    match message {
        Message::Ping(payload) => {
            *last_heartbeat = Instant::now();
            session
                .pong(&payload)
                .await
                .map_err(SessionError::Network)
        }
        Message::Text(text) => {
            *last_heartbeat = Instant::now();
            handle_text_message(session, text.as_ref()).await
        }
        Message::Pong(_) | Message::Binary(_) | Message::Continuation(_) | Message::Nop => {
            *last_heartbeat = Instant::now();
            Ok(())
        }
        Message::Close(reason) => Err(SessionError::ClientClosed(reason)),
    }
}

async fn handle_text_message(session: &mut Session, text: &str) -> Result<(), SessionError> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => send_json(session, &ServerMessage::Pong)
            .await
            .map_err(SessionError::Network),
        Err(error) => {
            warn!(error = %error, "Rejected malformed WebSocket payload");
            Err(SessionError::InvalidPayload)
        }
    }
}

async fn send_json(session: &mut Session, payload: &ServerMessage<'_>) -> Result<(), Closed> {
    match serde_json::to_string(payload) {
        Ok(body) => session.text(body).await,
        Err(error) => {
            warn!(error = %error, "Failed to serialize WebSocket payload");
            Ok(())
        }
    }
}

fn close_action_for(error: &SessionError) -> CloseAction {
    match error {
        SessionError::HeartbeatTimeout => CloseAction::Close(Some(CloseReason {
            code: CloseCode::Normal,
            description: Some("heartbeat timeout".to_owned()),
        })),
        SessionError::Protocol(_) => CloseAction::Close(Some(CloseReason {
            code: CloseCode::Protocol,
            description: Some("protocol error".to_owned()),
        })),
        SessionError::InvalidPayload => CloseAction::Close(Some(CloseReason {
            code: CloseCode::Policy,
            description: Some("invalid payload".to_owned()),
        })),
        SessionError::FeedClosed => CloseAction::Close(Some(CloseReason {
            code: CloseCode::Away,
            description: Some("server shutting down".to_owned()),
        })),
        SessionError::ClientClosed(reason) => CloseAction::Close(reason.clone()),
        SessionError::StreamClosed | SessionError::Network(_) => CloseAction::None,
    }
}

async fn close_session_if_needed(session: Session, close_action: CloseAction) {
    if let CloseAction::Close(reason) = close_action {
        if let Err(error) = session.close(reason).await {
            warn!(error = %error, "Failed to close WebSocket session");
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
