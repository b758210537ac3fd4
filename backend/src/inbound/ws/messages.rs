//! Wire-level message definitions for the notification socket.
//!
//! Domain events are wrapped in these payloads before being serialized to
//! JSON and sent to connected clients.

use serde::{Deserialize, Serialize};

use crate::domain::NotificationEvent;

/// Frames a client may send.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Application-level keepalive for clients that cannot send ping frames.
    Ping,
}

/// Frames the server sends.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage<'a> {
    /// Sent once after the upgrade succeeds.
    #[serde(rename_all = "camelCase")]
    Connected { user_id: String },
    /// Reply to [`ClientMessage::Ping`].
    Pong,
    /// A notification addressed to this session's user.
    Notification {
        notification: &'a NotificationEvent,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Audience, NotificationId, NotificationKind};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use serde_json::{Value, json};

    #[rstest]
    #[case(r#"{"type":"ping"}"#)]
    #[case(r#"{"type":"ping","extra":1}"#)]
    fn parses_ping(#[case] raw: &str) {
        let message: ClientMessage = serde_json::from_str(raw).expect("ping");
        assert_eq!(message, ClientMessage::Ping);
    }

    #[rstest]
    #[case(r#"{"type":"subscribe"}"#)]
    #[case(r#"{"kind":"ping"}"#)]
    #[case("ping")]
    fn rejects_unknown_frames(#[case] raw: &str) {
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[rstest]
    fn notification_frame_nests_the_event() {
        let event = NotificationEvent {
            id: NotificationId::random(),
            recipient: None,
            audience: Audience::Students,
            title: "Holiday".into(),
            message: "College closed on Monday".into(),
            kind: NotificationKind::Notice,
            link: Some("/notices".into()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).single().expect("time"),
        };
        let value = serde_json::to_value(ServerMessage::Notification {
            notification: &event,
        })
        .expect("json");
        assert_eq!(value["type"], "notification");
        assert_eq!(value["notification"]["title"], "Holiday");
        assert_eq!(value["notification"]["audience"], "students");
        assert_eq!(value["notification"].get("recipient"), None::<&Value>);
    }

    #[rstest]
    fn connected_frame_uses_camel_case() {
        let value = serde_json::to_value(ServerMessage::Connected {
            user_id: "65f1c0ffee0123456789abcd".into(),
        })
        .expect("json");
        assert_eq!(
            value,
            json!({ "type": "connected", "userId": "65f1c0ffee0123456789abcd" })
        );
    }
}
