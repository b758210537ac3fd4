//! WebSocket session handler tests.

use super::*;
use crate::domain::ports::{NotificationBroadcaster, NotificationFeed};
use crate::domain::{Audience, NotificationId, NotificationKind, User, UserId, UserRole};
use crate::inbound::ws;
use crate::inbound::ws::state::WsState;
use crate::test_support::TestHarness;
use actix_web::{App, HttpServer, dev::ServerHandle, http::header};
use awc::{BoxedSocket, ws::Codec, ws::Frame};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use rstest::rstest;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

type Socket = actix_codec::Framed<BoxedSocket, Codec>;

struct Fixture {
    harness: TestHarness,
    url: String,
    server: ServerHandle,
}

impl Fixture {
    async fn start() -> Self {
        let harness = TestHarness::new();
        let ws_state = WsState::new(
            harness.state.accounts.clone(),
            Arc::clone(&harness.hub) as Arc<dyn NotificationFeed>,
            vec![Url::parse("http://localhost:5173").expect("origin")],
        );
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let server = HttpServer::new(move || {
            App::new()
                .app_data(actix_web::web::Data::new(ws_state.clone()))
                .service(ws::ws_entry)
        })
        .listen(listener)
        .expect("bind test server")
        .disable_signals()
        .run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        Self {
            harness,
            url: format!("http://{addr}"),
            server: handle,
        }
    }

    async fn connect(&self, user: &User) -> Socket {
        let token = self.harness.token_for(user);
        let (_resp, mut socket) = awc::Client::default()
            .ws(format!("{}/ws?token={token}", self.url))
            .set_header(header::ORIGIN, "http://localhost:5173")
            .connect()
            .await
            .expect("websocket connect");
        let greeting = next_json(&mut socket).await;
        assert_eq!(greeting["type"], "connected");
        socket
    }
}

fn event(recipient: Option<UserId>, audience: Audience, title: &str) -> crate::domain::NotificationEvent {
    crate::domain::NotificationEvent {
        id: NotificationId::random(),
        recipient,
        audience,
        title: title.into(),
        message: "body".into(),
        kind: NotificationKind::Info,
        link: None,
        created_at: Utc::now(),
    }
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let frame = socket.next().await.expect("response frame").expect("frame");
        match frame {
            Frame::Text(bytes) => return serde_json::from_slice(&bytes).expect("json"),
            Frame::Ping(_) | Frame::Pong(_) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

#[rstest]
#[actix_rt::test]
async fn forwards_only_events_addressed_to_the_user() {
    let fixture = Fixture::start().await;
    let student = fixture.harness.seed_user(UserRole::Student, "s@example.in").await;
    let other = fixture.harness.seed_user(UserRole::Student, "o@example.in").await;
    let mut socket = fixture.connect(&student).await;

    fixture
        .harness
        .hub
        .publish(event(Some(other.id.clone()), Audience::All, "not for you"));
    fixture
        .harness
        .hub
        .publish(event(None, Audience::Admins, "admins only"));
    fixture
        .harness
        .hub
        .publish(event(Some(student.id.clone()), Audience::All, "for you"));

    let frame = next_json(&mut socket).await;
    assert_eq!(frame["type"], "notification");
    assert_eq!(frame["notification"]["title"], "for you");
    fixture.server.stop(false).await;
}

#[rstest]
#[actix_rt::test]
async fn answers_application_ping() {
    let fixture = Fixture::start().await;
    let student = fixture.harness.seed_user(UserRole::Student, "s@example.in").await;
    let mut socket = fixture.connect(&student).await;

    socket
        .send(awc::ws::Message::Text(r#"{"type":"ping"}"#.into()))
        .await
        .expect("send text");
    let frame = next_json(&mut socket).await;
    assert_eq!(frame["type"], "pong");
}

#[rstest]
#[actix_rt::test]
async fn closes_on_malformed_json() {
    let fixture = Fixture::start().await;
    let student = fixture.harness.seed_user(UserRole::Student, "s@example.in").await;
    let mut socket = fixture.connect(&student).await;

    socket
        .send(awc::ws::Message::Text("not-json".into()))
        .await
        .expect("send text");

    loop {
        let frame = socket.next().await.expect("response frame").expect("frame");
        match frame {
            Frame::Ping(_) | Frame::Pong(_) => continue,
            Frame::Close(reason) => {
                assert_eq!(reason.expect("reason").code, CloseCode::Policy);
                break;
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }
}

#[rstest]
#[actix_rt::test]
async fn closes_after_timeout_without_client_messages() {
    let fixture = Fixture::start().await;
    let student = fixture.harness.seed_user(UserRole::Student, "s@example.in").await;
    let mut socket = fixture.connect(&student).await;
    tokio::time::sleep(CLIENT_TIMEOUT + HEARTBEAT_INTERVAL * 3).await;

    let observed_close = tokio::time::timeout(Duration::from_secs(2), async {
        let mut observed = None;
        while let Some(frame) = socket.next().await {
            match frame.expect("frame") {
                Frame::Ping(_) | Frame::Pong(_) => continue,
                Frame::Close(reason) => {
                    observed = reason;
                    break;
                }
                other => panic!("unexpected frame before close: {other:?}"),
            }
        }
        observed
    })
    .await
    .expect("close frame missing within timeout")
    .expect("close frame missing after timeout");

    assert_eq!(observed_close.code, CloseCode::Normal);
    assert_eq!(
        observed_close.description.as_deref(),
        Some("heartbeat timeout")
    );
}

#[rstest]
#[case::no_token(None, "http://localhost:5173")]
#[case::bad_token(Some("not-a-jwt"), "http://localhost:5173")]
#[case::foreign_origin(Some("valid"), "https://evil.example")]
#[actix_rt::test]
async fn refuses_unauthenticated_or_foreign_upgrades(
    #[case] token: Option<&str>,
    #[case] origin: &str,
) {
    let fixture = Fixture::start().await;
    let student = fixture.harness.seed_user(UserRole::Student, "s@example.in").await;
    let token = match token {
        Some("valid") => Some(fixture.harness.token_for(&student)),
        other => other.map(str::to_owned),
    };
    let url = match token {
        Some(token) => format!("{}/ws?token={token}", fixture.url),
        None => format!("{}/ws", fixture.url),
    };
    let result = awc::Client::default()
        .ws(url)
        .set_header(header::ORIGIN, origin)
        .connect()
        .await;
    assert!(result.is_err(), "upgrade must be refused");
}
