//! Integration tests for the server, handler, and full connection flow over
//! real WebSocket connections.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use neonpuck::prelude::*;
use tokio_tungstenite::tungstenite::Message;

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

/// Production behavior on a shorter clock so tests finish quickly.
fn fast_config() -> MatchConfig {
    MatchConfig {
        countdown_step: Duration::from_millis(20),
        goal_pause: Duration::from_millis(50),
        cleanup_grace: Duration::from_millis(200),
        ..MatchConfig::default()
    }
}

/// Starts a server on a random port; returns its address and registry.
async fn start_server() -> (String, RoomRegistry) {
    let server = NeonPuckServer::builder()
        .bind("127.0.0.1:0")
        .match_config(fast_config())
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("should have local addr").to_string();
    let registry = server.registry();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    (addr, registry)
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, seq: u64, msg: ClientMessage) {
    let envelope = Envelope::wrap(seq, 0, msg);
    let json = serde_json::to_string(&envelope).expect("encode");
    ws.send(Message::Text(json.into())).await.expect("send");
}

async fn recv(ws: &mut ClientWs) -> Envelope<ServerMessage> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for the server")
            .expect("stream ended")
            .expect("websocket error");
        if msg.is_text() || msg.is_binary() {
            return serde_json::from_slice(&msg.into_data()).expect("decode");
        }
    }
}

/// Receives until `pred` matches, discarding everything before it.
async fn recv_until(ws: &mut ClientWs, pred: impl Fn(&ServerMessage) -> bool) -> ServerMessage {
    loop {
        let envelope = recv(ws).await;
        if pred(&envelope.payload) {
            return envelope.payload;
        }
    }
}

async fn create(ws: &mut ClientWs) -> RoomCode {
    send(ws, 1, ClientMessage::CreateRoom).await;
    match recv(ws).await.payload {
        ServerMessage::RoomCreated { code } => code,
        other => panic!("expected room-created, got {other:?}"),
    }
}

/// Two connected players in one room, after the countdown.
async fn playing_pair(addr: &str) -> (ClientWs, ClientWs, RoomCode) {
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    let code = create(&mut a).await;
    send(&mut b, 1, ClientMessage::JoinRoom { code: code.to_string() }).await;
    for ws in [&mut a, &mut b] {
        recv_until(ws, |m| matches!(m, ServerMessage::CountdownStep { value: -1 })).await;
    }
    (a, b, code)
}

async fn expect_join_error(ws: &mut ClientWs, reason: &str) {
    match recv(ws).await.payload {
        ServerMessage::JoinError { reason: got } => assert_eq!(got, reason),
        other => panic!("expected join-error, got {other:?}"),
    }
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_create_room_replies_with_code() {
    let (addr, registry) = start_server().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, 1, ClientMessage::CreateRoom).await;
    let envelope = recv(&mut ws).await;
    assert_eq!(envelope.seq, 1);
    assert_eq!(envelope.channel, Channel::ReliableOrdered);
    let ServerMessage::RoomCreated { code } = envelope.payload else {
        panic!("expected room-created, got {:?}", envelope.payload);
    };
    assert_eq!(code.as_str().len(), 4);
    assert_eq!(registry.codes().await, vec![code]);
}

#[tokio::test]
async fn test_join_normalizes_code_and_starts_countdown() {
    let (addr, _registry) = start_server().await;
    let mut a = connect(&addr).await;
    let mut b = connect(&addr).await;
    let code = create(&mut a).await;

    let typed = format!("  {}  ", code.as_str().to_lowercase());
    send(&mut b, 1, ClientMessage::JoinRoom { code: typed }).await;

    assert_eq!(
        recv(&mut b).await.payload,
        ServerMessage::RoomJoined { code, side: Side::Right }
    );
    assert_eq!(recv(&mut a).await.payload, ServerMessage::OpponentJoined);

    for ws in [&mut a, &mut b] {
        let mut values = Vec::new();
        while values.last() != Some(&-1) {
            if let ServerMessage::CountdownStep { value } = recv(ws).await.payload {
                values.push(value);
            }
        }
        assert_eq!(values, vec![3, 2, 1, 0, -1]);
    }

    let snapshot = recv(&mut a).await;
    assert!(matches!(snapshot.payload, ServerMessage::StateSnapshot(_)));
    assert_eq!(snapshot.channel, Channel::Unreliable);
}

#[tokio::test]
async fn test_join_unknown_code_reports_not_found() {
    let (addr, _registry) = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, 1, ClientMessage::JoinRoom { code: "QQQQ".into() }).await;
    expect_join_error(&mut ws, "Room not found").await;
}

#[tokio::test]
async fn test_join_malformed_code_reports_invalid() {
    let (addr, _registry) = start_server().await;
    let mut ws = connect(&addr).await;
    send(&mut ws, 1, ClientMessage::JoinRoom { code: "OIL".into() }).await;
    expect_join_error(&mut ws, "Invalid room code").await;
}

#[tokio::test]
async fn test_third_player_gets_room_full() {
    let (addr, _registry) = start_server().await;
    let (_a, _b, code) = playing_pair(&addr).await;

    let mut c = connect(&addr).await;
    send(&mut c, 1, ClientMessage::JoinRoom { code: code.to_string() }).await;
    expect_join_error(&mut c, "Room is full").await;
}

#[tokio::test]
async fn test_create_while_in_room_leaves_previous_room() {
    let (addr, _registry) = start_server().await;
    let (mut a, mut b, first) = playing_pair(&addr).await;

    send(&mut a, 2, ClientMessage::CreateRoom).await;
    let second = match recv_until(&mut a, |m| matches!(m, ServerMessage::RoomCreated { .. })).await {
        ServerMessage::RoomCreated { code } => code,
        _ => unreachable!(),
    };
    assert_ne!(first, second);
    recv_until(&mut b, |m| *m == ServerMessage::OpponentLeft).await;
}

#[tokio::test]
async fn test_refused_join_keeps_current_room() {
    let (addr, registry) = start_server().await;
    let (mut a, mut b, code) = playing_pair(&addr).await;

    let missing = if code.as_str() == "ZZZZ" { "YYYY" } else { "ZZZZ" };
    send(&mut b, 2, ClientMessage::JoinRoom { code: missing.into() }).await;
    recv_until(&mut b, |m| matches!(m, ServerMessage::JoinError { .. })).await;

    let info = registry.find(code).await.expect("room").info().await.unwrap();
    assert_eq!(info.occupants, 2);
    assert!(info.phase.is_active(), "{}", info.phase);

    // B is still seated: its paddle keeps moving in A's snapshots.
    send(&mut b, 3, ClientMessage::PaddleUpdate { x: 650.0, y: 120.0 }).await;
    recv_until(&mut a, |m| {
        assert_ne!(*m, ServerMessage::OpponentLeft);
        matches!(m, ServerMessage::StateSnapshot(s) if s.paddles[1].x == 650.0)
    })
    .await;
}

#[tokio::test]
async fn test_silent_peer_does_not_block_other_connections() {
    let server = NeonPuckServer::builder()
        .bind("127.0.0.1:0")
        .match_config(fast_config())
        .handshake_timeout(Duration::from_millis(200))
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(server.run());

    // Connects and never sends the upgrade request.
    let _silent = tokio::net::TcpStream::connect(&addr).await.unwrap();

    let mut ws = tokio::time::timeout(Duration::from_secs(1), connect(&addr))
        .await
        .expect("an honest client connects while the silent one stalls");
    create(&mut ws).await;
}

#[tokio::test]
async fn test_invalid_frame_is_ignored() {
    let (addr, _registry) = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("not json".to_string().into())).await.expect("send");
    // The connection survives: a valid request still gets an answer.
    create(&mut ws).await;
}

// =========================================================================
// Play
// =========================================================================

#[tokio::test]
async fn test_stale_paddle_update_is_discarded() {
    let (addr, _registry) = start_server().await;
    let (mut a, mut b, _code) = playing_pair(&addr).await;

    send(&mut b, 10, ClientMessage::PaddleUpdate { x: 600.0, y: 100.0 }).await;
    // Arrives after seq 10: must not move the paddle back.
    send(&mut b, 5, ClientMessage::PaddleUpdate { x: 700.0, y: 300.0 }).await;

    recv_until(&mut a, |m| match m {
        ServerMessage::StateSnapshot(s) => s.paddles[1].x == 600.0,
        _ => false,
    })
    .await;

    for _ in 0..10 {
        if let ServerMessage::StateSnapshot(s) = recv(&mut a).await.payload {
            assert_eq!((s.paddles[1].x, s.paddles[1].y), (600.0, 100.0));
        }
    }
}

#[tokio::test]
async fn test_disconnect_notifies_opponent() {
    let (addr, _registry) = start_server().await;
    let (mut a, mut b, _code) = playing_pair(&addr).await;

    b.close(None).await.expect("close");
    recv_until(&mut a, |m| *m == ServerMessage::OpponentLeft).await;
}

#[tokio::test]
async fn test_empty_room_is_removed_after_grace() {
    let (addr, registry) = start_server().await;
    let mut a = connect(&addr).await;
    let code = create(&mut a).await;

    send(&mut a, 2, ClientMessage::LeaveRoom).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.room_count().await, 1, "still inside the grace period");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(registry.room_count().await, 0);

    let mut b = connect(&addr).await;
    send(&mut b, 1, ClientMessage::JoinRoom { code: code.to_string() }).await;
    expect_join_error(&mut b, "Room not found").await;
}

#[tokio::test]
async fn test_shutdown_destroys_rooms() {
    let server = NeonPuckServer::builder()
        .bind("127.0.0.1:0")
        .match_config(fast_config())
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().unwrap().to_string();
    let registry = server.registry();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));

    let mut ws = connect(&addr).await;
    create(&mut ws).await;
    assert_eq!(registry.room_count().await, 1);

    stop.send(()).unwrap();
    running.await.unwrap().unwrap();
    assert_eq!(registry.room_count().await, 0);
}
