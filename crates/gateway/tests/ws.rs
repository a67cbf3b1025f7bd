//! End-to-end tests driving the gateway over real sockets: HTTP session
//! API plus WebSocket registration and relay.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    futures::{SinkExt, StreamExt},
    serde_json::{Value, json},
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
};

use {
    padlink_config::PadlinkConfig,
    padlink_gateway::{server::build_gateway_app, state::GatewayState},
};

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_gateway() -> SocketAddr {
    let state = GatewayState::new();
    let app = build_gateway_app(state, &PadlinkConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

async fn create_session(addr: SocketAddr) -> String {
    let resp: Value = reqwest::Client::new()
        .post(format!("http://{addr}/api/create-session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    resp["sessionId"].as_str().unwrap().to_string()
}

async fn session_info(addr: SocketAddr, id: &str) -> Value {
    reqwest::get(format!("http://{addr}/api/session/{id}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

async fn recv_json(ws: &mut WsClient) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for frame")
        .expect("stream ended")
        .unwrap();
    serde_json::from_str(msg.to_text().unwrap()).unwrap()
}

/// Assert no frame arrives within a short window.
async fn assert_silent(ws: &mut WsClient) {
    let res = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    assert!(res.is_err(), "expected silence, got {res:?}");
}

async fn register(ws: &mut WsClient, session_id: &str, role: &str) -> Value {
    send_json(
        ws,
        json!({"type": "register", "sessionId": session_id, "client": role}),
    )
    .await;
    recv_json(ws).await
}

#[tokio::test]
async fn controller_input_reaches_game_and_nobody_else() {
    let addr = spawn_gateway().await;
    let session_id = create_session(addr).await;

    let mut controller = connect(addr).await;
    let ack = register(&mut controller, &session_id, "controller").await;
    assert_eq!(ack["type"], "registered");
    assert_eq!(ack["sessionId"], session_id.as_str());
    assert_eq!(ack["client"], "controller");
    assert!(ack["timestamp"].as_u64().unwrap() > 0);
    let status = recv_json(&mut controller).await;
    assert_eq!(status["type"], "session_status");
    assert_eq!(status["controllers"], 1);
    assert_eq!(status["games"], 0);

    let mut game = connect(addr).await;
    let ack = register(&mut game, &session_id, "game").await;
    assert_eq!(ack["type"], "registered");
    assert_eq!(ack["client"], "game");
    let status = recv_json(&mut game).await;
    assert_eq!(status["type"], "session_status");
    assert_eq!(status["controllers"], 1);
    assert_eq!(status["games"], 1);

    // The controller hears about the game joining.
    let status = recv_json(&mut controller).await;
    assert_eq!(status["games"], 1);

    send_json(&mut controller, json!({"type": "move", "dir": "left"})).await;
    let relayed = recv_json(&mut game).await;
    assert_eq!(relayed["type"], "move");
    assert_eq!(relayed["dir"], "left");
    assert!(relayed["timestamp"].as_u64().unwrap() > 0);

    // Nothing comes back to the controller.
    assert_silent(&mut controller).await;
}

#[tokio::test]
async fn game_input_is_delivered_to_nobody() {
    let addr = spawn_gateway().await;
    let session_id = create_session(addr).await;

    let mut controller = connect(addr).await;
    register(&mut controller, &session_id, "controller").await;
    recv_json(&mut controller).await; // own join status

    let mut game = connect(addr).await;
    register(&mut game, &session_id, "game").await;
    recv_json(&mut game).await; // own join status
    recv_json(&mut controller).await; // game join status

    send_json(&mut game, json!({"type": "move", "dir": "right"})).await;
    assert_silent(&mut controller).await;
    assert_silent(&mut game).await;
}

#[tokio::test]
async fn relay_is_scoped_to_the_senders_session() {
    let addr = spawn_gateway().await;
    let session_a = create_session(addr).await;
    let session_b = create_session(addr).await;

    let mut controller = connect(addr).await;
    register(&mut controller, &session_a, "controller").await;
    recv_json(&mut controller).await;

    let mut other_game = connect(addr).await;
    register(&mut other_game, &session_b, "game").await;
    recv_json(&mut other_game).await;

    send_json(&mut controller, json!({"type": "move"})).await;
    assert_silent(&mut other_game).await;
}

#[tokio::test]
async fn register_against_unknown_session_fails_and_can_retry() {
    let addr = spawn_gateway().await;

    let mut ws = connect(addr).await;
    let err = register(&mut ws, "deadbeef", "game").await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["message"], "Invalid session");
    assert!(err["timestamp"].as_u64().unwrap() > 0);

    // Not attached anywhere; the connection stays usable and may retry.
    let info = session_info(addr, "deadbeef").await;
    assert_eq!(info["exists"], false);
    assert_eq!(info["games"], 0);

    let session_id = create_session(addr).await;
    let ack = register(&mut ws, &session_id, "game").await;
    assert_eq!(ack["type"], "registered");
}

#[tokio::test]
async fn re_registration_is_rejected() {
    let addr = spawn_gateway().await;
    let session_a = create_session(addr).await;
    let session_b = create_session(addr).await;

    let mut ws = connect(addr).await;
    register(&mut ws, &session_a, "controller").await;
    recv_json(&mut ws).await; // join status

    let err = register(&mut ws, &session_b, "game").await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["message"], "Already registered");

    // Membership is unchanged in both sessions.
    let info = session_info(addr, &session_a).await;
    assert_eq!(info["controllers"], 1);
    assert_eq!(info["games"], 0);
    let info = session_info(addr, &session_b).await;
    assert_eq!(info["controllers"], 0);
    assert_eq!(info["games"], 0);
}

#[tokio::test]
async fn unknown_role_is_ignored() {
    let addr = spawn_gateway().await;
    let session_id = create_session(addr).await;

    let mut ws = connect(addr).await;
    send_json(
        &mut ws,
        json!({"type": "register", "sessionId": session_id, "client": "spectator"}),
    )
    .await;
    assert_silent(&mut ws).await;

    let info = session_info(addr, &session_id).await;
    assert_eq!(info["controllers"], 0);
    assert_eq!(info["games"], 0);
}

#[tokio::test]
async fn frames_from_unregistered_connections_are_dropped() {
    let addr = spawn_gateway().await;
    let session_id = create_session(addr).await;

    let mut game = connect(addr).await;
    register(&mut game, &session_id, "game").await;
    recv_json(&mut game).await;

    let mut stranger = connect(addr).await;
    send_json(&mut stranger, json!({"type": "move", "dir": "up"})).await;
    assert_silent(&mut game).await;

    // Still usable afterwards.
    let ack = register(&mut stranger, &session_id, "controller").await;
    assert_eq!(ack["type"], "registered");
}

#[tokio::test]
async fn malformed_frames_are_dropped() {
    let addr = spawn_gateway().await;
    let session_id = create_session(addr).await;

    let mut ws = connect(addr).await;
    ws.send(Message::Text("not json at all".into())).await.unwrap();
    ws.send(Message::Text("[1,2,3]".into())).await.unwrap();
    assert_silent(&mut ws).await;

    let ack = register(&mut ws, &session_id, "game").await;
    assert_eq!(ack["type"], "registered");
}

#[tokio::test]
async fn disconnect_detaches_and_notifies_peers() {
    let addr = spawn_gateway().await;
    let session_id = create_session(addr).await;

    let mut controller = connect(addr).await;
    register(&mut controller, &session_id, "controller").await;
    recv_json(&mut controller).await;

    let mut game = connect(addr).await;
    register(&mut game, &session_id, "game").await;
    recv_json(&mut game).await;
    recv_json(&mut controller).await; // game join status

    game.close(None).await.unwrap();

    let status = recv_json(&mut controller).await;
    assert_eq!(status["type"], "session_status");
    assert_eq!(status["games"], 0);
    assert_eq!(status["controllers"], 1);

    let info = session_info(addr, &session_id).await;
    assert_eq!(info["exists"], true);
    assert_eq!(info["games"], 0);
    assert_eq!(info["controllers"], 1);
}

#[tokio::test]
async fn health_reports_sessions_and_connections() {
    let addr = spawn_gateway().await;
    create_session(addr).await;

    let mut ws = connect(addr).await;
    // Let the upgrade settle before sampling the counter.
    send_json(&mut ws, json!({"type": "noop"})).await;
    assert_silent(&mut ws).await;

    let health: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["sessions"], 1);
    assert_eq!(health["connections"], 1);
}
