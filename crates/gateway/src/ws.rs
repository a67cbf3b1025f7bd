use std::{net::SocketAddr, sync::Arc};

use {
    axum::extract::ws::{Message, WebSocket},
    futures::{SinkExt, StreamExt},
    tokio::sync::mpsc,
    tracing::{debug, info},
};

use {
    padlink_protocol::{
        ClientFrame, RegisterParams, Role, ServerFrame, errors, now_ms, parse_client_frame,
    },
    padlink_sessions::ClientHandle,
};

use crate::state::GatewayState;

/// Registration state for one connection. Set exactly once; a connection
/// belongs to at most one session for its lifetime.
struct Registration {
    session_id: String,
    role: Role,
}

/// Drive one WebSocket connection from accept to close.
pub async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>, addr: SocketAddr) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let open = state.connection_opened();
    info!(conn_id = %conn_id, remote = %addr, connections = open, "client connected");

    let (mut sink, mut stream) = socket.split();

    // Outbound frames funnel through a channel so session fan-outs never
    // block on a slow socket.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut registration: Option<Registration> = None;

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_frame(&state, &conn_id, &tx, &mut registration, text.as_str()).await;
            },
            Ok(Message::Binary(_)) => {
                debug!(conn_id = %conn_id, "ignoring binary frame");
            },
            Ok(Message::Close(_)) => break,
            // Ping/pong are answered by the transport layer.
            Ok(_) => {},
            Err(e) => {
                // A transport error is equivalent to a close.
                debug!(conn_id = %conn_id, error = %e, "transport error, closing");
                break;
            },
        }
    }

    detach(&state, &conn_id, registration.as_ref()).await;
    write_task.abort();
    let open = state.connection_closed();
    info!(conn_id = %conn_id, connections = open, "client disconnected");
}

/// Dispatch one decoded text frame according to the connection's state.
async fn handle_frame(
    state: &Arc<GatewayState>,
    conn_id: &str,
    tx: &mpsc::UnboundedSender<String>,
    registration: &mut Option<Registration>,
    text: &str,
) {
    let frame = match parse_client_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(conn_id, error = %e, "dropping malformed frame");
            return;
        },
    };

    match frame {
        ClientFrame::Register(params) => {
            register(state, conn_id, tx, registration, params).await;
        },
        ClientFrame::Relay(payload) => {
            let Some(reg) = registration.as_ref() else {
                debug!(conn_id, "dropping frame from unregistered connection");
                return;
            };
            if let Some(session) = state.registry.lookup(&reg.session_id).await {
                session.lock().await.relay(payload, conn_id);
            }
        },
    }
}

/// Resolve a register frame: attach to the session, ack, or report failure.
async fn register(
    state: &Arc<GatewayState>,
    conn_id: &str,
    tx: &mpsc::UnboundedSender<String>,
    registration: &mut Option<Registration>,
    params: RegisterParams,
) {
    if registration.is_some() {
        debug!(conn_id, "rejecting re-registration");
        send_error(tx, errors::ALREADY_REGISTERED);
        return;
    }
    let Some(role) = Role::parse(&params.client) else {
        // Unknown roles are ignored outright: no membership change, no error.
        debug!(conn_id, client = %params.client, "ignoring register with unknown role");
        return;
    };
    let Some(session) = state.registry.lookup(&params.session_id).await else {
        debug!(conn_id, session = %params.session_id, "register against unknown session");
        send_error(tx, errors::INVALID_SESSION);
        return;
    };

    let ack = ServerFrame::Registered {
        session_id: params.session_id.clone(),
        client: role,
        timestamp: now_ms(),
    }
    .to_json();
    let _ = tx.send(ack);

    session
        .lock()
        .await
        .add_client(ClientHandle::new(conn_id, tx.clone()), role);
    *registration = Some(Registration {
        session_id: params.session_id,
        role,
    });
    info!(conn_id, role = role.as_str(), "client registered");
}

/// Detach a closed connection from its session, if it had one. Deletion of
/// emptied sessions is the sweeper's job.
async fn detach(state: &Arc<GatewayState>, conn_id: &str, registration: Option<&Registration>) {
    let Some(reg) = registration else { return };
    if let Some(session) = state.registry.lookup(&reg.session_id).await {
        session.lock().await.remove_client(conn_id);
        debug!(conn_id, session = %reg.session_id, role = reg.role.as_str(), "client detached");
    }
}

fn send_error(tx: &mpsc::UnboundedSender<String>, message: &str) {
    let frame = ServerFrame::Error {
        message: message.to_string(),
        timestamp: now_ms(),
    }
    .to_json();
    let _ = tx.send(frame);
}
