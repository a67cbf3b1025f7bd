use std::{collections::HashMap, time::Instant};

use {serde_json::Value, tokio::sync::mpsc, tracing::debug};

use padlink_protocol::{Role, ServerFrame, now_ms};

// ── Client handle ────────────────────────────────────────────────────────────

/// A connected WebSocket client as seen by its session.
///
/// The session never owns the connection's lifetime — the transport layer
/// does. Dropping a handle only forgets the membership; the channel to the
/// client's write loop closes when the connection itself goes away.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    pub conn_id: String,
    /// Channel for sending serialized frames to this client's write loop.
    pub sender: mpsc::UnboundedSender<String>,
    pub connected_at: Instant,
}

impl ClientHandle {
    pub fn new(conn_id: impl Into<String>, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            conn_id: conn_id.into(),
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Send a serialized JSON frame. Returns false if the write loop is gone.
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(frame.to_string()).is_ok()
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// One game instance's membership and routing state.
///
/// Controllers and games are disjoint sets keyed by connection ID. Every
/// membership change triggers a `session_status` broadcast so clients can
/// react to peers joining and leaving.
pub struct Session {
    id: String,
    created_at: Instant,
    controllers: HashMap<String, ClientHandle>,
    games: HashMap<String, ClientHandle>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Instant::now(),
            controllers: HashMap::new(),
            games: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creation time, the sole input to expiry. A session's age is always
    /// measured from here, never from when it last became empty.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    /// True iff both membership sets are empty.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty() && self.games.is_empty()
    }

    /// Attach a client under the given role and notify all members.
    pub fn add_client(&mut self, client: ClientHandle, role: Role) {
        // A handle lives in exactly one set.
        self.controllers.remove(&client.conn_id);
        self.games.remove(&client.conn_id);
        let members = match role {
            Role::Controller => &mut self.controllers,
            Role::Game => &mut self.games,
        };
        members.insert(client.conn_id.clone(), client);
        self.broadcast_status();
    }

    /// Detach a client from both sets and notify the remaining members.
    /// Removing a non-member is a no-op (aside from the status broadcast).
    pub fn remove_client(&mut self, conn_id: &str) {
        self.controllers.remove(conn_id);
        self.games.remove(conn_id);
        self.broadcast_status();
    }

    /// Route a controller's input frame to every game client.
    ///
    /// Frames from game-role or non-member senders are dropped silently —
    /// controllers drive games, games do not talk back through this channel.
    /// A payload without a `timestamp` field is stamped with the arrival
    /// time. Per-peer send failures are isolated; the closed peer is left
    /// for its own close handler to reap.
    pub fn relay(&self, mut payload: Value, sender_conn_id: &str) {
        if !self.controllers.contains_key(sender_conn_id) {
            debug!(session = %self.id, conn_id = sender_conn_id, "dropping relay from non-controller");
            return;
        }
        if let Some(obj) = payload.as_object_mut() {
            obj.entry("timestamp").or_insert_with(|| Value::from(now_ms()));
        }
        let frame = payload.to_string();
        for (conn_id, client) in &self.games {
            if !client.send(&frame) {
                debug!(session = %self.id, conn_id = %conn_id, "relay send failed (client gone)");
            }
        }
    }

    /// Send the current membership counts to every member of both sets.
    pub fn broadcast_status(&self) {
        let frame = ServerFrame::SessionStatus {
            session_id: self.id.clone(),
            games: self.games.len(),
            controllers: self.controllers.len(),
            timestamp: now_ms(),
        }
        .to_json();
        for client in self.controllers.values().chain(self.games.values()) {
            if !client.send(&frame) {
                debug!(session = %self.id, conn_id = %client.conn_id, "status send failed (client gone)");
            }
        }
    }
}
