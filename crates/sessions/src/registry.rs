use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use {
    rand::Rng,
    tokio::sync::{Mutex, RwLock},
    tracing::debug,
};

use crate::session::Session;

/// Owner of every live [`Session`], keyed by session ID.
///
/// Map access and per-session state are serialized independently: one
/// `RwLock` for the map, one `Mutex` per session. Lock order is always map
/// first, so a task holding a session lock never waits on the map.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new empty session and return its ID.
    ///
    /// IDs are regenerated on collision. With four random bytes a collision
    /// is practically impossible at expected session counts, so no further
    /// handling exists.
    pub async fn create(&self) -> String {
        let mut sessions = self.sessions.write().await;
        let id = loop {
            let candidate = generate_session_id();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        sessions.insert(id.clone(), Arc::new(Mutex::new(Session::new(id.clone()))));
        debug!(session = %id, "session created");
        id
    }

    /// Look up a session by ID. No session is created as a side effect.
    pub async fn lookup(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(id).map(Arc::clone)
    }

    /// Delete a session. Removing an absent ID is a no-op.
    pub async fn remove(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.write().await.remove(id)
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Remove every session that is empty and at least `idle_threshold` old.
    ///
    /// Age is measured from creation, not from when the session last became
    /// empty: a session nobody ever joined is swept strictly by age. A
    /// session whose lock is held (a relay in flight) is skipped until the
    /// next sweep. Returns the number of sessions removed.
    pub async fn sweep_expired(&self, now: Instant, idle_threshold: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| match entry.try_lock() {
            Ok(session) => {
                let expired = session.is_empty()
                    && now.duration_since(session.created_at()) >= idle_threshold;
                if expired {
                    debug!(session = %id, "sweeping expired session");
                }
                !expired
            },
            Err(_) => true,
        });
        before - sessions.len()
    }
}

/// 8 lowercase hex chars from 4 cryptographically random bytes.
fn generate_session_id() -> String {
    format!("{:08x}", rand::rng().random::<u32>())
}
